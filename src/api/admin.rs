use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::schemas::admin::{
    AdminExamStatusResponse, DisqualifyRequest, LiveSessionResponse, MessageResponse,
    ScheduleRequest, SettingsUpdate,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/exam/status", get(exam_status))
        .route("/exam/start", post(start_exam))
        .route("/exam/schedule", post(schedule_exam))
        .route("/exam/stop", post(stop_exam))
        .route("/exam/settings", put(update_settings))
        .route("/exam/clear", post(clear_exam_data))
        .route("/students/live", get(live_sessions))
        .route("/students/disqualify", post(disqualify_student))
}

async fn exam_status(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<AdminExamStatusResponse>, ApiError> {
    let response = state.controller().admin_status(now_utc()).await?;
    Ok(Json(response))
}

async fn start_exam(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<AdminExamStatusResponse>, ApiError> {
    let now = now_utc();
    state.controller().start_now(now).await?;
    let response = state.controller().admin_status(now).await?;
    Ok(Json(response))
}

async fn schedule_exam(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(payload): Json<ScheduleRequest>,
) -> Result<Json<AdminExamStatusResponse>, ApiError> {
    let now = now_utc();
    state.controller().schedule(payload.scheduled_start_time, now).await?;
    let response = state.controller().admin_status(now).await?;
    Ok(Json(response))
}

async fn stop_exam(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<MessageResponse>, ApiError> {
    state.controller().stop(now_utc()).await?;
    Ok(Json(MessageResponse { message: "Exam stopped".to_string() }))
}

async fn update_settings(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(payload): Json<SettingsUpdate>,
) -> Result<Json<AdminExamStatusResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    state.controller().update_settings(&payload).await?;
    let response = state.controller().admin_status(now_utc()).await?;
    Ok(Json(response))
}

async fn clear_exam_data(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<MessageResponse>, ApiError> {
    state.controller().clear_all_data().await?;
    Ok(Json(MessageResponse { message: "All exam data cleared".to_string() }))
}

async fn live_sessions(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<LiveSessionResponse>>, ApiError> {
    let response = state.controller().list_live_sessions(now_utc()).await?;
    Ok(Json(response))
}

async fn disqualify_student(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Json(payload): Json<DisqualifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    state.controller().disqualify(&payload.participant_id, &payload.reason, now_utc()).await?;
    Ok(Json(MessageResponse {
        message: format!("Participant {} disqualified", payload.participant_id),
    }))
}

#[cfg(test)]
mod tests;
