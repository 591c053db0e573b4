use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentParticipant;
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::schemas::exam::{ExamActiveResponse, QuestionResponse};
use crate::schemas::session::{AnswerAck, AnswerSubmit, ExamStatusResponse, SubmitResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/active", get(exam_active))
        .route("/status", get(exam_status))
        .route("/start", post(start_exam))
        .route("/question/:index", get(get_question))
        .route("/answer", post(submit_answer))
        .route("/submit", post(submit_exam))
}

async fn exam_active(State(state): State<AppState>) -> Result<Json<ExamActiveResponse>, ApiError> {
    let response = state.controller().exam_active(now_utc()).await?;
    Ok(Json(response))
}

async fn exam_status(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
) -> Result<Json<ExamStatusResponse>, ApiError> {
    let response = state.controller().status(&participant_id, now_utc()).await?;
    Ok(Json(response))
}

async fn start_exam(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
) -> Result<Json<ExamStatusResponse>, ApiError> {
    let response = state.controller().start_session(&participant_id, now_utc()).await?;
    Ok(Json(response))
}

async fn get_question(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
    Path(index): Path<u32>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let response = state.controller().question(&participant_id, index, now_utc()).await?;
    Ok(Json(response))
}

async fn submit_answer(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<AnswerAck>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let response = state
        .controller()
        .submit_answer(&participant_id, &payload.question_id, &payload.selected_option_id, now_utc())
        .await?;
    Ok(Json(response))
}

async fn submit_exam(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
) -> Result<Json<SubmitResponse>, ApiError> {
    let response = state.controller().submit_exam(&participant_id, now_utc()).await?;
    Ok(Json(response))
}
