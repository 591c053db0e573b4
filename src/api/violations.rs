use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentParticipant;
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::schemas::session::{FullscreenExitResponse, TabSwitchResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/tab-switch", post(report_tab_switch))
        .route("/fullscreen-exit", post(report_fullscreen_exit))
}

async fn report_tab_switch(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
) -> Result<Json<TabSwitchResponse>, ApiError> {
    let response = state.controller().report_tab_switch(&participant_id, now_utc()).await?;
    Ok(Json(response))
}

async fn report_fullscreen_exit(
    State(state): State<AppState>,
    CurrentParticipant(participant_id): CurrentParticipant,
) -> Result<Json<FullscreenExitResponse>, ApiError> {
    let response = state.controller().report_fullscreen_exit(&participant_id, now_utc()).await?;
    Ok(Json(response))
}
