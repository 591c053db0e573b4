use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderName};

use crate::api::errors::ApiError;
use crate::core::state::AppState;

static PARTICIPANT_ID_HEADER: HeaderName = HeaderName::from_static("x-participant-id");

/// Identity of the exam participant making the request. Participants are
/// registered out of band; the engine only needs a stable opaque id.
pub(crate) struct CurrentParticipant(pub(crate) String);

/// Proof of a valid admin bearer token.
pub(crate) struct CurrentAdmin;

#[async_trait]
impl FromRequestParts<AppState> for CurrentParticipant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let participant_id = parts
            .headers
            .get(&PARTICIPANT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized("Missing participant identity"))?;

        Ok(CurrentParticipant(participant_id.to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let expected = &app_state.settings().admin().api_token;
        if expected.is_empty() {
            return Err(ApiError::Unauthorized("Admin access is not configured"));
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        if token != expected {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentAdmin)
    }
}
