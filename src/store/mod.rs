pub(crate) mod memory;
pub(crate) mod models;
pub(crate) mod types;

use async_trait::async_trait;
use thiserror::Error;

use self::models::{ControlRecord, ParticipantSession};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for the orchestration engine. Implementations must make
/// `save_control`/`save_session` atomic: either the whole record is durably
/// replaced or the previous record survives. The engine relies on that to
/// fail closed on half-applied transitions.
#[async_trait]
pub(crate) trait ExamStore: Send + Sync {
    async fn load_control(&self) -> Result<Option<ControlRecord>, StoreError>;
    async fn save_control(&self, control: &ControlRecord) -> Result<(), StoreError>;

    async fn load_session(
        &self,
        participant_id: &str,
    ) -> Result<Option<ParticipantSession>, StoreError>;
    async fn save_session(&self, session: &ParticipantSession) -> Result<(), StoreError>;
    async fn list_sessions(&self) -> Result<Vec<ParticipantSession>, StoreError>;
    async fn clear_sessions(&self) -> Result<(), StoreError>;

    async fn health(&self) -> Result<(), StoreError>;
}
