use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{ControlRecord, ParticipantSession};
use super::{ExamStore, StoreError};

/// Single-process authoritative store. The control record lives under its own
/// lock so readers always see `{config, run}` as one consistent snapshot.
#[derive(Clone)]
pub(crate) struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    control: RwLock<Option<ControlRecord>>,
    sessions: RwLock<HashMap<String, ParticipantSession>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                control: RwLock::new(None),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn load_control(&self) -> Result<Option<ControlRecord>, StoreError> {
        Ok(self.inner.control.read().await.clone())
    }

    async fn save_control(&self, control: &ControlRecord) -> Result<(), StoreError> {
        *self.inner.control.write().await = Some(control.clone());
        Ok(())
    }

    async fn load_session(
        &self,
        participant_id: &str,
    ) -> Result<Option<ParticipantSession>, StoreError> {
        Ok(self.inner.sessions.read().await.get(participant_id).cloned())
    }

    async fn save_session(&self, session: &ParticipantSession) -> Result<(), StoreError> {
        self.inner
            .sessions
            .write()
            .await
            .insert(session.participant_id.clone(), session.clone());
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<ParticipantSession>, StoreError> {
        let mut sessions: Vec<_> = self.inner.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        Ok(sessions)
    }

    async fn clear_sessions(&self) -> Result<(), StoreError> {
        self.inner.sessions.write().await.clear();
        Ok(())
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
