use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::events::EventHub;
use crate::services::controller::ExamController;
use crate::store::ExamStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn ExamStore>,
    controller: Arc<ExamController>,
    events: EventHub,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn ExamStore>,
        controller: Arc<ExamController>,
        events: EventHub,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, controller, events }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &Arc<dyn ExamStore> {
        &self.inner.store
    }

    pub(crate) fn controller(&self) -> &ExamController {
        &self.inner.controller
    }

    pub(crate) fn events(&self) -> &EventHub {
        &self.inner.events
    }
}
