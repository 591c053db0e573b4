pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod store;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{config::Settings, events::EventHub, state::AppState, telemetry};
use crate::services::controller::ExamController;
use crate::services::question_bank::StaticQuestionBank;
use crate::store::memory::MemoryStore;
use crate::store::models::ExamConfig;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let store = Arc::new(MemoryStore::new());
    let bank = Arc::new(StaticQuestionBank::from_settings(&settings)?);
    let events = EventHub::new();

    let exam = settings.exam();
    let defaults = ExamConfig {
        total_questions: exam.total_questions,
        question_time_limit_seconds: exam.question_time_limit_seconds,
        countdown_duration_seconds: exam.countdown_duration_seconds,
        disqualify_on_fullscreen_exit: exam.disqualify_on_fullscreen_exit,
    };
    let controller =
        Arc::new(ExamController::new(store.clone(), bank, events.clone(), defaults));

    let state = AppState::new(settings, store, controller, events);
    core::bootstrap::ensure_exam_config(&state).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticker = tokio::spawn(tasks::ticker::run(state.clone(), shutdown_rx));

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        addr = %state.settings().server_addr(),
        environment = %state.settings().runtime().environment.as_str(),
        "Olympiad exam API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to exam ticker");
    }
    if let Err(err) = ticker.await {
        tracing::error!(error = %err, "Exam ticker join failed");
    }

    result?;

    Ok(())
}
