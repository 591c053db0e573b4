use crate::core::state::AppState;
use crate::store::models::{ControlRecord, ExamConfig};
use crate::store::ExamStore as _;

/// Seeds the control record from the environment defaults on first boot.
/// An existing record wins: settings changed at runtime through the admin
/// endpoint survive restarts.
pub(crate) async fn ensure_exam_config(state: &AppState) -> anyhow::Result<()> {
    if state.store().load_control().await?.is_some() {
        tracing::info!("Exam control record already present");
        return Ok(());
    }

    let exam = state.settings().exam();
    let config = ExamConfig {
        total_questions: exam.total_questions,
        question_time_limit_seconds: exam.question_time_limit_seconds,
        countdown_duration_seconds: exam.countdown_duration_seconds,
        disqualify_on_fullscreen_exit: exam.disqualify_on_fullscreen_exit,
    };

    state.store().save_control(&ControlRecord { config: config.clone(), run: None }).await?;
    tracing::info!(
        total_questions = config.total_questions,
        question_time_limit_seconds = config.question_time_limit_seconds,
        countdown_duration_seconds = config.countdown_duration_seconds,
        "Seeded exam configuration from environment defaults"
    );
    Ok(())
}
