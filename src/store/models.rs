use std::collections::HashMap;

use time::OffsetDateTime;

use super::types::{FinalizeCause, SessionState};

/// Exam-wide settings, mutable only through admin commands while no run is
/// active. Question count and per-question limit are copied into the run at
/// start time and frozen there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExamConfig {
    pub(crate) total_questions: u32,
    pub(crate) question_time_limit_seconds: u32,
    pub(crate) countdown_duration_seconds: u32,
    pub(crate) disqualify_on_fullscreen_exit: bool,
}

impl ExamConfig {
    pub(crate) fn exam_duration_seconds(&self) -> i64 {
        i64::from(self.total_questions) * i64::from(self.question_time_limit_seconds)
    }
}

/// One admin-initiated exam attempt. All timestamps are absolute so that any
/// reader can reconstruct remaining time and the global question cursor
/// without relying on delivered events.
#[derive(Debug, Clone)]
pub(crate) struct ExamRun {
    pub(crate) run_id: String,
    pub(crate) countdown_start_time: OffsetDateTime,
    pub(crate) countdown_seconds: i64,
    pub(crate) exam_start_time: OffsetDateTime,
    pub(crate) exam_end_time: OffsetDateTime,
    pub(crate) total_questions: u32,
    pub(crate) question_time_limit_seconds: u32,
    /// Monotonically non-decreasing while the run is active.
    pub(crate) current_question_index: u32,
    /// Set exactly once when the countdown elapses.
    pub(crate) started: bool,
}

/// Config plus the at-most-one active run, persisted and read as a single
/// record so concurrent readers never observe torn state.
#[derive(Debug, Clone)]
pub(crate) struct ControlRecord {
    pub(crate) config: ExamConfig,
    pub(crate) run: Option<ExamRun>,
}

#[derive(Debug, Clone)]
pub(crate) struct ParticipantSession {
    pub(crate) participant_id: String,
    pub(crate) run_id: String,
    pub(crate) state: SessionState,
    pub(crate) joined_at: OffsetDateTime,
    pub(crate) current_question_index: u32,
    /// questionId -> selectedOptionId, last write wins.
    pub(crate) answers: HashMap<String, String>,
    pub(crate) tab_switch_count: u32,
    pub(crate) fullscreen_exit_count: u32,
    pub(crate) last_tab_switch_at: Option<OffsetDateTime>,
    pub(crate) last_fullscreen_exit_at: Option<OffsetDateTime>,
    pub(crate) disqualification_reason: Option<String>,
    pub(crate) final_score: Option<u32>,
    pub(crate) total_answered: Option<u32>,
    /// Scoring collaborator was unavailable at finalization; the score is
    /// recomputed on a later status poll.
    pub(crate) score_pending: bool,
    pub(crate) finalize_cause: Option<FinalizeCause>,
    pub(crate) finalized_at: Option<OffsetDateTime>,
}

impl ParticipantSession {
    pub(crate) fn new(
        participant_id: &str,
        run_id: &str,
        state: SessionState,
        joined_at: OffsetDateTime,
        current_question_index: u32,
    ) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            run_id: run_id.to_string(),
            state,
            joined_at,
            current_question_index,
            answers: HashMap::new(),
            tab_switch_count: 0,
            fullscreen_exit_count: 0,
            last_tab_switch_at: None,
            last_fullscreen_exit_at: None,
            disqualification_reason: None,
            final_score: None,
            total_answered: None,
            score_pending: false,
            finalize_cause: None,
            finalized_at: None,
        }
    }

    pub(crate) fn answered_count(&self) -> u32 {
        self.answers.len() as u32
    }
}
