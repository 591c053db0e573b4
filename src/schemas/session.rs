use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::types::{FinalizeCause, SessionState};

/// Full per-participant view, rebuilt from absolute timestamps on every
/// request. This is the poll-based reconciliation surface: everything a push
/// event can tell a client is also derivable from here.
#[derive(Debug, Serialize)]
pub(crate) struct ExamStatusResponse {
    pub(crate) has_session: bool,
    pub(crate) state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) run_id: Option<String>,
    pub(crate) is_exam_active: bool,
    pub(crate) countdown_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) countdown_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) countdown_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) current_question_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) remaining_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) question_remaining_seconds: Option<i64>,
    pub(crate) total_questions: u32,
    pub(crate) question_time_limit: u32,
    pub(crate) tab_switch_count: u32,
    pub(crate) fullscreen_exit_count: u32,
    pub(crate) is_disqualified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disqualification_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) final_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) total_answered: Option<u32>,
    pub(crate) score_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) finalize_cause: Option<FinalizeCause>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(alias = "selectedAnswer", alias = "selectedOptionId")]
    #[validate(length(min = 1, message = "selected_option_id must not be empty"))]
    pub(crate) selected_option_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerAck {
    pub(crate) saved: bool,
    pub(crate) question_id: String,
    pub(crate) answered_count: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TabSwitchResponse {
    pub(crate) tab_switch_count: u32,
    pub(crate) auto_submitted: bool,
    pub(crate) state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) final_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) total_answered: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FullscreenExitResponse {
    pub(crate) fullscreen_exit_count: u32,
    pub(crate) disqualified: bool,
    pub(crate) state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disqualification_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) final_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) total_answered: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) final_score: Option<u32>,
    pub(crate) total_answered: u32,
    pub(crate) score_pending: bool,
}
