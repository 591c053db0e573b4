use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::store::types::{FinalizeCause, SessionState};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ScheduleRequest {
    #[serde(alias = "scheduledStartTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) scheduled_start_time: OffsetDateTime,
}

/// Admin-mutable exam configuration. Bounds mirror the engine's invariants so
/// bad input is rejected before it reaches the command path.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SettingsUpdate {
    #[serde(alias = "totalQuestions")]
    #[validate(range(min = 1, message = "total_questions must be at least 1"))]
    pub(crate) total_questions: u32,
    #[serde(alias = "questionTimeLimit", alias = "questionTimeLimitSeconds")]
    #[validate(range(min = 1, message = "question_time_limit_seconds must be at least 1"))]
    pub(crate) question_time_limit_seconds: u32,
    #[serde(alias = "countdownDuration", alias = "countdownDurationSeconds")]
    #[validate(range(min = 20, max = 300, message = "countdown_duration_seconds must be within [20, 300]"))]
    pub(crate) countdown_duration_seconds: u32,
    #[serde(alias = "disqualifyOnFullscreenExit")]
    pub(crate) disqualify_on_fullscreen_exit: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DisqualifyRequest {
    #[serde(alias = "participantId", alias = "userId")]
    #[validate(length(min = 1, message = "participant_id must not be empty"))]
    pub(crate) participant_id: String,
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub(crate) reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminExamStatusResponse {
    pub(crate) is_exam_active: bool,
    pub(crate) countdown_active: bool,
    pub(crate) total_questions: u32,
    pub(crate) question_time_limit: u32,
    pub(crate) countdown_duration: u32,
    pub(crate) disqualify_on_fullscreen_exit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) countdown_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) countdown_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exam_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exam_end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) current_question_index: Option<u32>,
    pub(crate) active_sessions: u32,
    pub(crate) submitted_sessions: u32,
    pub(crate) disqualified_sessions: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct LiveSessionResponse {
    pub(crate) participant_id: String,
    pub(crate) state: SessionState,
    pub(crate) current_question_index: u32,
    pub(crate) answered_count: u32,
    pub(crate) tab_switch_count: u32,
    pub(crate) fullscreen_exit_count: u32,
    pub(crate) is_disqualified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) disqualification_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) final_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) total_answered: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) finalize_cause: Option<FinalizeCause>,
    pub(crate) joined_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Admin dashboards often send datetime-local values without a timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}
