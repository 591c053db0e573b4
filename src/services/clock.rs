use time::{Duration, OffsetDateTime};

use crate::store::models::ExamRun;

/// Whole seconds from `now` until `later`, clamped at zero. Every remaining
/// time shown to a client is recomputed through this from absolute
/// timestamps; nothing ever decrements a stored counter, so reloads and
/// suspended tabs cannot accumulate drift.
pub(crate) fn remaining_seconds(now: OffsetDateTime, later: OffsetDateTime) -> i64 {
    (later - now).whole_seconds().max(0)
}

pub(crate) fn exam_start_time(
    countdown_start: OffsetDateTime,
    countdown_seconds: i64,
) -> OffsetDateTime {
    countdown_start + Duration::seconds(countdown_seconds)
}

pub(crate) fn exam_end_time(
    exam_start: OffsetDateTime,
    total_questions: u32,
    question_time_limit_seconds: u32,
) -> OffsetDateTime {
    exam_start
        + Duration::seconds(i64::from(total_questions) * i64::from(question_time_limit_seconds))
}

/// The global question cursor, derived from elapsed time rather than stored
/// redundantly: `floor((now - exam_start) / limit)` clamped to the question
/// range. Before the exam starts this is 0.
pub(crate) fn derived_question_index(
    now: OffsetDateTime,
    exam_start: OffsetDateTime,
    question_time_limit_seconds: u32,
    total_questions: u32,
) -> u32 {
    let elapsed = (now - exam_start).whole_seconds();
    if elapsed <= 0 || question_time_limit_seconds == 0 {
        return 0;
    }
    let index = elapsed / i64::from(question_time_limit_seconds);
    let last = i64::from(total_questions.saturating_sub(1));
    index.min(last) as u32
}

/// Seconds left on the question currently shown, derived from the same
/// absolute timestamps as the cursor.
pub(crate) fn question_remaining_seconds(
    now: OffsetDateTime,
    exam_start: OffsetDateTime,
    question_time_limit_seconds: u32,
) -> i64 {
    let limit = i64::from(question_time_limit_seconds);
    if limit == 0 {
        return 0;
    }
    let elapsed = (now - exam_start).whole_seconds();
    if elapsed < 0 {
        return limit;
    }
    limit - (elapsed % limit)
}

impl ExamRun {
    pub(crate) fn countdown_remaining(&self, now: OffsetDateTime) -> i64 {
        remaining_seconds(now, self.exam_start_time)
    }

    pub(crate) fn exam_remaining(&self, now: OffsetDateTime) -> i64 {
        remaining_seconds(now, self.exam_end_time)
    }

    pub(crate) fn countdown_elapsed(&self, now: OffsetDateTime) -> bool {
        now >= self.exam_start_time
    }

    pub(crate) fn time_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.exam_end_time
    }

    pub(crate) fn derived_index(&self, now: OffsetDateTime) -> u32 {
        derived_question_index(
            now,
            self.exam_start_time,
            self.question_time_limit_seconds,
            self.total_questions,
        )
    }
}
