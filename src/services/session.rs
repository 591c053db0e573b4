use thiserror::Error;
use time::OffsetDateTime;

use crate::store::models::ParticipantSession;
use crate::store::types::{FinalizeCause, SessionState};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SessionError {
    /// The session is Submitted or Disqualified; every further mutation is
    /// rejected with this same error so retries are harmless.
    #[error("session already finalized")]
    Finalized,
    #[error("exam has not started yet")]
    NotStarted,
}

/// Result of the correctness lookup at finalization. `Pending` means the
/// collaborator was unavailable; the transition still happens and the score
/// is recomputed on a later poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScoreOutcome {
    Final { score: u32, answered: u32 },
    Pending { answered: u32 },
}

impl ParticipantSession {
    pub(crate) fn ensure_active(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Submitted | SessionState::Disqualified => Err(SessionError::Finalized),
            SessionState::Idle | SessionState::Countdown => Err(SessionError::NotStarted),
        }
    }

    /// Countdown -> Active once the shared clock says the exam started. The
    /// cursor picks up the current global index so late reconnects land on
    /// the same question as everyone else.
    pub(crate) fn activate(&mut self, global_index: u32) {
        if self.state == SessionState::Countdown {
            self.state = SessionState::Active;
            self.current_question_index = self.current_question_index.max(global_index);
        }
    }

    /// Mirrors the global cursor. Never moves backwards and never touches
    /// recorded answers.
    pub(crate) fn sync_cursor(&mut self, global_index: u32) {
        if self.state == SessionState::Active && global_index > self.current_question_index {
            self.current_question_index = global_index;
        }
    }

    pub(crate) fn record_answer(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.answers.insert(question_id.to_string(), option_id.to_string());
        Ok(())
    }

    /// One-way transition into Submitted. Score fields freeze here.
    pub(crate) fn finalize_submitted(
        &mut self,
        cause: FinalizeCause,
        score: ScoreOutcome,
        at: OffsetDateTime,
    ) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Finalized);
        }
        self.state = SessionState::Submitted;
        self.apply_score(score);
        self.finalize_cause = Some(cause);
        self.finalized_at = Some(at);
        Ok(())
    }

    /// One-way transition into Disqualified. The reason is set exactly once
    /// and the partial score is preserved for display.
    pub(crate) fn disqualify(
        &mut self,
        reason: &str,
        score: ScoreOutcome,
        at: OffsetDateTime,
    ) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Finalized);
        }
        self.state = SessionState::Disqualified;
        self.disqualification_reason = Some(reason.to_string());
        self.apply_score(score);
        self.finalize_cause = Some(FinalizeCause::Disqualified);
        self.finalized_at = Some(at);
        Ok(())
    }

    /// Fills in a score that was pending at finalization. Only the score
    /// fields move; state stays frozen.
    pub(crate) fn resolve_pending_score(&mut self, score: u32) {
        if self.state.is_terminal() && self.score_pending {
            self.final_score = Some(score);
            self.score_pending = false;
        }
    }

    fn apply_score(&mut self, score: ScoreOutcome) {
        match score {
            ScoreOutcome::Final { score, answered } => {
                self.final_score = Some(score);
                self.total_answered = Some(answered);
                self.score_pending = false;
            }
            ScoreOutcome::Pending { answered } => {
                self.final_score = None;
                self.total_answered = Some(answered);
                self.score_pending = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::store::models::ParticipantSession;

    const T0: OffsetDateTime = datetime!(2026-03-01 10:00:00 UTC);

    fn active_session() -> ParticipantSession {
        let mut session = ParticipantSession::new("alice", "run-1", SessionState::Countdown, T0, 0);
        session.activate(0);
        session
    }

    #[test]
    fn activate_promotes_countdown_and_adopts_global_cursor() {
        let mut session =
            ParticipantSession::new("alice", "run-1", SessionState::Countdown, T0, 0);
        session.activate(2);
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.current_question_index, 2);

        // Activating again is a no-op.
        session.activate(0);
        assert_eq!(session.current_question_index, 2);
    }

    #[test]
    fn cursor_never_moves_backwards_and_keeps_answers() {
        let mut session = active_session();
        session.record_answer("q1", "b").unwrap();
        session.sync_cursor(3);
        session.sync_cursor(1);
        assert_eq!(session.current_question_index, 3);
        assert_eq!(session.answers.get("q1").map(String::as_str), Some("b"));
    }

    #[test]
    fn resubmitting_an_answer_overwrites_it() {
        let mut session = active_session();
        session.record_answer("q1", "a").unwrap();
        session.record_answer("q1", "c").unwrap();
        assert_eq!(session.answers.len(), 1);
        assert_eq!(session.answers.get("q1").map(String::as_str), Some("c"));
    }

    #[test]
    fn answers_require_an_active_session() {
        let mut session =
            ParticipantSession::new("alice", "run-1", SessionState::Countdown, T0, 0);
        assert_eq!(session.record_answer("q1", "a"), Err(SessionError::NotStarted));
    }

    #[test]
    fn finalized_sessions_are_frozen() {
        let mut session = active_session();
        session.record_answer("q1", "a").unwrap();
        session
            .finalize_submitted(
                FinalizeCause::Manual,
                ScoreOutcome::Final { score: 1, answered: 1 },
                T0,
            )
            .unwrap();

        assert_eq!(session.record_answer("q2", "b"), Err(SessionError::Finalized));
        assert_eq!(
            session.finalize_submitted(
                FinalizeCause::TimeExpired,
                ScoreOutcome::Final { score: 0, answered: 0 },
                T0,
            ),
            Err(SessionError::Finalized)
        );
        assert_eq!(
            session.disqualify("late report", ScoreOutcome::Final { score: 0, answered: 0 }, T0),
            Err(SessionError::Finalized)
        );
        assert_eq!(session.final_score, Some(1));
        assert_eq!(session.total_answered, Some(1));
        assert_eq!(session.answers.len(), 1);
    }

    #[test]
    fn disqualification_preserves_partial_score_and_sets_reason_once() {
        let mut session = active_session();
        session.record_answer("q1", "a").unwrap();
        session
            .disqualify("fullscreen exit", ScoreOutcome::Final { score: 1, answered: 1 }, T0)
            .unwrap();

        assert_eq!(session.state, SessionState::Disqualified);
        assert_eq!(session.disqualification_reason.as_deref(), Some("fullscreen exit"));
        assert_eq!(session.final_score, Some(1));
        assert_eq!(session.finalize_cause, Some(FinalizeCause::Disqualified));
    }

    #[test]
    fn pending_score_resolves_without_thawing_state() {
        let mut session = active_session();
        session.record_answer("q1", "a").unwrap();
        session
            .finalize_submitted(FinalizeCause::TimeExpired, ScoreOutcome::Pending { answered: 1 }, T0)
            .unwrap();
        assert!(session.score_pending);
        assert_eq!(session.final_score, None);

        session.resolve_pending_score(1);
        assert!(!session.score_pending);
        assert_eq!(session.final_score, Some(1));
        assert_eq!(session.state, SessionState::Submitted);
    }
}
