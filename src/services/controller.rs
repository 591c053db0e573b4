use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::events::{AdminEvent, EventHub, ParticipantEvent};
use crate::core::time::format_offset;
use crate::schemas::admin::{AdminExamStatusResponse, LiveSessionResponse, SettingsUpdate};
use crate::schemas::exam::{ExamActiveResponse, QuestionResponse};
use crate::schemas::session::{
    AnswerAck, ExamStatusResponse, FullscreenExitResponse, SubmitResponse, TabSwitchResponse,
};
use crate::services::clock;
use crate::services::question_bank::{score_answers, QuestionBank};
use crate::services::session::{ScoreOutcome, SessionError};
use crate::services::violations::{
    assess_fullscreen_exit, assess_tab_switch, FullscreenExitDecision, TabSwitchDecision,
    FULLSCREEN_EXIT_REASON,
};
use crate::store::models::{ControlRecord, ExamConfig, ExamRun, ParticipantSession};
use crate::store::types::{FinalizeCause, SessionState};
use crate::store::{ExamStore, StoreError};

#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("scheduled start time must be in the future")]
    InvalidSchedule,
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),
    #[error("an exam run is already active")]
    AlreadyActive,
    #[error("no active exam run")]
    NoActiveRun,
    #[error("settings are locked while an exam run is active")]
    SettingsLocked,
    #[error("question index {requested} does not match the current question {current}")]
    StaleQuestionIndex { requested: u32, current: u32 },
    #[error("exam has not started yet")]
    NotStartedYet,
    #[error("session already finalized")]
    SessionFinalized,
    #[error("no exam session for this participant")]
    SessionNotFound,
    #[error("question {0} not found")]
    QuestionNotFound(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Finalized => Self::SessionFinalized,
            SessionError::NotStarted => Self::NotStartedYet,
        }
    }
}

/// Single authoritative orchestrator for the exam clock, the global question
/// cursor and every participant session.
///
/// Locking discipline: run/config mutations serialize on `command_lock`;
/// each session's mutations serialize on a per-participant lock. Code that
/// holds `command_lock` may take session locks, never the other way around.
/// All state lives in the store; mutations are load -> modify a copy -> save,
/// so a failed save leaves the previous record in place (fail closed).
pub(crate) struct ExamController {
    store: Arc<dyn ExamStore>,
    bank: Arc<dyn QuestionBank>,
    events: EventHub,
    defaults: ExamConfig,
    command_lock: Mutex<()>,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExamController {
    pub(crate) fn new(
        store: Arc<dyn ExamStore>,
        bank: Arc<dyn QuestionBank>,
        events: EventHub,
        defaults: ExamConfig,
    ) -> Self {
        Self {
            store,
            bank,
            events,
            defaults,
            command_lock: Mutex::new(()),
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn control(&self) -> Result<ControlRecord, EngineError> {
        match self.store.load_control().await? {
            Some(control) => Ok(control),
            None => Ok(ControlRecord { config: self.defaults.clone(), run: None }),
        }
    }

    async fn session_guard(&self, participant_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks.entry(participant_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    // ----- admin command path ------------------------------------------------

    pub(crate) async fn start_now(&self, now: OffsetDateTime) -> Result<ExamRun, EngineError> {
        let _guard = self.command_lock.lock().await;
        let mut control = self.control().await?;
        if control.run.is_some() {
            return Err(EngineError::AlreadyActive);
        }

        let countdown = i64::from(control.config.countdown_duration_seconds);
        let run = build_run(&control.config, now, countdown);
        control.run = Some(run.clone());
        self.store.save_control(&control).await?;

        self.events.publish(ParticipantEvent::ExamCountdownStarted {
            countdown_start_time: format_offset(run.countdown_start_time),
            countdown_seconds: run.countdown_seconds,
        });
        tracing::info!(
            run_id = %run.run_id,
            countdown_seconds = run.countdown_seconds,
            action = "exam_start_now",
            "Exam countdown started"
        );
        metrics::counter!("exam_runs_started_total", "mode" => "immediate").increment(1);
        Ok(run)
    }

    pub(crate) async fn schedule(
        &self,
        scheduled_start_time: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<ExamRun, EngineError> {
        let _guard = self.command_lock.lock().await;
        let mut control = self.control().await?;
        if control.run.is_some() {
            return Err(EngineError::AlreadyActive);
        }
        if scheduled_start_time <= now {
            return Err(EngineError::InvalidSchedule);
        }

        let countdown = (scheduled_start_time - now).whole_seconds().max(1);
        let run = build_run(&control.config, now, countdown);
        control.run = Some(run.clone());
        self.store.save_control(&control).await?;

        self.events.publish(ParticipantEvent::ExamCountdownStarted {
            countdown_start_time: format_offset(run.countdown_start_time),
            countdown_seconds: run.countdown_seconds,
        });
        tracing::info!(
            run_id = %run.run_id,
            scheduled_start_time = %format_offset(scheduled_start_time),
            action = "exam_schedule",
            "Exam scheduled"
        );
        metrics::counter!("exam_runs_started_total", "mode" => "scheduled").increment(1);
        Ok(run)
    }

    /// Idempotent advancement driven by absolute time. Both the background
    /// ticker and any status poll converge on the same result, so a dropped
    /// push event or a stalled ticker only delays delivery, never changes
    /// the outcome.
    pub(crate) async fn advance_tick(&self, now: OffsetDateTime) -> Result<(), EngineError> {
        let _guard = self.command_lock.lock().await;
        let mut control = self.control().await?;
        let Some(mut run) = control.run.clone() else {
            return Ok(());
        };

        if !run.started && run.countdown_elapsed(now) {
            run.started = true;
            control.run = Some(run.clone());
            self.store.save_control(&control).await?;
            self.events.publish(ParticipantEvent::ExamActuallyStarted);
            tracing::info!(run_id = %run.run_id, action = "exam_started", "Countdown elapsed, exam is active");
        }

        if !run.started {
            return Ok(());
        }

        if run.time_expired(now) {
            self.finalize_run_sessions(&run, FinalizeCause::TimeExpired, now).await;
            control.run = None;
            self.store.save_control(&control).await?;
            self.events.publish(ParticipantEvent::ExamAutoStopped);
            tracing::info!(run_id = %run.run_id, action = "exam_auto_stop", "Exam time expired, run cleared");
            return Ok(());
        }

        let derived = run.derived_index(now);
        if derived > run.current_question_index {
            run.current_question_index = derived;
            control.run = Some(run.clone());
            self.store.save_control(&control).await?;
            self.events
                .publish(ParticipantEvent::GlobalQuestionChange { current_question: derived });
            tracing::debug!(run_id = %run.run_id, question_index = derived, "Global question advanced");
        }

        Ok(())
    }

    pub(crate) async fn stop(&self, now: OffsetDateTime) -> Result<(), EngineError> {
        let _guard = self.command_lock.lock().await;
        let mut control = self.control().await?;
        let Some(run) = control.run.clone() else {
            return Err(EngineError::NoActiveRun);
        };

        self.finalize_run_sessions(&run, FinalizeCause::AdminStop, now).await;
        control.run = None;
        self.store.save_control(&control).await?;
        self.events.publish(ParticipantEvent::ExamStopped);
        tracing::info!(run_id = %run.run_id, action = "exam_stop", "Exam stopped by admin");
        Ok(())
    }

    pub(crate) async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<ExamConfig, EngineError> {
        let _guard = self.command_lock.lock().await;
        let mut control = self.control().await?;
        if control.run.is_some() {
            return Err(EngineError::SettingsLocked);
        }

        let config = ExamConfig {
            total_questions: update.total_questions,
            question_time_limit_seconds: update.question_time_limit_seconds,
            countdown_duration_seconds: update.countdown_duration_seconds,
            disqualify_on_fullscreen_exit: update.disqualify_on_fullscreen_exit,
        };
        validate_config(&config)?;

        control.config = config.clone();
        self.store.save_control(&control).await?;
        tracing::info!(
            total_questions = config.total_questions,
            question_time_limit_seconds = config.question_time_limit_seconds,
            countdown_duration_seconds = config.countdown_duration_seconds,
            disqualify_on_fullscreen_exit = config.disqualify_on_fullscreen_exit,
            action = "settings_update",
            "Exam settings updated"
        );
        Ok(config)
    }

    /// Wipes every participant session and the current run; the exam
    /// configuration survives. Explicit admin override, valid at any time.
    pub(crate) async fn clear_all_data(&self) -> Result<(), EngineError> {
        let _guard = self.command_lock.lock().await;
        let mut control = self.control().await?;
        let had_run = control.run.is_some();

        self.store.clear_sessions().await?;
        control.run = None;
        self.store.save_control(&control).await?;

        if had_run {
            self.events.publish(ParticipantEvent::ExamStopped);
        }
        tracing::info!(action = "exam_clear", "All exam sessions and run data cleared");
        Ok(())
    }

    // ----- participant path --------------------------------------------------

    pub(crate) async fn start_session(
        &self,
        participant_id: &str,
        now: OffsetDateTime,
    ) -> Result<ExamStatusResponse, EngineError> {
        let control = self.control().await?;
        let Some(run) = control.run.clone() else {
            return Err(EngineError::NoActiveRun);
        };

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let existing = self.store.load_session(participant_id).await?;
        let mut session = match existing {
            // Resume: the stored record plus absolute timestamps fully
            // reconstruct the participant's position.
            Some(session) if session.run_id == run.run_id => session,
            // A session from a previous run is superseded by the new run.
            _ => {
                let (state, cursor) = if run.countdown_elapsed(now) {
                    (SessionState::Active, run.derived_index(now).max(run.current_question_index))
                } else {
                    (SessionState::Countdown, 0)
                };
                tracing::info!(
                    participant_id,
                    run_id = %run.run_id,
                    state = state.as_str(),
                    action = "session_join",
                    "Participant joined exam run"
                );
                ParticipantSession::new(participant_id, &run.run_id, state, now, cursor)
            }
        };

        self.reconcile_session(&mut session, &control, now);
        self.store.save_session(&session).await?;

        Ok(self.status_view(Some(&session), &control, now))
    }

    pub(crate) async fn status(
        &self,
        participant_id: &str,
        now: OffsetDateTime,
    ) -> Result<ExamStatusResponse, EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Ok(self.status_view(None, &control, now));
        };

        if self.reconcile_session(&mut session, &control, now) {
            self.store.save_session(&session).await?;
        }

        Ok(self.status_view(Some(&session), &control, now))
    }

    pub(crate) async fn question(
        &self,
        participant_id: &str,
        index: u32,
        now: OffsetDateTime,
    ) -> Result<QuestionResponse, EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Err(EngineError::SessionNotFound);
        };
        if self.reconcile_session(&mut session, &control, now) {
            self.store.save_session(&session).await?;
        }

        session.ensure_active()?;
        if index != session.current_question_index {
            return Err(EngineError::StaleQuestionIndex {
                requested: index,
                current: session.current_question_index,
            });
        }

        let run = control.run.as_ref().ok_or(EngineError::NoActiveRun)?;
        let question = self
            .bank
            .question(index)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?
            .ok_or(EngineError::QuestionNotFound(index))?;

        let selected_answer = session.answers.get(&question.id).cloned();
        Ok(QuestionResponse {
            question: question.into(),
            question_index: index,
            selected_answer,
            remaining_seconds: run.exam_remaining(now),
            question_remaining_seconds: clock::question_remaining_seconds(
                now,
                run.exam_start_time,
                run.question_time_limit_seconds,
            ),
        })
    }

    pub(crate) async fn submit_answer(
        &self,
        participant_id: &str,
        question_id: &str,
        option_id: &str,
        now: OffsetDateTime,
    ) -> Result<AnswerAck, EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Err(EngineError::SessionNotFound);
        };
        self.reconcile_session(&mut session, &control, now);

        session.record_answer(question_id, option_id)?;
        self.store.save_session(&session).await?;

        self.events.publish_admin(AdminEvent::StudentProgress {
            participant_id: participant_id.to_string(),
            question_index: session.current_question_index,
            answered_count: session.answered_count(),
        });

        Ok(AnswerAck {
            saved: true,
            question_id: question_id.to_string(),
            answered_count: session.answered_count(),
        })
    }

    pub(crate) async fn submit_exam(
        &self,
        participant_id: &str,
        now: OffsetDateTime,
    ) -> Result<SubmitResponse, EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Err(EngineError::SessionNotFound);
        };
        self.reconcile_session(&mut session, &control, now);

        session.ensure_active()?;
        let score = self.score_outcome(&session);
        session.finalize_submitted(FinalizeCause::Manual, score, now)?;
        self.store.save_session(&session).await?;

        self.emit_finalized(&session);
        Ok(SubmitResponse {
            state: session.state,
            final_score: session.final_score,
            total_answered: session.total_answered.unwrap_or(0),
            score_pending: session.score_pending,
        })
    }

    pub(crate) async fn report_tab_switch(
        &self,
        participant_id: &str,
        now: OffsetDateTime,
    ) -> Result<TabSwitchResponse, EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Err(EngineError::SessionNotFound);
        };
        self.reconcile_session(&mut session, &control, now);
        session.ensure_active()?;

        match assess_tab_switch(session.tab_switch_count, session.last_tab_switch_at, now) {
            TabSwitchDecision::Duplicate => Ok(TabSwitchResponse {
                tab_switch_count: session.tab_switch_count,
                auto_submitted: false,
                state: session.state,
                final_score: None,
                total_answered: None,
            }),
            TabSwitchDecision::Recorded { count } => {
                session.tab_switch_count = count;
                session.last_tab_switch_at = Some(now);
                self.store.save_session(&session).await?;

                metrics::counter!("exam_violations_total", "kind" => "tab_switch").increment(1);
                tracing::warn!(
                    participant_id,
                    tab_switch_count = count,
                    action = "violation_tab_switch",
                    "Tab switch recorded"
                );
                Ok(TabSwitchResponse {
                    tab_switch_count: count,
                    auto_submitted: false,
                    state: session.state,
                    final_score: None,
                    total_answered: None,
                })
            }
            TabSwitchDecision::AutoSubmit { count } => {
                session.tab_switch_count = count;
                session.last_tab_switch_at = Some(now);
                let score = self.score_outcome(&session);
                session.finalize_submitted(FinalizeCause::TabSwitchLimit, score, now)?;
                self.store.save_session(&session).await?;

                metrics::counter!("exam_violations_total", "kind" => "tab_switch").increment(1);
                tracing::warn!(
                    participant_id,
                    tab_switch_count = count,
                    action = "violation_tab_switch_limit",
                    "Tab switch limit reached, session auto-submitted"
                );
                self.emit_finalized(&session);
                Ok(TabSwitchResponse {
                    tab_switch_count: count,
                    auto_submitted: true,
                    state: session.state,
                    final_score: session.final_score,
                    total_answered: session.total_answered,
                })
            }
        }
    }

    pub(crate) async fn report_fullscreen_exit(
        &self,
        participant_id: &str,
        now: OffsetDateTime,
    ) -> Result<FullscreenExitResponse, EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Err(EngineError::SessionNotFound);
        };
        self.reconcile_session(&mut session, &control, now);
        session.ensure_active()?;

        let decision = assess_fullscreen_exit(
            control.config.disqualify_on_fullscreen_exit,
            session.fullscreen_exit_count,
            session.last_fullscreen_exit_at,
            now,
        );

        match decision {
            FullscreenExitDecision::Duplicate => Ok(FullscreenExitResponse {
                fullscreen_exit_count: session.fullscreen_exit_count,
                disqualified: false,
                state: session.state,
                disqualification_reason: None,
                final_score: None,
                total_answered: None,
            }),
            FullscreenExitDecision::Recorded { count } => {
                session.fullscreen_exit_count = count;
                session.last_fullscreen_exit_at = Some(now);
                self.store.save_session(&session).await?;

                metrics::counter!("exam_violations_total", "kind" => "fullscreen_exit")
                    .increment(1);
                tracing::warn!(
                    participant_id,
                    fullscreen_exit_count = count,
                    action = "violation_fullscreen_exit",
                    "Fullscreen exit recorded"
                );
                Ok(FullscreenExitResponse {
                    fullscreen_exit_count: count,
                    disqualified: false,
                    state: session.state,
                    disqualification_reason: None,
                    final_score: None,
                    total_answered: None,
                })
            }
            FullscreenExitDecision::Disqualify { count } => {
                session.fullscreen_exit_count = count;
                session.last_fullscreen_exit_at = Some(now);
                let score = self.score_outcome(&session);
                session.disqualify(FULLSCREEN_EXIT_REASON, score, now)?;
                self.store.save_session(&session).await?;

                metrics::counter!("exam_violations_total", "kind" => "fullscreen_exit")
                    .increment(1);
                tracing::warn!(
                    participant_id,
                    action = "violation_fullscreen_disqualify",
                    "Participant disqualified for fullscreen exit"
                );
                self.emit_finalized(&session);
                Ok(FullscreenExitResponse {
                    fullscreen_exit_count: count,
                    disqualified: true,
                    state: session.state,
                    disqualification_reason: session.disqualification_reason.clone(),
                    final_score: session.final_score,
                    total_answered: session.total_answered,
                })
            }
        }
    }

    // ----- admin read/override path ------------------------------------------

    pub(crate) async fn disqualify(
        &self,
        participant_id: &str,
        reason: &str,
        now: OffsetDateTime,
    ) -> Result<(), EngineError> {
        let control = self.control().await?;

        let guard = self.session_guard(participant_id).await;
        let _lock = guard.lock().await;

        let Some(mut session) = self.store.load_session(participant_id).await? else {
            return Err(EngineError::SessionNotFound);
        };
        self.reconcile_session(&mut session, &control, now);

        let score = self.score_outcome(&session);
        session.disqualify(reason, score, now)?;
        self.store.save_session(&session).await?;

        tracing::warn!(participant_id, reason, action = "admin_disqualify", "Participant disqualified by admin");
        self.emit_finalized(&session);
        Ok(())
    }

    pub(crate) async fn exam_active(
        &self,
        now: OffsetDateTime,
    ) -> Result<ExamActiveResponse, EngineError> {
        let control = self.control().await?;
        let run = control.run.as_ref();

        Ok(ExamActiveResponse {
            is_exam_active: run.is_some_and(|run| run.countdown_elapsed(now)),
            countdown_active: run.is_some_and(|run| !run.countdown_elapsed(now)),
            total_questions: control.config.total_questions,
            question_time_limit: control.config.question_time_limit_seconds,
            countdown_start_time: run.map(|run| format_offset(run.countdown_start_time)),
            countdown_seconds: run.map(|run| run.countdown_remaining(now)),
            current_question_index: run
                .filter(|run| run.countdown_elapsed(now))
                .map(|run| run.derived_index(now).max(run.current_question_index)),
            exam_start_time: run.map(|run| format_offset(run.exam_start_time)),
            exam_end_time: run.map(|run| format_offset(run.exam_end_time)),
        })
    }

    pub(crate) async fn admin_status(
        &self,
        now: OffsetDateTime,
    ) -> Result<AdminExamStatusResponse, EngineError> {
        let control = self.control().await?;
        let run = control.run.as_ref();
        let sessions = self.store.list_sessions().await?;

        let mut active = 0;
        let mut submitted = 0;
        let mut disqualified = 0;
        for session in &sessions {
            if run.map(|run| run.run_id != session.run_id).unwrap_or(true) {
                continue;
            }
            match session.state {
                SessionState::Submitted => submitted += 1,
                SessionState::Disqualified => disqualified += 1,
                _ => active += 1,
            }
        }

        Ok(AdminExamStatusResponse {
            is_exam_active: run.is_some_and(|run| run.countdown_elapsed(now)),
            countdown_active: run.is_some_and(|run| !run.countdown_elapsed(now)),
            total_questions: control.config.total_questions,
            question_time_limit: control.config.question_time_limit_seconds,
            countdown_duration: control.config.countdown_duration_seconds,
            disqualify_on_fullscreen_exit: control.config.disqualify_on_fullscreen_exit,
            run_id: run.map(|run| run.run_id.clone()),
            countdown_start_time: run.map(|run| format_offset(run.countdown_start_time)),
            countdown_seconds: run.map(|run| run.countdown_remaining(now)),
            exam_start_time: run.map(|run| format_offset(run.exam_start_time)),
            exam_end_time: run.map(|run| format_offset(run.exam_end_time)),
            current_question_index: run
                .filter(|run| run.countdown_elapsed(now))
                .map(|run| run.derived_index(now).max(run.current_question_index)),
            active_sessions: active,
            submitted_sessions: submitted,
            disqualified_sessions: disqualified,
        })
    }

    pub(crate) async fn list_live_sessions(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<LiveSessionResponse>, EngineError> {
        let control = self.control().await?;
        let sessions = self.store.list_sessions().await?;

        let mut views = Vec::with_capacity(sessions.len());
        for mut session in sessions {
            if let Some(run) = &control.run {
                if run.run_id != session.run_id {
                    continue;
                }
            }
            // Effective view only; the stored record updates on the
            // participant's own next touch.
            self.reconcile_session(&mut session, &control, now);
            views.push(LiveSessionResponse {
                participant_id: session.participant_id.clone(),
                state: session.state,
                current_question_index: session.current_question_index,
                answered_count: session.answered_count(),
                tab_switch_count: session.tab_switch_count,
                fullscreen_exit_count: session.fullscreen_exit_count,
                is_disqualified: session.state == SessionState::Disqualified,
                disqualification_reason: session.disqualification_reason.clone(),
                final_score: session.final_score,
                total_answered: session.total_answered,
                finalize_cause: session.finalize_cause,
                joined_at: format_offset(session.joined_at),
            });
        }
        Ok(views)
    }

    // ----- internals ---------------------------------------------------------

    /// Pull-derived reconciliation: brings a session in line with what the
    /// absolute timestamps already say. Returns true when the record changed
    /// and must be saved. Used on every participant touch so a client that
    /// missed every push event still converges.
    fn reconcile_session(
        &self,
        session: &mut ParticipantSession,
        control: &ControlRecord,
        now: OffsetDateTime,
    ) -> bool {
        let mut changed = false;

        match &control.run {
            Some(run) if run.run_id == session.run_id => {
                if session.state == SessionState::Countdown && run.countdown_elapsed(now) {
                    session.activate(run.derived_index(now).max(run.current_question_index));
                    changed = true;
                }
                if session.state == SessionState::Active {
                    if run.time_expired(now) {
                        let score = self.score_outcome(session);
                        if session.finalize_submitted(FinalizeCause::TimeExpired, score, now).is_ok()
                        {
                            changed = true;
                        }
                    } else {
                        let index = run.derived_index(now).max(run.current_question_index);
                        if index > session.current_question_index {
                            session.sync_cursor(index);
                            changed = true;
                        }
                    }
                }
            }
            _ => {
                // The session's run was stopped or expired while this
                // participant was offline; close it out the same way the
                // run-ending sweep would have.
                if !session.state.is_terminal() {
                    let score = self.score_outcome(session);
                    if session.finalize_submitted(FinalizeCause::TimeExpired, score, now).is_ok() {
                        changed = true;
                    }
                }
            }
        }

        if session.score_pending {
            if let Ok(score) = score_answers(self.bank.as_ref(), &session.answers) {
                session.resolve_pending_score(score);
                changed = true;
            }
        }

        changed
    }

    fn score_outcome(&self, session: &ParticipantSession) -> ScoreOutcome {
        let answered = session.answered_count();
        match score_answers(self.bank.as_ref(), &session.answers) {
            Ok(score) => ScoreOutcome::Final { score, answered },
            Err(err) => {
                tracing::warn!(
                    participant_id = %session.participant_id,
                    error = %err,
                    "Scoring collaborator unavailable; finalizing with pending score"
                );
                ScoreOutcome::Pending { answered }
            }
        }
    }

    /// Finalizes every non-terminal session of a run. Individual failures are
    /// logged and skipped: the run is cleared regardless, so a session that
    /// could not be saved is shut out by the run-id check and closed lazily
    /// on its next touch.
    async fn finalize_run_sessions(
        &self,
        run: &ExamRun,
        cause: FinalizeCause,
        now: OffsetDateTime,
    ) {
        let sessions = match self.store.list_sessions().await {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::error!(error = %err, "Failed to list sessions while ending run");
                return;
            }
        };

        for session in sessions {
            if session.run_id != run.run_id || session.state.is_terminal() {
                continue;
            }
            let guard = self.session_guard(&session.participant_id).await;
            let _lock = guard.lock().await;

            let mut session = match self.store.load_session(&session.participant_id).await {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to reload session while ending run");
                    continue;
                }
            };
            if session.state.is_terminal() {
                continue;
            }

            let score = self.score_outcome(&session);
            if session.finalize_submitted(cause, score, now).is_err() {
                continue;
            }
            if let Err(err) = self.store.save_session(&session).await {
                tracing::error!(
                    participant_id = %session.participant_id,
                    error = %err,
                    "Failed to persist finalization; session will close on next touch"
                );
                continue;
            }
            self.emit_finalized(&session);
        }
    }

    fn emit_finalized(&self, session: &ParticipantSession) {
        metrics::counter!(
            "exam_sessions_finalized_total",
            "cause" => session.finalize_cause.map(FinalizeCause::as_str).unwrap_or("unknown")
        )
        .increment(1);

        match session.state {
            SessionState::Disqualified => {
                self.events.publish_admin(AdminEvent::StudentDisqualified {
                    participant_id: session.participant_id.clone(),
                    reason: session
                        .disqualification_reason
                        .clone()
                        .unwrap_or_else(|| "disqualified".to_string()),
                });
            }
            _ => {
                self.events.publish_admin(AdminEvent::StudentProgress {
                    participant_id: session.participant_id.clone(),
                    question_index: session.current_question_index,
                    answered_count: session.answered_count(),
                });
            }
        }
    }

    fn status_view(
        &self,
        session: Option<&ParticipantSession>,
        control: &ControlRecord,
        now: OffsetDateTime,
    ) -> ExamStatusResponse {
        let run = control.run.as_ref();
        let countdown_active = run.is_some_and(|run| !run.countdown_elapsed(now));
        let is_exam_active = run.is_some_and(|run| run.countdown_elapsed(now));

        let mut view = ExamStatusResponse {
            has_session: session.is_some(),
            state: session.map(|session| session.state).unwrap_or(SessionState::Idle),
            run_id: session.map(|session| session.run_id.clone()),
            is_exam_active,
            countdown_active,
            countdown_start_time: run.map(|run| format_offset(run.countdown_start_time)),
            countdown_seconds: run
                .filter(|run| !run.countdown_elapsed(now))
                .map(|run| run.countdown_remaining(now)),
            current_question_index: session
                .filter(|session| session.state == SessionState::Active)
                .map(|session| session.current_question_index),
            remaining_seconds: None,
            question_remaining_seconds: None,
            total_questions: control.config.total_questions,
            question_time_limit: control.config.question_time_limit_seconds,
            tab_switch_count: session.map(|session| session.tab_switch_count).unwrap_or(0),
            fullscreen_exit_count: session
                .map(|session| session.fullscreen_exit_count)
                .unwrap_or(0),
            is_disqualified: session
                .is_some_and(|session| session.state == SessionState::Disqualified),
            disqualification_reason: session
                .and_then(|session| session.disqualification_reason.clone()),
            final_score: session.and_then(|session| session.final_score),
            total_answered: session.and_then(|session| session.total_answered),
            score_pending: session.is_some_and(|session| session.score_pending),
            finalize_cause: session.and_then(|session| session.finalize_cause),
        };

        if let (Some(session), Some(run)) = (session, run) {
            if session.run_id == run.run_id {
                match session.state {
                    SessionState::Countdown => {
                        view.remaining_seconds = Some(run.countdown_remaining(now));
                    }
                    SessionState::Active => {
                        view.remaining_seconds = Some(run.exam_remaining(now));
                        view.question_remaining_seconds = Some(clock::question_remaining_seconds(
                            now,
                            run.exam_start_time,
                            run.question_time_limit_seconds,
                        ));
                    }
                    _ => {}
                }
            }
        }

        view
    }
}

fn build_run(config: &ExamConfig, now: OffsetDateTime, countdown_seconds: i64) -> ExamRun {
    let exam_start_time = clock::exam_start_time(now, countdown_seconds);
    ExamRun {
        run_id: Uuid::new_v4().to_string(),
        countdown_start_time: now,
        countdown_seconds,
        exam_start_time,
        exam_end_time: clock::exam_end_time(
            exam_start_time,
            config.total_questions,
            config.question_time_limit_seconds,
        ),
        total_questions: config.total_questions,
        question_time_limit_seconds: config.question_time_limit_seconds,
        current_question_index: 0,
        started: false,
    }
}

fn validate_config(config: &ExamConfig) -> Result<(), EngineError> {
    if config.total_questions < 1 {
        return Err(EngineError::InvalidSettings("total_questions must be at least 1"));
    }
    if config.question_time_limit_seconds < 1 {
        return Err(EngineError::InvalidSettings("question_time_limit_seconds must be at least 1"));
    }
    if !(20..=300).contains(&config.countdown_duration_seconds) {
        return Err(EngineError::InvalidSettings(
            "countdown_duration_seconds must be within [20, 300]",
        ));
    }
    Ok(())
}
