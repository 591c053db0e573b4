use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{bootstrap, config::Settings, events::EventHub, state::AppState};
use crate::services::controller::ExamController;
use crate::services::question_bank::tests::fixture_questions;
use crate::services::question_bank::StaticQuestionBank;
use crate::store::memory::MemoryStore;
use crate::store::models::ExamConfig;

pub(crate) const TEST_ADMIN_TOKEN: &str = "test-admin-token";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("OLYMPIAD_ENV", "test");
    std::env::set_var("OLYMPIAD_STRICT_CONFIG", "0");
    std::env::set_var("ADMIN_API_TOKEN", TEST_ADMIN_TOKEN);
    std::env::set_var("EXAM_TOTAL_QUESTIONS", "5");
    std::env::set_var("EXAM_QUESTION_TIME_LIMIT_SECONDS", "7");
    std::env::set_var("EXAM_COUNTDOWN_SECONDS", "20");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("QUESTION_BANK_PATH");
}

/// Full application wired against an in-memory store and a five-question
/// fixture bank (correct option is always "a").
pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let exam = settings.exam();
    let defaults = ExamConfig {
        total_questions: exam.total_questions,
        question_time_limit_seconds: exam.question_time_limit_seconds,
        countdown_duration_seconds: exam.countdown_duration_seconds,
        disqualify_on_fullscreen_exit: exam.disqualify_on_fullscreen_exit,
    };

    let store = Arc::new(MemoryStore::new());
    let bank = Arc::new(StaticQuestionBank::from_questions(fixture_questions(5)));
    let events = EventHub::new();
    let controller =
        Arc::new(ExamController::new(store.clone(), bank, events.clone(), defaults));

    let state = AppState::new(settings, store, controller, events);
    bootstrap::ensure_exam_config(&state).await.expect("seed exam config");
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) fn participant_request(
    method: Method,
    uri: &str,
    participant_id: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(participant_id) = participant_id {
        builder = builder.header("x-participant-id", participant_id);
    }

    attach_body(builder, body)
}

pub(crate) fn admin_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    attach_body(builder, body)
}

fn attach_body(
    builder: axum::http::request::Builder,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
