use axum::http::{Method, StatusCode};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::now_utc;
use crate::test_support::{self, TEST_ADMIN_TOKEN};

#[tokio::test]
async fn admin_surface_requires_the_configured_token() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(Method::GET, "/api/v1/admin/exam/status", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::GET,
            "/api/v1/admin/exam/status",
            Some("wrong-token"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn starting_twice_conflicts() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/start",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("start");
    assert_eq!(response.status(), StatusCode::OK);
    let status = test_support::read_json(response).await;
    assert_eq!(status["countdown_active"], true);
    assert!(status["run_id"].is_string());
    assert_eq!(status["total_questions"], 5);

    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/start",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("second start");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn scheduling_in_the_past_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let past = (now_utc() - Duration::hours(1)).format(&Rfc3339).expect("format");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/schedule",
            Some(TEST_ADMIN_TOKEN),
            Some(json!({"scheduledStartTime": past})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let future = (now_utc() + Duration::minutes(5)).format(&Rfc3339).expect("format");
    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/schedule",
            Some(TEST_ADMIN_TOKEN),
            Some(json!({"scheduledStartTime": future})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let status = test_support::read_json(response).await;
    assert_eq!(status["countdown_active"], true);
}

#[tokio::test]
async fn settings_are_locked_while_a_run_exists() {
    let ctx = test_support::setup_test_context().await;
    let payload = json!({
        "totalQuestions": 8,
        "questionTimeLimit": 10,
        "countdownDuration": 60,
        "disqualifyOnFullscreenExit": false
    });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(
            Method::PUT,
            "/api/v1/admin/exam/settings",
            Some(TEST_ADMIN_TOKEN),
            Some(payload.clone()),
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let status = test_support::read_json(response).await;
    assert_eq!(status["total_questions"], 8);
    assert_eq!(status["countdown_duration"], 60);
    assert_eq!(status["disqualify_on_fullscreen_exit"], false);

    ctx.app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/start",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("start");

    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::PUT,
            "/api/v1/admin/exam/settings",
            Some(TEST_ADMIN_TOKEN),
            Some(payload),
        ))
        .await
        .expect("locked update");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn settings_bounds_are_rejected_with_400() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::PUT,
            "/api/v1/admin/exam/settings",
            Some(TEST_ADMIN_TOKEN),
            Some(json!({
                "totalQuestions": 5,
                "questionTimeLimit": 7,
                "countdownDuration": 5,
                "disqualifyOnFullscreenExit": true
            })),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn live_view_and_disqualification_round_trip() {
    let ctx = test_support::setup_test_context().await;
    ctx.state
        .controller()
        .start_now(now_utc() - Duration::seconds(21))
        .await
        .expect("start run");

    ctx.app
        .clone()
        .oneshot(test_support::participant_request(
            Method::POST,
            "/api/v1/exam/start",
            Some("alice"),
            None,
        ))
        .await
        .expect("join");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/students/disqualify",
            Some(TEST_ADMIN_TOKEN),
            Some(json!({"participantId": "alice", "reason": "proctor decision"})),
        ))
        .await
        .expect("disqualify");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::GET,
            "/api/v1/admin/students/live",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("live view");
    assert_eq!(response.status(), StatusCode::OK);
    let live = test_support::read_json(response).await;
    let sessions = live.as_array().expect("live sessions");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["participant_id"], "alice");
    assert_eq!(sessions[0]["is_disqualified"], true);
    assert_eq!(sessions[0]["disqualification_reason"], "proctor decision");
}

#[tokio::test]
async fn stop_and_clear_reset_the_run() {
    let ctx = test_support::setup_test_context().await;

    ctx.app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/start",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("start");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/stop",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("stop");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::admin_request(
            Method::POST,
            "/api/v1/admin/exam/clear",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("clear");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::admin_request(
            Method::GET,
            "/api/v1/admin/exam/status",
            Some(TEST_ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("status");
    let status = test_support::read_json(response).await;
    assert_eq!(status["is_exam_active"], false);
    assert_eq!(status["countdown_active"], false);
    assert!(status["run_id"].is_null());
}
