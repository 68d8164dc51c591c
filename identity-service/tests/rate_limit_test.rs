//! Login rate limiting over the attempt log, against a live PostgreSQL.
//!
//! Run with: cargo test -- --ignored

mod common;

use axum::http::StatusCode;
use common::{live_state, unique_account, TestRequest};
use identity_service::build_router;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn sixteenth_failure_in_window_is_denied_with_retry_after() {
    let state = live_state().await;
    let app = build_router(state);
    let (email, _) = unique_account();
    let ip = "203.0.113.77";

    // 15 failures for a nonexistent account fill the window.
    for i in 0..15 {
        let (status, body) = TestRequest::new("POST", "/auth/login")
            .from_ip(ip)
            .json(serde_json::json!({ "email": email, "password": "WrongPass1" }))
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {}", i);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    // The 16th is cut off before credentials are even checked.
    let (status, body) = TestRequest::new("POST", "/auth/login")
        .from_ip(ip)
        .json(serde_json::json!({ "email": email, "password": "WrongPass1" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");

    let retry_after = body["details"]["retry_after"].as_str().unwrap();
    let retry_after = chrono::DateTime::parse_from_rfc3339(retry_after)
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert!(retry_after > chrono::Utc::now());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn limiter_keys_on_identifier_and_ip_pair() {
    let state = live_state().await;
    let app = build_router(state);
    let (email, _) = unique_account();

    for _ in 0..15 {
        TestRequest::new("POST", "/auth/login")
            .from_ip("198.51.100.1")
            .json(serde_json::json!({ "email": email, "password": "WrongPass1" }))
            .send(&app)
            .await;
    }

    // Same identifier from another address is still allowed.
    let (status, body) = TestRequest::new("POST", "/auth/login")
        .from_ip("198.51.100.2")
        .json(serde_json::json!({ "email": email, "password": "WrongPass1" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    // A different identifier from the throttled address is allowed too.
    let (other_email, _) = unique_account();
    let (status, _) = TestRequest::new("POST", "/auth/login")
        .from_ip("198.51.100.1")
        .json(serde_json::json!({ "email": other_email, "password": "WrongPass1" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn successful_logins_do_not_count_toward_the_threshold() {
    let state = live_state().await;
    let app = build_router(state);
    let (email, username) = unique_account();
    let ip = "192.0.2.10";

    TestRequest::new("POST", "/auth/register")
        .json(serde_json::json!({
            "email": email,
            "username": username,
            "password": "Aa12345!"
        }))
        .send(&app)
        .await;

    // A pile of successes never trips the limiter.
    for _ in 0..20 {
        let (status, _) = TestRequest::new("POST", "/auth/login")
            .from_ip(ip)
            .json(serde_json::json!({ "email": email, "password": "Aa12345!" }))
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    // And prior failures are not cleared by a success: 14 failures, one
    // success, one more failure is still under the 15-failure threshold...
    for _ in 0..14 {
        TestRequest::new("POST", "/auth/login")
            .from_ip(ip)
            .json(serde_json::json!({ "email": email, "password": "WrongPass1" }))
            .send(&app)
            .await;
    }
    let (status, _) = TestRequest::new("POST", "/auth/login")
        .from_ip(ip)
        .json(serde_json::json!({ "email": email, "password": "Aa12345!" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = TestRequest::new("POST", "/auth/login")
        .from_ip(ip)
        .json(serde_json::json!({ "email": email, "password": "WrongPass1" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // ...but that 15th failure fills the window.
    let (status, _) = TestRequest::new("POST", "/auth/login")
        .from_ip(ip)
        .json(serde_json::json!({ "email": email, "password": "Aa12345!" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
