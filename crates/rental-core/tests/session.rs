//! Integration tests for the session manager transitions.

mod fixtures;

use std::time::Duration;

use fixtures::{auth_body, can_bind_localhost, client_for, unauthorized, user_json};
use rental_core::services::bookings;
use rental_core::session::{AuthSession, SessionState};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn wait_for_anonymous(session: &AuthSession) {
    let mut rx = session.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| *state == SessionState::Anonymous),
    )
    .await
    .expect("session should become anonymous")
    .expect("session sender alive");
}

#[tokio::test]
async fn test_bootstrap_with_stored_tokens_authenticates() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": user_json("u1")})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("access-1", "refresh-1");
    let session = AuthSession::new(client);
    assert!(session.is_loading());

    let state = session.bootstrap().await;

    assert!(matches!(state, SessionState::Authenticated(ref user) if user.id == "u1"));
    assert!(session.is_authenticated());
    assert!(!session.is_loading());
    assert_eq!(session.user().unwrap().email, "u1@example.com");
}

/// Test: an expired refresh token at startup ends in Anonymous with tokens cleared.
#[tokio::test]
async fn test_bootstrap_with_expired_refresh_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("stale-access", "expired-refresh");
    let session = AuthSession::new(client);

    assert_eq!(session.bootstrap().await, SessionState::Anonymous);
    assert!(!session.client().tokens().has_credentials());
    assert!(session.client().tokens().access_token().is_none());
}

#[tokio::test]
async fn test_login_and_logout() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("access-1", "refresh-1", "u1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Logged out"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = AuthSession::new(client_for(&server));
    session.bootstrap().await;
    let mut rx = session.subscribe();

    let user = session.login("u1@example.com", "secret").await.unwrap();
    assert_eq!(user.id, "u1");
    assert!(rx.has_changed().unwrap());
    assert!(matches!(*rx.borrow_and_update(), SessionState::Authenticated(_)));

    session.logout().await;
    assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);
    assert!(!session.client().tokens().has_credentials());
}

#[tokio::test]
async fn test_failed_login_stays_anonymous() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&server)
        .await;

    let session = AuthSession::new(client_for(&server));
    session.bootstrap().await;

    let err = session.login("u1@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.message, "Invalid credentials");
    assert_eq!(session.state(), SessionState::Anonymous);
}

/// Test: logout clears local tokens even when the server rejects the refresh token.
#[tokio::test]
async fn test_logout_with_rejected_refresh_token_still_clears() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid refresh token"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("access-1", "revoked-refresh");
    let session = AuthSession::new(client);
    session.bootstrap().await;
    assert!(session.is_authenticated());

    session.logout().await;

    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(session.client().tokens().access_token().is_none());
    assert!(session.client().tokens().refresh_token().is_none());
}

/// Test: a refresh failure during any service call drops the session.
#[tokio::test]
async fn test_refresh_failure_elsewhere_ends_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("access-1", "refresh-1", "u1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bookings"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid token"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = AuthSession::new(client_for(&server));
    session.bootstrap().await;
    session.login("u1@example.com", "secret").await.unwrap();
    assert!(session.is_authenticated());

    let err = bookings::list_bookings(session.client()).await.unwrap_err();
    assert!(err.is_session_expired());

    wait_for_anonymous(&session).await;
    assert!(session.user().is_none());
}
