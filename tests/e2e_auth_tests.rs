//! End-to-end tests for authentication endpoints
//!
//! Tests signup, login, token refresh, logout and account details.

mod common;

use common::{
    TestClient, TestServer, OTHER_EMAIL, OTHER_USER, TEST_EMAIL, TEST_PASS, TEST_USER,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_signup_creates_account_and_sends_verification_email() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .signup("carol@example.com", "carol", "carol-password")
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert!(body["user_id"].as_u64().is_some());

    let email = server.wait_for_email("carol@example.com", 1).await;
    assert_eq!(email.subject, "Account Registration");
    assert!(email.html.contains("carol"));
    assert!(email
        .html
        .contains(&format!("{}/v1/auth/account/activation?code=", server.base_url)));
}

#[tokio::test]
async fn test_signup_rejects_duplicates_and_invalid_input() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.signup(TEST_EMAIL, "someone", "password123").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        format!("The email '{}' is already registered.", TEST_EMAIL)
    );

    let response = client
        .signup("new@example.com", TEST_USER, "password123")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        format!("The username '{}' is already taken.", TEST_USER)
    );

    let response = client.signup("not-an-email", "dave", "password123").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.signup("dave@example.com", "dave", "short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was mailed for the rejected attempts
    assert!(server.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let (status, body) = client.login(TEST_EMAIL, TEST_PASS).await;

    assert_eq!(status, 200);
    assert_eq!(body["user_email"], TEST_EMAIL);
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn test_login_with_invalid_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let (status, _) = client.login(TEST_EMAIL, "wrong_password").await;

    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_login_with_nonexistent_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let (status, _) = client.login("nobody@example.com", "password").await;

    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_refresh_rotates_refresh_tokens() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let first_refresh = client.refresh_token().unwrap();

    let (status, body) = client.refresh().await;
    assert_eq!(status, 200);
    assert_ne!(body["refresh_token"].as_str().unwrap(), first_refresh);

    // The used token is gone
    let (status, _) = client.refresh_with(&first_refresh).await;
    assert_eq!(status, 401);

    // The new access token works
    let response = client.list_entries().await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token_expires() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    server.advance_clock(chrono::Duration::days(8));

    let (status, _) = client.refresh().await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = client.refresh().await;
    assert_eq!(status, 401);

    // Logging out twice with the same token fails
    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.reset_password("wrong_password", "brand-new-pass").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.reset_password(TEST_PASS, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.reset_password(TEST_PASS, "brand-new-pass").await;
    assert_eq!(response.status(), StatusCode::OK);

    let fresh = TestClient::new(server.base_url.clone());
    let (status, _) = fresh.login(TEST_EMAIL, TEST_PASS).await;
    assert_eq!(status, 401);
    let (status, _) = fresh.login(TEST_EMAIL, "brand-new-pass").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_get_details_is_limited_to_own_account() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let (_, login) = client.login(TEST_EMAIL, TEST_PASS).await;
    let user_id = login["user_id"].as_u64().unwrap() as usize;

    let response = client.get_details(user_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], TEST_EMAIL);
    assert_eq!(body["username"], TEST_USER);
    assert_eq!(body["activated"], true);
    assert!(body.get("hash").is_none());

    let other = TestClient::authenticated_as(
        server.base_url.clone(),
        OTHER_EMAIL,
        common::OTHER_PASS,
    )
    .await;
    let response = other.get_details(user_id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_details() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .update_details(json!({ "username": "alice2", "phone_number": "+15550001" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], "alice2");
    assert_eq!(body["user"]["phone_number"], "+15550001");

    let response = client.update_details(json!({ "username": OTHER_USER })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        format!("The username '{}' is already taken.", OTHER_USER)
    );

    let response = client.update_details(json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_endpoints_require_a_valid_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_entries().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    client.set_access_token(Some("garbage".to_string()));
    let response = client.list_entries().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
