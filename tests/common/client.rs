//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all journ-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// HTTP test client holding the bearer tokens of its last login
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    access_token: Mutex<Option<String>>,
    refresh_token: Mutex<Option<String>>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Redirects are not followed, so activation responses can be inspected.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            access_token: Mutex::new(None),
            refresh_token: Mutex::new(None),
        }
    }

    /// Creates a client logged in as the default test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_EMAIL, TEST_PASS).await
    }

    pub async fn authenticated_as(base_url: String, email: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let (status, body) = client.login(email, password).await;
        assert_eq!(status, 200, "Test user authentication failed: {}", body);

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.lock().unwrap().clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().unwrap().clone()
    }

    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap() = token;
    }

    /// Remembers the tokens of a successful login or refresh response body.
    fn store_tokens(&self, body: &Value) {
        if let Some(access) = body["access_token"].as_str() {
            *self.access_token.lock().unwrap() = Some(access.to_string());
        }
        if let Some(refresh) = body["refresh_token"].as_str() {
            *self.refresh_token.lock().unwrap() = Some(refresh.to_string());
        }
    }

    fn with_access(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and, for successful JSON responses, keeps any tokens in the body.
    async fn send_and_keep_tokens(&self, request: reqwest::RequestBuilder) -> (u16, Value) {
        let response = request.send().await.expect("Request failed");
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status == 200 {
            self.store_tokens(&body);
        }
        (status, body)
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/signup
    pub async fn signup(&self, email: &str, username: &str, password: &str) -> Response {
        self.signup_with_body(json!({
            "email": email,
            "username": username,
            "password": password,
        }))
        .await
    }

    /// POST /v1/auth/signup with an arbitrary body
    pub async fn signup_with_body(&self, body: Value) -> Response {
        self.client
            .post(self.url("/v1/auth/signup"))
            .json(&body)
            .send()
            .await
            .expect("Signup request failed")
    }

    /// POST /v1/auth/login, keeping the returned tokens
    pub async fn login(&self, email: &str, password: &str) -> (u16, Value) {
        let request = self
            .client
            .post(self.url("/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        self.send_and_keep_tokens(request).await
    }

    /// GET /v1/auth/refresh with the stored refresh token
    pub async fn refresh(&self) -> (u16, Value) {
        let token = self.refresh_token().unwrap_or_default();
        self.refresh_with(&token).await
    }

    /// GET /v1/auth/refresh with an explicit refresh token
    pub async fn refresh_with(&self, refresh_token: &str) -> (u16, Value) {
        let request = self
            .client
            .get(self.url("/v1/auth/refresh"))
            .bearer_auth(refresh_token);
        self.send_and_keep_tokens(request).await
    }

    /// POST /v1/auth/logout with the stored refresh token
    pub async fn logout(&self) -> Response {
        let token = self.refresh_token().unwrap_or_default();
        self.client
            .post(self.url("/v1/auth/logout"))
            .bearer_auth(token)
            .send()
            .await
            .expect("Logout request failed")
    }

    /// POST /v1/auth/reset_password
    pub async fn reset_password(&self, old_password: &str, new_password: &str) -> Response {
        self.with_access(self.client.post(self.url("/v1/auth/reset_password")))
            .json(&json!({ "old_password": old_password, "new_password": new_password }))
            .send()
            .await
            .expect("Reset password request failed")
    }

    /// PUT /v1/auth/update_details
    pub async fn update_details(&self, body: Value) -> Response {
        self.with_access(self.client.put(self.url("/v1/auth/update_details")))
            .json(&body)
            .send()
            .await
            .expect("Update details request failed")
    }

    /// GET /v1/auth/get_details/{user_id}
    pub async fn get_details(&self, user_id: usize) -> Response {
        self.with_access(
            self.client
                .get(self.url(&format!("/v1/auth/get_details/{}", user_id))),
        )
        .send()
        .await
        .expect("Get details request failed")
    }

    /// GET /v1/auth/account/activation?code=...
    pub async fn activate(&self, code: &str) -> Response {
        self.client
            .get(self.url("/v1/auth/account/activation"))
            .query(&[("code", code)])
            .send()
            .await
            .expect("Activation request failed")
    }

    /// GET /v1/auth/account/activation with no query string
    pub async fn activate_without_code(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/account/activation"))
            .send()
            .await
            .expect("Activation request failed")
    }

    /// POST /v1/auth/account/activation
    pub async fn request_activation(&self, email: &str) -> Response {
        self.client
            .post(self.url("/v1/auth/account/activation"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Activation request failed")
    }

    // ========================================================================
    // Journal Endpoints
    // ========================================================================

    /// POST /v1/journal
    pub async fn create_entry(&self, title: &str, content: &str, category_id: Option<usize>) -> Response {
        self.with_access(self.client.post(self.url("/v1/journal")))
            .json(&json!({ "title": title, "content": content, "category_id": category_id }))
            .send()
            .await
            .expect("Create entry request failed")
    }

    /// GET /v1/journal
    pub async fn list_entries(&self) -> Response {
        self.with_access(self.client.get(self.url("/v1/journal")))
            .send()
            .await
            .expect("List entries request failed")
    }

    /// GET /v1/journal/{id}
    pub async fn get_entry(&self, id: usize) -> Response {
        self.with_access(self.client.get(self.url(&format!("/v1/journal/{}", id))))
            .send()
            .await
            .expect("Get entry request failed")
    }

    /// PUT /v1/journal/{id}
    pub async fn update_entry(&self, id: usize, body: Value) -> Response {
        self.with_access(self.client.put(self.url(&format!("/v1/journal/{}", id))))
            .json(&body)
            .send()
            .await
            .expect("Update entry request failed")
    }

    /// DELETE /v1/journal/{id}
    pub async fn delete_entry(&self, id: usize) -> Response {
        self.with_access(self.client.delete(self.url(&format!("/v1/journal/{}", id))))
            .send()
            .await
            .expect("Delete entry request failed")
    }

    /// POST /v1/journal/category
    pub async fn create_category(&self, name: &str) -> Response {
        self.with_access(self.client.post(self.url("/v1/journal/category")))
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("Create category request failed")
    }

    /// GET /v1/journal/category
    pub async fn list_categories(&self) -> Response {
        self.with_access(self.client.get(self.url("/v1/journal/category")))
            .send()
            .await
            .expect("List categories request failed")
    }

    /// GET /v1/journal/category/{id}
    pub async fn list_category_entries(&self, id: usize) -> Response {
        self.with_access(
            self.client
                .get(self.url(&format!("/v1/journal/category/{}", id))),
        )
        .send()
        .await
        .expect("List category entries request failed")
    }

    /// PUT /v1/journal/category/{id}
    pub async fn rename_category(&self, id: usize, name: &str) -> Response {
        self.with_access(
            self.client
                .put(self.url(&format!("/v1/journal/category/{}", id))),
        )
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Rename category request failed")
    }

    /// DELETE /v1/journal/category/{id}
    pub async fn delete_category(&self, id: usize) -> Response {
        self.with_access(
            self.client
                .delete(self.url(&format!("/v1/journal/category/{}", id))),
        )
        .send()
        .await
        .expect("Delete category request failed")
    }
}
