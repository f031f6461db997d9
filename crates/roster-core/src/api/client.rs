//! API client for communicating with the users REST API.
//!
//! This module provides the `ApiClient` struct for making requests that
//! list, create, update and delete users.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::models::{NewUser, Page, User, UserChanges, UserPatch};

use super::{ApiError, PagedFetcher, UserMutations};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL of the users API
pub const DEFAULT_BASE_URL: &str = "https://reqres.in/api";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying the public API key
const API_KEY_HEADER: &str = "x-api-key";

/// API client for the users service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            token: None,
        })
    }

    /// Set the API key sent with every request
    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key).filter(|k| !k.is_empty());
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token).filter(|t| !t.is_empty());
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        let mut api = self.clone();
        api.set_token(token);
        api
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    fn user_url(&self, id: i64) -> String {
        format!("{}/users/{}", self.base_url, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request.header(header::ACCEPT, "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    // ===== Users =====

    /// Fetch one page of the users listing
    pub async fn get_users(&self, page: u32) -> Result<Page, ApiError> {
        debug!(page, "Fetching users page");
        let request = self.client.get(self.users_url()).query(&[("page", page)]);
        self.send_json(request).await
    }

    /// Create a user; the server assigns the id
    pub async fn create(&self, user: &NewUser) -> Result<User, ApiError> {
        debug!(email = %user.email, "Creating user");
        let request = self.client.post(self.users_url()).json(user);
        let body: Value = self.send_json(request).await?;
        user_from_response(body, None)
    }

    /// Partially update a user; only the fields set in `changes` are sent
    pub async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User, ApiError> {
        debug!(id, "Updating user");
        let request = self
            .client
            .patch(self.user_url(id))
            .json(&UserPatch { changes, id });
        let body: Value = self.send_json(request).await?;
        user_from_response(body, Some(id))
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        debug!(id, "Deleting user");
        let response = self
            .authorize(self.client.delete(self.user_url(id)))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

/// Mutation responses only echo what was sent (plus timestamps); an update
/// response carries no id at all, so fill it in from the request.
fn user_from_response(mut body: Value, id: Option<i64>) -> Result<User, ApiError> {
    if let (Some(id), Some(obj)) = (id, body.as_object_mut()) {
        obj.entry("id").or_insert(Value::from(id));
    }
    serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

impl PagedFetcher for ApiClient {
    fn fetch_page(&self, page: u32) -> BoxFuture<'_, Result<Page, ApiError>> {
        self.get_users(page).boxed()
    }
}

impl UserMutations for ApiClient {
    fn create_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, Result<User, ApiError>> {
        self.create(user).boxed()
    }

    fn update_user<'a>(
        &'a self,
        id: i64,
        changes: &'a UserChanges,
    ) -> BoxFuture<'a, Result<User, ApiError>> {
        ApiClient::update_user(self, id, changes).boxed()
    }

    fn delete_user(&self, id: i64) -> BoxFuture<'_, Result<(), ApiError>> {
        ApiClient::delete_user(self, id).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let api = ApiClient::new("https://example.test/api/").unwrap();
        assert_eq!(api.base_url(), "https://example.test/api");
        assert_eq!(api.users_url(), "https://example.test/api/users");
        assert_eq!(api.user_url(5), "https://example.test/api/users/5");
    }

    #[test]
    fn test_empty_credentials_ignored() {
        let mut api = ApiClient::new(DEFAULT_BASE_URL).unwrap();
        api.set_api_key(String::new());
        api.set_token(String::new());
        assert!(api.api_key.is_none());
        assert!(api.token.is_none());

        let api = api.with_token("abc".to_string());
        assert_eq!(api.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_update_response_gets_request_id() {
        let body = json!({ "first_name": "X", "updatedAt": "2025-01-01T00:00:00.000Z" });
        let user = user_from_response(body, Some(9)).unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(user.first_name, "X");
    }

    #[test]
    fn test_create_response_keeps_server_id() {
        let body = json!({
            "first_name": "Ann", "last_name": "Lee", "email": "ann@example.com",
            "id": "731", "createdAt": "2025-01-01T00:00:00.000Z"
        });
        let user = user_from_response(body, None).unwrap();
        assert_eq!(user.id, 731);
    }

    #[test]
    fn test_response_without_id_is_invalid() {
        let err = user_from_response(json!({ "first_name": "X" }), None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
