use crate::error::ApiError;
use crate::responses::{Credentials, RefreshPayload, SignUpResponse};
use async_trait::async_trait;
use core_types::{AuthUser, Session};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod error;
pub mod manager;
pub mod responses;
// --- Public API ---
pub use manager::shared_client;
pub use responses::ApiErrorResponse;

/// The outcome of a sign-up call.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Confirmation is disabled on the backend: the user is signed in right away.
    SignedIn(Session),
    /// A confirmation mail was sent; the user must verify before signing in.
    ConfirmationRequired(AuthUser),
}

/// The abstract interface to the hosted authentication API.
/// Handlers depend on this trait so the live client can be swapped for a fake.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ApiError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError>;

    /// Revokes the refresh token family behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), ApiError>;

    /// Exchanges a refresh token for a new session. Callers try this once.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, ApiError>;

    /// Resolves an access token to its user; fails when the token is invalid or expired.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ApiError>;
}

/// A concrete `AuthProvider` talking to a GoTrue-style REST API under `{base_url}/auth/v1`.
#[derive(Clone)]
pub struct HostedAuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl HostedAuthClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key)
                .map_err(|_| ApiError::InvalidConfig("anon key is not a valid header value".to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let text = self.send_raw(request).await?;
        serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let message = serde_json::from_str::<ApiErrorResponse>(&text)
            .unwrap_or_default()
            .into_message(status.canonical_reason().unwrap_or("request failed"));

        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            tracing::debug!(status = status.as_u16(), %message, "Auth API rejected request.");
            Err(ApiError::Rejected(status.as_u16(), message))
        } else {
            tracing::warn!(status = status.as_u16(), %message, "Auth API failure.");
            Err(ApiError::Upstream(status.as_u16(), message))
        }
    }
}

#[async_trait]
impl AuthProvider for HostedAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ApiError> {
        let request = self
            .client
            .post(self.url("/signup"))
            .json(&Credentials { email, password });

        match self.send::<SignUpResponse>(request).await? {
            SignUpResponse::Session(session) => Ok(SignUpOutcome::SignedIn(session)),
            SignUpResponse::User(user) => Ok(SignUpOutcome::ConfirmationRequired(user)),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let request = self
            .client
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        self.send(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/logout"))
            .bearer_auth(access_token);
        self.send_raw(request).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let request = self
            .client
            .post(self.url("/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshPayload { refresh_token });
        self.send(request).await
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ApiError> {
        let request = self.client.get(self.url("/user")).bearer_auth(access_token);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json(id: Uuid) -> serde_json::Value {
        json!({
            "id": id,
            "aud": "authenticated",
            "email": "user@example.com",
            "email_confirmed_at": "2024-01-01T00:00:00Z"
        })
    }

    fn session_json(id: Uuid) -> serde_json::Value {
        json!({
            "access_token": "access-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": user_json(id)
        })
    }

    #[tokio::test]
    async fn sign_in_uses_password_grant_and_anon_key() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({ "email": "user@example.com", "password": "hunter22" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(id)))
            .expect(1)
            .mount(&server)
            .await;

        let client = HostedAuthClient::new(&server.uri(), "anon-key").unwrap();
        let session = client.sign_in("user@example.com", "hunter22").await.unwrap();

        assert_eq!(session.access_token, "access-1");
        assert_eq!(session.user.id, id);
        assert!(session.user.email_verified());
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected_with_the_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let client = HostedAuthClient::new(&server.uri(), "anon-key").unwrap();
        let err = client.sign_in("user@example.com", "wrong-pw").await.unwrap_err();

        assert!(matches!(err, ApiError::Rejected(400, ref m) if m == "Invalid login credentials"));
    }

    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "email": "new@example.com",
                "email_confirmed_at": null
            })))
            .mount(&server)
            .await;

        let client = HostedAuthClient::new(&server.uri(), "anon-key").unwrap();
        match client.sign_up("new@example.com", "hunter22").await.unwrap() {
            SignUpOutcome::ConfirmationRequired(user) => {
                assert_eq!(user.id, id);
                assert!(!user.email_verified());
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })))
            .mount(&server)
            .await;

        let client = HostedAuthClient::new(&server.uri(), "anon-key").unwrap();
        let err = client.get_user("stale").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "JWT expired");
    }

    #[tokio::test]
    async fn refresh_uses_refresh_grant() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({ "refresh_token": "refresh-0" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(id)))
            .mount(&server)
            .await;

        let client = HostedAuthClient::new(&server.uri(), "anon-key").unwrap();
        let session = client.refresh("refresh-0").await.unwrap();
        assert_eq!(session.refresh_token, "refresh-1");
    }

    #[tokio::test]
    async fn server_errors_are_upstream_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HostedAuthClient::new(&server.uri(), "anon-key").unwrap();
        let err = client.sign_out("token").await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(503, _)));
    }
}
