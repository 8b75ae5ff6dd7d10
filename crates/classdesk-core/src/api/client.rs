//! HTTP client for the classdesk authentication endpoint.
//!
//! The endpoint accepts `POST {base}/login` with a JSON body of
//! `{ "name", "password" }` and answers with a JWT.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthError;

/// Base URL used when neither the environment nor the config file names one.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credential payload sent to the login endpoint.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

/// Body returned by a successful login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthenticationResponse {
    pub jwt: Option<String>,
    #[serde(rename = "tokenType")]
    pub token_type: Option<String>,
    /// Token lifetime in milliseconds, as reported by the server.
    #[serde(rename = "expiresIn")]
    pub expires_in: Option<i64>,
}

impl AuthenticationResponse {
    /// The issued bearer token, if the server sent a non-empty one.
    pub fn token(&self) -> Option<&str> {
        self.jwt.as_deref().filter(|t| !t.is_empty())
    }
}

/// Client for the authentication endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client talking to `base_url` (e.g. `http://localhost:8080/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(AuthError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a token.
    ///
    /// Transport failures and non-2xx statuses are returned as errors. A 2xx
    /// body of `null` is treated as a response without a token.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthenticationResponse, AuthError> {
        let url = format!("{}/login", self.base_url);
        debug!(url = %url, user = %request.name, "Sending login request");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Login request rejected");
            return Err(AuthError::from_status(status, &body));
        }

        Self::parse_body(&body)
    }

    fn parse_body(body: &str) -> Result<AuthenticationResponse, AuthError> {
        let parsed: Option<AuthenticationResponse> = serde_json::from_str(body)
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;
        Ok(parsed.unwrap_or_default())
    }
}
