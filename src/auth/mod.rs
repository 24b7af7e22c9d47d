// Token manager: client-credentials exchange and expiry tracking
//
// Refresh is pull-based. There is no background timer; the coordinator
// asks `is_valid` immediately before each send and triggers a synchronous
// refresh when the answer is no.

use serde::Deserialize;
use tracing::info;

use crate::error::AuthError;

/// Access credential returned by the token endpoint
///
/// Replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Absolute expiry instant, epoch seconds
    pub expire_at: i64,
}

impl Token {
    /// True iff the token is still usable at `now` (epoch seconds).
    /// `now >= expire_at` is invalid; the boundary falls on the fatal side.
    pub fn is_valid(&self, now: i64) -> bool {
        now < self.expire_at
    }
}

/// Owns the credential exchange against the HTTP token endpoint
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Option<Token>,
}

impl TokenManager {
    pub fn new(token_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url,
            client_id,
            client_secret,
            token: None,
        }
    }

    /// Perform the client-credentials exchange and store the new token
    ///
    /// Form-encoded POST; any non-2xx status is an `AuthError`, as is a
    /// response body that does not parse as `{access_token, expire_at}`.
    pub async fn fetch(&mut self) -> Result<&Token, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let token: Token = serde_json::from_str(&body)?;

        info!("Fetched access token (expires at epoch {})", token.expire_at);

        self.token = Some(token);
        Ok(self.token.as_ref().unwrap())
    }

    /// Last fetched token, if any
    pub fn current(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Last fetched token, or `AuthError::NoToken` if never fetched
    pub fn require_current(&self) -> Result<&Token, AuthError> {
        self.token.as_ref().ok_or(AuthError::NoToken)
    }
}

/// Current time as epoch seconds
pub fn epoch_now() -> i64 {
    chrono::Utc::now().timestamp()
}
