use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::RowbaseUrl;

/// A signed-in user's tokens plus the identity the backend reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at < Utc::now())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// What a sign-up produced: either a live session, or a pending state while
/// the confirmation email is out.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationSent,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Rate limited")]
    RateLimited,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("Password too weak")]
    WeakPassword,
    #[error("Email not confirmed")]
    EmailNotConfirmed,
    #[error("TransportError: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AuthError ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("ParsingError: {0}")]
    Parsing(String),
}

/// Classify a backend auth failure from its message text. The backend only
/// distinguishes these cases in prose, so the match is substring-based.
fn classify(status: u16, message: &str) -> AuthError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if lower.contains("rate limit") || status == 429 {
        AuthError::RateLimited
    } else if lower.contains("already registered") || lower.contains("already exists") {
        AuthError::AlreadyRegistered
    } else if lower.contains("password") && (lower.contains("weak") || lower.contains("at least")) {
        AuthError::WeakPassword
    } else if lower.contains("not confirmed") {
        AuthError::EmailNotConfirmed
    } else {
        AuthError::Backend {
            status,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct IdTokenGrant<'a> {
    provider: &'a str,
    id_token: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    token_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            user: token.user,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    url: RowbaseUrl,
    api_key: String,
}

impl AuthClient {
    pub fn new(url: RowbaseUrl, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            api_key: api_key.into(),
        }
    }

    async fn post_auth(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, AuthError> {
        let url = self.url.append_path(path);
        let response = self
            .http
            .post(url.as_ref())
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(classify(status.as_u16(), &message));
        }
        Ok(response)
    }

    async fn token_grant(&self, path: &str, body: &impl Serialize) -> Result<Session, AuthError> {
        let response = self.post_auth(path, body).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Parsing(format!("Failed to parse token response: {}", e)))?;
        Ok(token.into())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "/auth/v1/token?grant_type=password",
            &PasswordGrant { email, password },
        )
        .await
    }

    pub async fn sign_in_with_apple(&self, id_token: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "/auth/v1/token?grant_type=id_token",
            &IdTokenGrant {
                provider: "apple",
                id_token,
            },
        )
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "/auth/v1/token?grant_type=refresh_token",
            &RefreshGrant { refresh_token },
        )
        .await
    }

    /// Sign-up returns a session when the project auto-confirms, otherwise
    /// only a user stub while the confirmation email is pending.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .post_auth("/auth/v1/signup", &PasswordGrant { email, password })
            .await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Parsing(format!("Failed to parse signup response: {}", e)))?;
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| AuthError::Parsing(format!("Failed to parse signup session: {}", e)))?;
            Ok(SignUpOutcome::SignedIn(token.into()))
        } else {
            Ok(SignUpOutcome::ConfirmationSent)
        }
    }

    /// Complete a deep-linked email confirmation.
    pub async fn confirm_email(&self, token_hash: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "/auth/v1/verify",
            &VerifyRequest {
                kind: "signup",
                token_hash,
            },
        )
        .await
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.url.append_path("/auth/v1/logout");
        let response = self
            .http
            .post(url.as_ref())
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        // An already-dead token signs out just fine.
        if !status.is_success() && status != 401 {
            let message = error_message(response).await;
            return Err(classify(status.as_u16(), &message));
        }
        Ok(())
    }

    pub async fn current_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let url = self.url.append_path("/auth/v1/user");
        let response = self
            .http
            .get(url.as_ref())
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(classify(status.as_u16(), &message));
        }
        response
            .json()
            .await
            .map_err(|e| AuthError::Parsing(format!("Failed to parse user response: {}", e)))
    }
}

/// The auth endpoints report failures as `{"msg": …}` or
/// `{"error_description": …}` depending on the path.
async fn error_message(response: reqwest::Response) -> String {
    let raw = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<serde_json::Value>(&raw) {
        for key in ["msg", "message", "error_description"] {
            if let Some(message) = body.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_are_classified() {
        assert!(matches!(
            classify(400, "Invalid login credentials"),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn rate_limit_matches_message_or_status() {
        assert!(matches!(
            classify(400, "email rate limit exceeded"),
            AuthError::RateLimited
        ));
        assert!(matches!(classify(429, "slow down"), AuthError::RateLimited));
    }

    #[test]
    fn duplicate_registration_is_classified() {
        assert!(matches!(
            classify(422, "User already registered"),
            AuthError::AlreadyRegistered
        ));
    }

    #[test]
    fn weak_password_is_classified() {
        assert!(matches!(
            classify(422, "Password should be at least 8 characters"),
            AuthError::WeakPassword
        ));
    }

    #[test]
    fn unconfirmed_email_is_classified() {
        assert!(matches!(
            classify(400, "Email not confirmed"),
            AuthError::EmailNotConfirmed
        ));
    }

    #[test]
    fn unknown_messages_fall_through_with_status() {
        match classify(500, "database exploded") {
            AuthError::Backend { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "database exploded");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }
}
