use crate::domain_model::Principal;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token malformed")]
    Malformed,
    #[error("token signature invalid")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("refresh token absent")]
    RefreshAbsent,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("refresh token reuse detected")]
    ReuseDetected,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("login id already taken")]
    LoginIdTaken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for SessionError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(e) => SessionError::StoreUnavailable(e),
            StoreError::Duplicate(_) => SessionError::LoginIdTaken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    Set(RefreshToken),
    Clear,
}

/// Changes a session operation wants merged into the outgoing response:
/// a new bearer header and/or a refresh cookie to set or clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub access_token: Option<AccessToken>,
    pub refresh_cookie: Option<CookieDirective>,
}

impl SessionPatch {
    pub fn issued(access_token: AccessToken, refresh_token: RefreshToken) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_cookie: Some(CookieDirective::Set(refresh_token)),
        }
    }

    pub fn cleared() -> Self {
        Self {
            access_token: None,
            refresh_cookie: Some(CookieDirective::Clear),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_cookie.is_none()
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        match &self.refresh_cookie {
            Some(CookieDirective::Set(token)) => Some(token),
            _ => None,
        }
    }
}

pub trait TokenCodec: Send + Sync {
    /// Sign a token for `principal` that expires `ttl` from now.
    fn issue(
        &self,
        principal: &Principal,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), SessionError>;

    fn parse_and_verify(&self, token: &str) -> Result<Principal, TokenError>;

    /// Signature is still checked, expiry is not.
    fn parse_ignoring_expiry(&self, token: &str) -> Result<Principal, TokenError>;
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Login: start a new session, replacing any previous one of the subject.
    async fn issue(&self, principal: &Principal) -> Result<SessionPatch, SessionError>;

    /// Exchange the presented refresh token for a fresh pair.
    async fn rotate(&self, presented: Option<&RefreshToken>)
    -> Result<SessionPatch, SessionError>;

    /// Never fails; the returned patch always clears the refresh cookie.
    async fn logout(&self, presented: Option<&RefreshToken>) -> SessionPatch;
}
