use crate::application_port::*;
use crate::domain_model::Principal;
use crate::domain_port::RevocationStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Refresh Token Rotation over a single-session-per-subject store.
///
/// Each successful rotation replaces the stored refresh token; presenting
/// anything other than the stored token revokes the whole session.
pub struct RotatingSessionService {
    token_codec: Arc<dyn TokenCodec>,
    revocation_store: Arc<dyn RevocationStore>,
    cfg: SessionConfig,
}

impl RotatingSessionService {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        revocation_store: Arc<dyn RevocationStore>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            token_codec,
            revocation_store,
            cfg,
        }
    }

    fn refresh_ttl_secs(&self) -> u64 {
        self.cfg.refresh_ttl.as_secs().max(1)
    }

    /// Mint both tokens from the same principal and make the refresh token
    /// the subject's only live one.
    async fn start_session(&self, principal: &Principal) -> Result<SessionPatch, SessionError> {
        let (access_token, _) = self.token_codec.issue(principal, self.cfg.access_ttl)?;
        let (refresh_token, _) = self.token_codec.issue(principal, self.cfg.refresh_ttl)?;
        let access_token = AccessToken(access_token);
        let refresh_token = RefreshToken(refresh_token);

        self.revocation_store
            .put(&principal.subject_id, &refresh_token, self.refresh_ttl_secs())
            .await?;

        Ok(SessionPatch::issued(access_token, refresh_token))
    }
}

#[async_trait::async_trait]
impl SessionService for RotatingSessionService {
    async fn issue(&self, principal: &Principal) -> Result<SessionPatch, SessionError> {
        let patch = self.start_session(principal).await?;
        info!(subject = %principal.subject_id, "session issued");
        Ok(patch)
    }

    async fn rotate(
        &self,
        presented: Option<&RefreshToken>,
    ) -> Result<SessionPatch, SessionError> {
        let presented = presented.ok_or(SessionError::RefreshAbsent)?;

        let principal = self
            .token_codec
            .parse_and_verify(&presented.0)
            .inspect_err(|e| debug!(error = %e, "refresh token rejected"))?;
        let subject = &principal.subject_id;

        match self.revocation_store.get(subject).await? {
            Some(current) if current == *presented => {}
            _ => {
                warn!(subject = %subject, "refresh token reuse detected, revoking session");
                self.revocation_store.delete_all_for_user(subject).await?;
                return Err(SessionError::ReuseDetected);
            }
        }

        let patch = self.start_session(&principal).await?;
        info!(subject = %subject, "session rotated");
        Ok(patch)
    }

    async fn logout(&self, presented: Option<&RefreshToken>) -> SessionPatch {
        if let Some(token) = presented {
            match self.token_codec.parse_ignoring_expiry(&token.0) {
                Ok(principal) => {
                    match self.revocation_store.delete(&principal.subject_id).await {
                        Ok(()) => info!(subject = %principal.subject_id, "session revoked"),
                        Err(e) => warn!(
                            subject = %principal.subject_id,
                            error = %e,
                            "failed to revoke session on logout"
                        ),
                    }
                }
                Err(e) => debug!(error = %e, "logout with unreadable refresh token"),
            }
        }
        SessionPatch::cleared()
    }
}
