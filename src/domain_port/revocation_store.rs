use crate::application_port::RefreshToken;
use crate::domain_model::SubjectId;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Holds the single live refresh token of each subject.
///
/// Every operation is atomic on its own. There is no compare-and-swap:
/// `put` always overwrites, last writer wins.
#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    async fn put(
        &self,
        subject: &SubjectId,
        token: &RefreshToken,
        ttl_secs: u64,
    ) -> Result<(), StoreError>;

    async fn get(&self, subject: &SubjectId) -> Result<Option<RefreshToken>, StoreError>;

    async fn delete(&self, subject: &SubjectId) -> Result<(), StoreError>;

    /// Ends every session of the subject, e.g. after a password change.
    /// With one live session per subject this is the same key as `delete`.
    async fn delete_all_for_user(&self, subject: &SubjectId) -> Result<(), StoreError> {
        self.delete(subject).await
    }
}
