use super::StoreError;

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub login_id: String,
    pub password_hash: String,
    pub authorities: Vec<String>,
    pub is_active: bool,
}

#[async_trait::async_trait]
pub trait CredentialRepo: Send + Sync {
    /// Fetch credentials by login id (for login).
    async fn get_by_login_id(&self, login_id: &str)
    -> Result<Option<CredentialRecord>, StoreError>;

    /// Insert a new account. An existing `login_id` yields `StoreError::Duplicate`.
    async fn create(&self, record: &CredentialRecord) -> Result<(), StoreError>;
}
