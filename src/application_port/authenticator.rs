use super::SessionError;
use crate::domain_model::Principal;

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub login_id: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub login_id: String,
    pub password: String,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, SessionError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, SessionError>;
}

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, input: LoginInput) -> Result<Principal, SessionError>;

    /// Register a new account with the default authority. Does not log in.
    async fn signup(&self, input: SignupInput) -> Result<Principal, SessionError>;
}
