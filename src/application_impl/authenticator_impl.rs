use crate::application_port::{
    Authenticator, CredentialHasher, LoginInput, SessionError, SignupInput,
};
use crate::domain_model::Principal;
use crate::domain_port::{CredentialRecord, CredentialRepo};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_LOGIN_ID_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;
const SIGNUP_AUTHORITY: &str = "ROLE_USER";

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SessionError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, SessionError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| SessionError::InternalError(format!("invalid PHC hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(SessionError::InternalError(format!("verify error: {}", e))),
        }
    }
}

/// Login by id and password against the credential store.
pub struct PasswordAuthenticator {
    credential_repo: Arc<dyn CredentialRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl PasswordAuthenticator {
    pub fn new(
        credential_repo: Arc<dyn CredentialRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            credential_repo,
            credential_hasher,
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, input: LoginInput) -> Result<Principal, SessionError> {
        let LoginInput { login_id, password } = input;

        let rec = self
            .credential_repo
            .get_by_login_id(&login_id)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if !rec.is_active {
            debug!(login_id = %login_id, "login attempt on inactive account");
            return Err(SessionError::InvalidCredentials);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(SessionError::InvalidCredentials);
        }

        Ok(Principal::new(rec.login_id, rec.authorities))
    }

    async fn signup(&self, input: SignupInput) -> Result<Principal, SessionError> {
        let SignupInput { login_id, password } = input;
        validate_signup(&login_id, &password)?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let record = CredentialRecord {
            login_id,
            password_hash,
            authorities: vec![SIGNUP_AUTHORITY.to_string()],
            is_active: true,
        };
        self.credential_repo.create(&record).await?;

        info!(login_id = %record.login_id, "account created");
        Ok(Principal::new(record.login_id, record.authorities))
    }
}

// login ids become token subjects and redis key suffixes
fn validate_signup(login_id: &str, password: &str) -> Result<(), SessionError> {
    if login_id.is_empty() || login_id.len() > MAX_LOGIN_ID_LEN {
        return Err(SessionError::InvalidInput(format!(
            "id must be 1 to {} bytes",
            MAX_LOGIN_ID_LEN
        )));
    }
    if login_id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(SessionError::InvalidInput(
            "id must not contain whitespace".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SessionError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
