//! Canonical user profile from the attribute maps of OAuth2 providers.
//!
//! Each provider nests its user-info fields differently; a small table of
//! extractors, keyed by provider name, flattens them into [`OAuth2Profile`].
//!
//! No route calls into this module. A host that has finished the provider's
//! authorization-code exchange passes the user-info JSON to
//! [`profile_from_attributes`] and hands [`OAuth2Profile::principal`] to
//! `SessionService::issue`.

use crate::domain_model::{Principal, SubjectId};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_OAUTH2_AUTHORITY: &str = "ROLE_USER";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuth2ProfileError {
    #[error("unsupported OAuth2 provider: {0}")]
    UnsupportedProvider(String),
    #[error("{provider} profile is missing `{attribute}`")]
    MissingAttribute {
        provider: &'static str,
        attribute: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuth2Profile {
    pub provider: &'static str,
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image_url: Option<String>,
}

impl OAuth2Profile {
    /// Provider-qualified id, e.g. `google_1234`.
    pub fn subject_id(&self) -> SubjectId {
        SubjectId(format!("{}_{}", self.provider, self.id))
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.subject_id(), [DEFAULT_OAUTH2_AUTHORITY])
    }
}

struct ProviderFields {
    name: &'static str,
    id: &'static [&'static str],
    display_name: &'static [&'static str],
    email: &'static [&'static str],
    image_url: &'static [&'static str],
}

const PROVIDERS: &[ProviderFields] = &[
    ProviderFields {
        name: "google",
        id: &["sub"],
        display_name: &["name"],
        email: &["email"],
        image_url: &["picture"],
    },
    ProviderFields {
        name: "naver",
        id: &["response", "id"],
        display_name: &["response", "name"],
        email: &["response", "email"],
        image_url: &["response", "profile_image"],
    },
    ProviderFields {
        name: "kakao",
        id: &["id"],
        display_name: &["kakao_account", "profile", "nickname"],
        email: &["kakao_account", "email"],
        image_url: &["kakao_account", "profile", "profile_image_url"],
    },
];

/// String at `path`; numeric ids are rendered as their decimal text.
fn lookup(attributes: &Value, path: &[&str]) -> Option<String> {
    let value = path.iter().try_fold(attributes, |v, key| v.get(*key))?;
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build the canonical profile for `provider` (matched case-insensitively).
/// The id and email are required.
pub fn profile_from_attributes(
    provider: &str,
    attributes: &Value,
) -> Result<OAuth2Profile, OAuth2ProfileError> {
    let fields = PROVIDERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(provider))
        .ok_or_else(|| OAuth2ProfileError::UnsupportedProvider(provider.to_string()))?;

    let id = lookup(attributes, fields.id).ok_or(OAuth2ProfileError::MissingAttribute {
        provider: fields.name,
        attribute: "id",
    })?;
    let email = lookup(attributes, fields.email).ok_or(OAuth2ProfileError::MissingAttribute {
        provider: fields.name,
        attribute: "email",
    })?;

    Ok(OAuth2Profile {
        provider: fields.name,
        id,
        name: lookup(attributes, fields.display_name),
        email,
        image_url: lookup(attributes, fields.image_url),
    })
}
