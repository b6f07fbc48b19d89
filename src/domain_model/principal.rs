use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        SubjectId(value.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        SubjectId(value)
    }
}

/// The authenticated identity of a single request.
///
/// Always derived from a verified token and handed down the request chain
/// explicitly. It is never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: SubjectId,
    pub authorities: BTreeSet<String>,
}

impl Principal {
    /// Blank authority names are dropped, duplicates collapse.
    pub fn new<I, S>(subject_id: impl Into<SubjectId>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authorities = authorities
            .into_iter()
            .map(Into::into)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Self {
            subject_id: subject_id.into(),
            authorities,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}
