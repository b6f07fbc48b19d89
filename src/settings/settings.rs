use anyhow::{Result, anyhow};
use config::{Config, Environment, File, FileFormat, Source};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub session: Session,
    #[serde(default)]
    pub cookie: Cookie,
    pub store: Store,
    pub auth: Auth,
    pub mysql: Option<MySql>,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Deserialize)]
pub struct Session {
    pub signing_key: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

// settings are logged at startup
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("signing_key", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Cookie {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    pub domain: Option<String>,
}

impl Default for Cookie {
    fn default() -> Self {
        Cookie {
            name: default_cookie_name(),
            domain: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    pub redis_dsn: Option<String>,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub backend: String, // "memory" or "mysql"
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// Development account for the in-memory credential backend. The password
/// is hashed at startup.
#[derive(Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub password: String,
    #[serde(default = "default_authorities")]
    pub authorities: Vec<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("id", &self.id)
            .field("authorities", &self.authorities)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
pub struct MySql {
    pub dsn: String,
}

impl fmt::Debug for MySql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySql").finish_non_exhaustive()
    }
}

fn default_cookie_name() -> String {
    crate::api::v1::cookie::REFRESH_COOKIE_NAME.to_string()
}

fn default_op_timeout_ms() -> u64 {
    500
}

fn default_authorities() -> Vec<String> {
    vec!["ROLE_USER".to_string()]
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "VOYAGE";

/// Reads the TOML file at `path` (or the build's default), then lets
/// `VOYAGE__SECTION__KEY` environment variables override it.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    build(File::with_name(path))
}

pub fn parse_settings_str(toml: &str) -> Result<Settings> {
    build(File::from_str(toml, FileFormat::Toml))
}

fn build(source: impl Source + Send + Sync + 'static) -> Result<Settings> {
    let settings: Settings = Config::builder()
        .add_source(source)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_settings_parse() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.auth.backend, "memory");
        assert!(!settings.auth.users.is_empty());
        assert_eq!(settings.session.access_ttl_secs, 15 * 60);
        assert_eq!(settings.session.refresh_ttl_secs, 14 * 24 * 60 * 60);
    }

    #[test]
    fn release_settings_parse() {
        let settings = parse_settings(Some("settings/release.toml")).unwrap();
        assert_eq!(settings.store.backend, "redis");
        assert_eq!(settings.auth.backend, "mysql");
        assert!(settings.mysql.is_some());
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let settings = parse_settings_str(
            r#"
[http]
cert_path = "c.pem"
key_path = "k.pem"
address = "127.0.0.1:0"

[log]
filter = "debug"

[session]
signing_key = "0123456789abcdef0123456789abcdef"
access_ttl_secs = 60
refresh_ttl_secs = 120

[store]
backend = "memory"

[auth]
backend = "memory"

[[auth.users]]
id = "u1"
password = "pw"
"#,
        )
        .unwrap();

        assert!(!settings.log.json);
        assert_eq!(settings.cookie.name, "refresh_token");
        assert_eq!(settings.cookie.domain, None);
        assert_eq!(settings.store.op_timeout_ms, 500);
        assert_eq!(settings.auth.users[0].authorities, vec!["ROLE_USER"]);
        assert!(settings.mysql.is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let session = Session {
            signing_key: "super-secret".into(),
            access_ttl_secs: 1,
            refresh_ttl_secs: 2,
        };
        let user = SeedUser {
            id: "u1".into(),
            password: "hunter2".into(),
            authorities: vec![],
        };
        assert!(!format!("{:?}", session).contains("super-secret"));
        assert!(!format!("{:?}", user).contains("hunter2"));
    }
}
