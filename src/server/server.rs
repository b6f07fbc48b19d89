use crate::api::v1::{AuthBoundary, CookieTransport};
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

const MIN_SIGNING_KEY_BYTES: usize = 32;

pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pub authenticator: Arc<dyn Authenticator>,
    pub cookies: Arc<CookieTransport>,
    pub boundary: Arc<AuthBoundary>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        Self::try_new_with_clock(settings, Arc::new(SystemClock)).await
    }

    /// Wires every service from settings. The clock drives token expiry and
    /// the in-memory store, so tests can move time by hand.
    pub async fn try_new_with_clock(
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let signing_key = settings.session.signing_key.as_bytes();
        if signing_key.len() < MIN_SIGNING_KEY_BYTES {
            return Err(anyhow::anyhow!(
                "session.signing_key must be at least {} bytes",
                MIN_SIGNING_KEY_BYTES
            ));
        }

        let session_cfg = SessionConfig {
            access_ttl: Duration::from_secs(settings.session.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.session.refresh_ttl_secs),
        };
        if session_cfg.access_ttl.is_zero() || session_cfg.refresh_ttl.is_zero() {
            return Err(anyhow::anyhow!("session ttls must be positive"));
        }

        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHs512Codec::new(signing_key, clock.clone()));

        let revocation_store: Arc<dyn RevocationStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryRevocationStore::new(clock.clone())),
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.redis_dsn is required for redis"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRevocationStore::new(
                    redis_manager,
                    Duration::from_millis(settings.store.op_timeout_ms),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let mut pool = None;
        let credential_repo: Arc<dyn CredentialRepo> = match settings.auth.backend.as_str() {
            "memory" => {
                let mut records = Vec::with_capacity(settings.auth.users.len());
                for user in &settings.auth.users {
                    records.push(CredentialRecord {
                        login_id: user.id.clone(),
                        password_hash: credential_hasher.hash_password(&user.password).await?,
                        authorities: user.authorities.clone(),
                        is_active: true,
                    });
                }
                info!(users = records.len(), "seeded in-memory credentials");
                Arc::new(MemoryCredentialRepo::new(records))
            }
            "mysql" => {
                let mysql = settings
                    .mysql
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("[mysql] section is required for mysql"))?;
                let p = Pool::<MySql>::connect(&mysql.dsn).await?;
                pool = Some(p.clone());
                Arc::new(MySqlCredentialRepo::new(p))
            }
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        let authenticator: Arc<dyn Authenticator> = Arc::new(PasswordAuthenticator::new(
            credential_repo,
            credential_hasher,
        ));

        let session_service: Arc<dyn SessionService> = Arc::new(RotatingSessionService::new(
            token_codec.clone(),
            revocation_store,
            session_cfg.clone(),
        ));

        let cookies = Arc::new(CookieTransport::new(
            settings.cookie.name.clone(),
            session_cfg.refresh_ttl,
            settings.cookie.domain.clone(),
        ));

        let boundary = Arc::new(AuthBoundary::new(
            token_codec,
            session_service.clone(),
            cookies.clone(),
        ));

        info!(
            store = %settings.store.backend,
            auth = %settings.auth.backend,
            "server started"
        );

        Ok(Self {
            session_service,
            authenticator,
            cookies,
            boundary,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
