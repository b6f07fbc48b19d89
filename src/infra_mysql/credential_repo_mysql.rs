use crate::domain_port::*;
use sqlx::mysql::{MySqlDatabaseError, MySqlRow};
use sqlx::{MySqlPool, Row};

/// Reads login credentials from the `user_credential` table:
///
/// ```sql
/// CREATE TABLE user_credential (
///     login_id      VARCHAR(128) PRIMARY KEY,
///     password_hash VARCHAR(255) NOT NULL,
///     authorities   VARCHAR(255) NOT NULL DEFAULT 'ROLE_USER',
///     is_active     BOOLEAN      NOT NULL DEFAULT TRUE
/// );
/// ```
///
/// `authorities` is a comma-separated list of role names.
pub struct MySqlCredentialRepo {
    pool: MySqlPool,
}

impl MySqlCredentialRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCredentialRepo { pool }
    }

    fn split_authorities(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn row_to_record(row: MySqlRow) -> Result<CredentialRecord, StoreError> {
        let login_id: String = row
            .try_get("login_id")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let authorities: String = row
            .try_get("authorities")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let is_active: bool = row
            .try_get("is_active")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(CredentialRecord {
            login_id,
            password_hash,
            authorities: Self::split_authorities(&authorities),
            is_active,
        })
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MySqlCredentialRepo {
    async fn get_by_login_id(
        &self,
        login_id: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT login_id, password_hash, authorities, is_active
FROM user_credential
WHERE login_id = ?
"#,
        )
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn create(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
INSERT INTO user_credential (login_id, password_hash, authorities, is_active)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(&record.login_id)
        .bind(&record.password_hash)
        .bind(record.authorities.join(","))
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                StoreError::Duplicate(record.login_id.clone())
            } else {
                StoreError::Unavailable(e.to_string())
            }
        })?;

        Ok(())
    }
}

fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}
