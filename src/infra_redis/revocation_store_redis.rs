use crate::application_port::RefreshToken;
use crate::domain_model::SubjectId;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, FromRedisValue, RedisResult, RedisWrite, ToRedisArgs, Value};
use std::future::Future;
use std::time::Duration;

pub const REFRESH_KEY_PREFIX: &str = "refresh_token";

/// Keys are `refresh_token:<subject>`, values the raw refresh token, with a
/// Redis TTL equal to the refresh lifetime.
pub struct RedisRevocationStore {
    conn: ConnectionManager,
    prefix: String,
    op_timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, op_timeout: Duration) -> Self {
        RedisRevocationStore {
            conn,
            prefix: REFRESH_KEY_PREFIX.to_string(),
            op_timeout,
        }
    }

    fn key(&self, subject: &SubjectId) -> String {
        key_for(&self.prefix, subject)
    }

    /// A slow store is treated like a down one.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(StoreError::Unavailable(format!("{}: {}", op, e))),
            Err(_) => Err(StoreError::Unavailable(format!(
                "{} timed out after {:?}",
                op, self.op_timeout
            ))),
        }
    }
}

fn key_for(prefix: &str, subject: &SubjectId) -> String {
    format!("{}:{}", prefix, subject)
}

impl ToRedisArgs for RefreshToken {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.0.as_bytes())
    }
}

impl FromRedisValue for RefreshToken {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        Ok(RefreshToken(s))
    }
}

#[async_trait::async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(
        &self,
        subject: &SubjectId,
        token: &RefreshToken,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded("SET", conn.set_ex(&key, token, ttl_secs))
            .await?;
        Ok(())
    }

    async fn get(&self, subject: &SubjectId) -> Result<Option<RefreshToken>, StoreError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        let val: Option<RefreshToken> = self.bounded("GET", conn.get(&key)).await?;
        Ok(val)
    }

    async fn delete(&self, subject: &SubjectId) -> Result<(), StoreError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        let _: () = self.bounded("DEL", conn.del(&key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_by_subject() {
        assert_eq!(
            key_for(REFRESH_KEY_PREFIX, &SubjectId::from("u1")),
            "refresh_token:u1"
        );
        assert_eq!(
            key_for(REFRESH_KEY_PREFIX, &SubjectId::from("google_10857")),
            "refresh_token:google_10857"
        );
    }

    #[test]
    fn refresh_token_converts_from_redis_string() {
        let v = Value::BulkString(b"abc.def.ghi".to_vec());
        let token = RefreshToken::from_redis_value(&v).unwrap();
        assert_eq!(token, RefreshToken("abc.def.ghi".to_string()));

        let missing: Option<RefreshToken> = redis::from_redis_value(&Value::Nil).unwrap();
        assert_eq!(missing, None);
    }
}
