use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands, RedisError};

use crate::domain::repository::ResendGate;
use crate::error::MfaServiceError;

#[derive(Clone)]
pub struct RedisResendGate {
    pub pool: Pool,
}

fn cooldown_key(email: &str) -> String {
    format!("mfa_resend:{}", email)
}

impl ResendGate for RedisResendGate {
    async fn try_acquire(
        &self,
        email: &str,
        ttl_secs: u64,
    ) -> Result<Option<u64>, MfaServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| MfaServiceError::Internal(e.into()))?;
        let key = cooldown_key(email);
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e: RedisError| MfaServiceError::Internal(e.into()))?;
        if acquired.is_some() {
            return Ok(None);
        }
        let ttl: i64 = conn
            .ttl(&key)
            .await
            .map_err(|e: RedisError| MfaServiceError::Internal(e.into()))?;
        // -1/-2 mean the key lost its TTL or vanished between the two calls.
        Ok(Some(u64::try_from(ttl).unwrap_or(1).max(1)))
    }

    async fn release(&self, email: &str) -> Result<(), MfaServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| MfaServiceError::Internal(e.into()))?;
        let (): () = conn
            .del(cooldown_key(email))
            .await
            .map_err(|e: RedisError| MfaServiceError::Internal(e.into()))?;
        Ok(())
    }
}
