#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::VerificationChallenge;
use crate::error::MfaServiceError;

/// Repository for verification challenges.
pub trait ChallengeRepository: Send + Sync {
    /// Delete every unconsumed challenge for `challenge.email` and insert
    /// `challenge`, atomically.
    async fn supersede_and_create(
        &self,
        challenge: &VerificationChallenge,
    ) -> Result<(), MfaServiceError>;

    /// Most recent unconsumed challenge for an email, expired or not.
    async fn find_latest_unconsumed(
        &self,
        email: &str,
    ) -> Result<Option<VerificationChallenge>, MfaServiceError>;

    /// Count one guess against the challenge, atomically, only while it is
    /// unconsumed, unexpired and below `MAX_VERIFY_ATTEMPTS`. Returns `false`
    /// when no guess is left.
    async fn reserve_attempt(&self, id: Uuid, now: DateTime<Utc>)
    -> Result<bool, MfaServiceError>;

    /// Set `consumed_at` if still unset and unexpired at `at`. Returns `false`
    /// if another request won.
    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, MfaServiceError>;

    /// Delete challenges that expired before `before`. Returns rows removed.
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, MfaServiceError>;
}

/// Per-email cooldown between challenges (Redis, short TTL).
pub trait ResendGate: Send + Sync {
    /// Take the cooldown. `Ok(None)` when acquired, `Ok(Some(secs))` with the
    /// remaining wait when someone already holds it.
    async fn try_acquire(&self, email: &str, ttl_secs: u64)
    -> Result<Option<u64>, MfaServiceError>;

    async fn release(&self, email: &str) -> Result<(), MfaServiceError>;
}

/// Outbound delivery of the plaintext code.
pub trait CodeMailer: Send + Sync {
    async fn send_code(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MfaServiceError>;
}
