use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use shopfront_mfa::domain::repository::{ChallengeRepository, CodeMailer, ResendGate};
use shopfront_mfa::domain::types::{MAX_VERIFY_ATTEMPTS, VerificationChallenge};
use shopfront_mfa::error::MfaServiceError;

// ── MockChallengeRepo ────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockChallengeRepo {
    pub rows: Arc<Mutex<Vec<VerificationChallenge>>>,
    pub fail_writes: bool,
    /// Yield to the scheduler after every read, like a real round trip would.
    pub yield_after_read: bool,
}

impl MockChallengeRepo {
    pub fn new(rows: Vec<VerificationChallenge>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            fail_writes: false,
            yield_after_read: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::empty()
        }
    }

    pub fn yielding(rows: Vec<VerificationChallenge>) -> Self {
        Self {
            yield_after_read: true,
            ..Self::new(rows)
        }
    }

    /// Shared handle to the stored rows for post-execution inspection.
    pub fn rows_handle(&self) -> Arc<Mutex<Vec<VerificationChallenge>>> {
        Arc::clone(&self.rows)
    }
}

impl ChallengeRepository for MockChallengeRepo {
    async fn supersede_and_create(
        &self,
        challenge: &VerificationChallenge,
    ) -> Result<(), MfaServiceError> {
        if self.fail_writes {
            return Err(anyhow::anyhow!("connection refused").into());
        }
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|c| c.email != challenge.email || c.consumed_at.is_some());
        rows.push(challenge.clone());
        Ok(())
    }

    async fn find_latest_unconsumed(
        &self,
        email: &str,
    ) -> Result<Option<VerificationChallenge>, MfaServiceError> {
        let found = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email == email && c.consumed_at.is_none())
            .max_by_key(|c| c.created_at)
            .cloned();
        if self.yield_after_read {
            tokio::task::yield_now().await;
        }
        Ok(found)
    }

    async fn reserve_attempt(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, MfaServiceError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| {
            c.id == id
                && c.consumed_at.is_none()
                && c.expires_at > now
                && c.attempts < MAX_VERIFY_ATTEMPTS
        }) {
            Some(c) => {
                c.attempts += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, MfaServiceError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| {
            c.id == id
                && c.consumed_at.is_none()
                && c.expires_at > at
                && c.attempts <= MAX_VERIFY_ATTEMPTS
        }) {
            Some(c) => {
                c.consumed_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, MfaServiceError> {
        let mut rows = self.rows.lock().unwrap();
        let len = rows.len();
        rows.retain(|c| c.expires_at >= before);
        Ok((len - rows.len()) as u64)
    }
}

// ── MockMailer ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_handle(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.sent)
    }
}

impl CodeMailer for MockMailer {
    async fn send_code(
        &self,
        email: &str,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), MfaServiceError> {
        if self.fail {
            return Err(MfaServiceError::DeliveryError(anyhow::anyhow!(
                "email API returned 401"
            )));
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_owned(), code.to_owned()));
        Ok(())
    }
}

// ── MockResendGate ───────────────────────────────────────────────────────────

/// In-memory cooldown. `open()` never locks, `locking()` behaves like Redis NX.
#[derive(Clone, Default)]
pub struct MockResendGate {
    pub held: Arc<Mutex<HashMap<String, u64>>>,
    pub enforce: bool,
}

impl MockResendGate {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn locking() -> Self {
        Self {
            enforce: true,
            ..Self::default()
        }
    }

    pub fn held_handle(&self) -> Arc<Mutex<HashMap<String, u64>>> {
        Arc::clone(&self.held)
    }
}

impl ResendGate for MockResendGate {
    async fn try_acquire(
        &self,
        email: &str,
        ttl_secs: u64,
    ) -> Result<Option<u64>, MfaServiceError> {
        if !self.enforce {
            return Ok(None);
        }
        let mut held = self.held.lock().unwrap();
        if let Some(remaining) = held.get(email) {
            return Ok(Some(*remaining));
        }
        held.insert(email.to_owned(), ttl_secs);
        Ok(None)
    }

    async fn release(&self, email: &str) -> Result<(), MfaServiceError> {
        self.held.lock().unwrap().remove(email);
        Ok(())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const TEST_EMAIL: &str = "a@b.com";

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-unit-tests-only";

/// Challenge for `TEST_EMAIL` created `age_secs` ago.
pub fn test_challenge(code: &str, age_secs: i64) -> VerificationChallenge {
    VerificationChallenge::new(
        TEST_EMAIL.to_owned(),
        code.to_owned(),
        Utc::now() - Duration::seconds(age_secs),
    )
}
