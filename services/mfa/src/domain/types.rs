use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Verification code length in digits.
pub const CODE_LEN: usize = 6;

/// Verification challenge time-to-live in seconds.
pub const CHALLENGE_TTL_SECS: i64 = 300;

/// Minimum wait between two challenges for the same email.
pub const RESEND_COOLDOWN_SECS: u64 = 60;

/// Wrong submissions allowed before a challenge stops validating.
pub const MAX_VERIFY_ATTEMPTS: i32 = 5;

/// One-time emailed code gating sign-in.
#[derive(Debug, Clone)]
pub struct VerificationChallenge {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Why a submitted code was refused. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoChallenge,
    Expired,
    AttemptsExhausted,
    NoMatch,
    AlreadyConsumed,
}

impl VerificationChallenge {
    pub fn new(email: String, code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            code,
            attempts: 0,
            expires_at: now + chrono::Duration::seconds(CHALLENGE_TTL_SECS),
            consumed_at: None,
            created_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether this challenge may still take a guess at `now`.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), Rejection> {
        if self.consumed_at.is_some() {
            return Err(Rejection::AlreadyConsumed);
        }
        if self.attempts >= MAX_VERIFY_ATTEMPTS {
            return Err(Rejection::AttemptsExhausted);
        }
        if self.is_expired_at(now) {
            return Err(Rejection::Expired);
        }
        Ok(())
    }

    pub fn matches(&self, code: &str) -> bool {
        constant_time_eq(self.code.as_bytes(), code.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `true` if `code` is exactly six ASCII digits.
pub fn is_valid_code_format(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// Trim and lowercase an email; `None` if it cannot be an address.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(email)
}
