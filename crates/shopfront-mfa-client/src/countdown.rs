use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifetime of an issued code.
pub const CHALLENGE_TTL_SECS: i64 = 300;
/// Resend stays disabled for the first 60 seconds of a challenge.
pub const RESEND_UNLOCK_REMAINING_SECS: i64 = 240;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// Resend gate derived from the persisted `expires_at`, so it survives a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendCountdown {
    expires_at: DateTime<Utc>,
}

impl ResendCountdown {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whole seconds left, rounded up, within `0..=CHALLENGE_TTL_SECS`.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        let ms = (self.expires_at - now).num_milliseconds();
        if ms <= 0 {
            return 0;
        }
        ((ms + 999) / 1000).min(CHALLENGE_TTL_SECS)
    }

    pub fn can_resend(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) <= RESEND_UNLOCK_REMAINING_SECS
    }

    /// Seconds until resend unlocks; zero once it has.
    pub fn resend_wait_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.remaining_secs(now) - RESEND_UNLOCK_REMAINING_SECS).max(0) as u64
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }

    pub fn reset(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = expires_at;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub remaining_secs: u64,
    pub can_resend: bool,
}

impl CountdownTick {
    fn at(remaining_secs: u64) -> Self {
        Self {
            remaining_secs,
            can_resend: remaining_secs as i64 <= RESEND_UNLOCK_REMAINING_SECS,
        }
    }
}

/// Publishes a [`CountdownTick`] once per second until zero. Aborted on drop.
#[derive(Debug)]
pub struct CountdownTicker {
    rx: watch::Receiver<CountdownTick>,
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn start(remaining_secs: u64) -> Self {
        let (tx, rx) = watch::channel(CountdownTick::at(remaining_secs));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // first tick completes immediately
            interval.tick().await;
            let mut remaining = remaining_secs;
            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;
                if tx.send(CountdownTick::at(remaining)).is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownTick> {
        self.rx.clone()
    }

    pub fn current(&self) -> CountdownTick {
        *self.rx.borrow()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
