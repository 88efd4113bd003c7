use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::CHALLENGE_TTL_SECS;
use crate::error::ClientError;
use crate::events::{AuthEventBus, MfaEvent};

/// Storage key for the pending record. One record per device.
pub const PENDING_KEY: &str = "shopfront.mfa.pending";

pub const DEFAULT_GRACE_SECS: i64 = 60;

/// Marker that a sign-in passed the password step but not the code step yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerificationRecord {
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingVerificationRecord {
    /// Older than a whole challenge lifetime plus `grace`: nothing left to verify.
    pub fn is_stale(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        now - self.issued_at > Duration::seconds(CHALLENGE_TTL_SECS) + grace
    }
}

/// Durable key/value slot for the pending record.
pub trait PendingStorage: Send + Sync {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// One JSON file per key under `dir`, replaced atomically.
#[derive(Debug, Clone)]
pub struct FilePendingStorage {
    dir: PathBuf,
}

impl FilePendingStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PendingStorage for FilePendingStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("rename to {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPendingStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPendingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("pending storage lock poisoned"))
    }
}

impl PendingStorage for MemoryPendingStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Reads and writes the pending record and announces every change on the bus.
#[derive(Clone)]
pub struct PendingVerificationStore {
    storage: Arc<dyn PendingStorage>,
    bus: AuthEventBus,
}

impl PendingVerificationStore {
    pub fn new(storage: Arc<dyn PendingStorage>, bus: AuthEventBus) -> Self {
        Self { storage, bus }
    }

    pub fn bus(&self) -> &AuthEventBus {
        &self.bus
    }

    pub fn store(
        &self,
        email: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let record = PendingVerificationRecord {
            email: email.to_owned(),
            issued_at,
            expires_at,
        };
        let json = serde_json::to_string(&record).context("encode pending record")?;
        self.storage.save(PENDING_KEY, &json)?;
        self.bus.emit(MfaEvent::SessionStored {
            email: record.email,
        });
        Ok(())
    }

    /// An unreadable record is dropped rather than blocking sign-in forever.
    pub fn record(&self) -> Result<Option<PendingVerificationRecord>, ClientError> {
        let Some(raw) = self.storage.load(PENDING_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable pending record");
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn peek(&self) -> Result<Option<String>, ClientError> {
        Ok(self.record()?.map(|r| r.email))
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        self.storage.remove(PENDING_KEY)?;
        self.bus.emit(MfaEvent::SessionCleared);
        Ok(())
    }

    /// Clears a record left behind by an abandoned attempt. Returns whether one was removed.
    pub fn sweep_stale(&self, now: DateTime<Utc>, grace: Duration) -> Result<bool, ClientError> {
        match self.record()? {
            Some(record) if record.is_stale(now, grace) => {
                tracing::info!(issued_at = %record.issued_at, "clearing stale pending record");
                self.clear()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
