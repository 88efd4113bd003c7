use std::path::PathBuf;

use chrono::Duration;
use serde::Deserialize;

use crate::pending::DEFAULT_GRACE_SECS;

/// Read from `SHOPFRONT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// `SHOPFRONT_MFA_URL`, base URL of the MFA service.
    pub mfa_url: String,
    /// `SHOPFRONT_STATE_DIR`, where the pending record lives.
    pub state_dir: PathBuf,
    #[serde(default = "default_grace_secs")]
    pub pending_grace_secs: i64,
}

fn default_grace_secs() -> i64 {
    DEFAULT_GRACE_SECS
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("SHOPFRONT_").from_env()
    }

    pub fn pending_grace(&self) -> Duration {
        Duration::seconds(self.pending_grace_secs)
    }
}
