use serde::Deserialize;

use shopfront_core::config::Config;

/// MFA service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct MfaConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// Redis connection URL. Env var: `REDIS_URL`.
    pub redis_url: String,
    /// HMAC secret for signing MFA assurance tokens.
    pub jwt_secret: String,
    /// Cookie domain attribute (root domain, e.g. "shop.example").
    pub cookie_domain: String,
    /// Transactional email endpoint, e.g. "https://api.resend.com/emails".
    pub email_api_url: String,
    /// Server-held API key for the email provider.
    pub email_api_key: String,
    /// Sender mailbox, e.g. "Shop <no-reply@shop.example>".
    pub email_from: String,
    /// TCP port to listen on (default 3114). Env var: `MFA_PORT`.
    #[serde(default = "default_port")]
    pub mfa_port: u16,
    /// Seconds between expired-challenge sweeps (default 60).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_port() -> u16 {
    3114
}

fn default_sweep_interval() -> u64 {
    60
}

impl Config for MfaConfig {}
