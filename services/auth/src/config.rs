use serde::Deserialize;

use gada_core::config::Config;

/// Auth service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// sea-orm connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// HMAC secret for signing access tokens. Env var: `JWT_SECRET`.
    pub jwt_secret: String,
    /// TCP port to listen on. Env var: `AUTH_PORT`.
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    /// Refresh cookie `Domain` attribute; host-only when unset.
    #[serde(default)]
    pub cookie_domain: Option<String>,
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
    /// Return verification codes and reset tokens in responses. Development only.
    #[serde(default)]
    pub expose_dev_tokens: bool,
    /// Take the client address from `x-forwarded-for` / `x-real-ip` instead of
    /// the socket peer. Enable only behind a proxy that overwrites them.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_sweep_batch_limit")]
    pub sweep_batch_limit: u64,
}

impl Config for AuthConfig {}

fn default_auth_port() -> u16 {
    3112
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_db_acquire_timeout_secs() -> u64 {
    5
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_sweep_batch_limit() -> u64 {
    500
}
