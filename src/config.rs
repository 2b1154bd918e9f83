// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Values are
//! trimmed; empty strings count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PRESALE_API_BASE_URL` | Backend API base (including `/api`) | `http://localhost:8080/api` |
//! | `PRESALE_REQUEST_TIMEOUT_SECS` | Bound on every backend call | `10` |
//! | `PRESALE_SCAN_SETTLE_MS` | Scanning phase settle delay | `2000` |
//! | `PRESALE_REVEAL_DELAY_MS` | Delay before the result notification | `1500` |
//! | `PRESALE_CLAIM_SETTLE_MS` | Claiming phase settle delay | `1500` |
//! | `PRESALE_CONTACT_EMAIL` | Optional contact email for scan/claim | unset |
//! | `RUST_LOG` | Log level filter | `info` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |

use std::time::Duration;

use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SCAN_SETTLE_MS: u64 = 2000;
const DEFAULT_REVEAL_DELAY_MS: u64 = 1500;
const DEFAULT_CLAIM_SETTLE_MS: u64 = 1500;

/// Configuration error raised during startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Engine configuration.
///
/// The settle delays are a pacing contract inherited from the original UX:
/// they fire even when the backend answers instantly, and they are
/// cancellable on disconnect or shutdown.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the presale backend, including the `/api` prefix.
    pub base_url: String,
    /// Bound on every backend call. The original waited indefinitely, which
    /// is not a safe contract; expiry counts as a normal call failure.
    pub request_timeout: Duration,
    /// Time spent in `Scanning` before the eligibility outcome is applied.
    pub scan_settle: Duration,
    /// Additional delay before the outcome notification becomes visible.
    pub reveal_delay: Duration,
    /// Time spent in `Claiming` before `Claimed` is applied.
    pub claim_settle: Duration,
    /// Optional contact email forwarded to scan and claim calls.
    pub email: Option<String>,
    /// User agent reported to the backend.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            scan_settle: Duration::from_millis(DEFAULT_SCAN_SETTLE_MS),
            reveal_delay: Duration::from_millis(DEFAULT_REVEAL_DELAY_MS),
            claim_settle: Duration::from_millis(DEFAULT_CLAIM_SETTLE_MS),
            email: None,
            user_agent: default_user_agent(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_or_default("PRESALE_API_BASE_URL", DEFAULT_BASE_URL);
        Url::parse(&base_url).map_err(|_| ConfigError::InvalidValue {
            name: "PRESALE_API_BASE_URL".into(),
            value: base_url.clone(),
        })?;

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(env_u64(
                "PRESALE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            scan_settle: Duration::from_millis(env_u64(
                "PRESALE_SCAN_SETTLE_MS",
                DEFAULT_SCAN_SETTLE_MS,
            )?),
            reveal_delay: Duration::from_millis(env_u64(
                "PRESALE_REVEAL_DELAY_MS",
                DEFAULT_REVEAL_DELAY_MS,
            )?),
            claim_settle: Duration::from_millis(env_u64(
                "PRESALE_CLAIM_SETTLE_MS",
                DEFAULT_CLAIM_SETTLE_MS,
            )?),
            email: env_optional("PRESALE_CONTACT_EMAIL"),
            user_agent: default_user_agent(),
        })
    }
}

fn default_user_agent() -> String {
    format!("presale-engine/{}", env!("CARGO_PKG_VERSION"))
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match env_optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
    }
}
