// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the connector. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WALLET_PROVIDER_URL` | EIP-1193 JSON-RPC endpoint of the wallet | unset (no provider) |
//! | `DATA_DIR` | Root directory for durable local state | `./data` |
//! | `WALLET_POLL_INTERVAL_MS` | Provider watcher poll interval | `2000` |
//! | `PRESALE_CHAIN_ID` | Chain to switch to on start (hex or decimal) | unset |
//! | `PURCHASE_DELIVERY_DELAY_MS` | Delay before a pending purchase is marked delivered | `30000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,nova_presale_wallet=debug` |

use std::path::PathBuf;
use std::time::Duration;

use crate::blockchain::parse_chain_id;
use crate::storage::paths::DATA_ROOT;

/// Environment variable name for the wallet's JSON-RPC endpoint.
///
/// When unset, the connector runs without a wallet and every wallet
/// operation reports that no provider is available.
pub const WALLET_PROVIDER_URL_ENV: &str = "WALLET_PROVIDER_URL";

/// Environment variable name for the data directory path.
///
/// Holds the connection marker and the purchase ledger.
///
/// # Default
/// `./data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the watcher poll interval in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "WALLET_POLL_INTERVAL_MS";

/// Default watcher poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Environment variable name for the chain to switch to on start.
pub const PRESALE_CHAIN_ID_ENV: &str = "PRESALE_CHAIN_ID";

/// Environment variable name for the token delivery delay in milliseconds.
///
/// A submitted purchase stays `Pending` for this long, then moves to
/// `Completed`. Zero settles on the next scheduler turn.
pub const DELIVERY_DELAY_ENV: &str = "PURCHASE_DELIVERY_DELAY_MS";

/// Default token delivery delay.
pub const DEFAULT_DELIVERY_DELAY_MS: u64 = 30_000;

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,nova_presale_wallet=debug";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable
    #[default]
    Pretty,
}

/// Runtime configuration of the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub provider_url: Option<String>,
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub presale_chain_id: Option<u64>,
    pub delivery_delay: Duration,
    pub log_format: LogFormat,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            data_dir: PathBuf::from(DATA_ROOT),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            presale_chain_id: None,
            delivery_delay: Duration::from_millis(DEFAULT_DELIVERY_DELAY_MS),
            log_format: LogFormat::default(),
        }
    }
}

impl WalletConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let poll_interval = match get(POLL_INTERVAL_ENV) {
            Some(raw) => {
                let interval = parse_millis(POLL_INTERVAL_ENV, &raw)?;
                if interval.is_zero() {
                    return Err(ConfigError::InvalidValue {
                        var: POLL_INTERVAL_ENV,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                interval
            }
            None => defaults.poll_interval,
        };

        let delivery_delay = match get(DELIVERY_DELAY_ENV) {
            Some(raw) => parse_millis(DELIVERY_DELAY_ENV, &raw)?,
            None => defaults.delivery_delay,
        };

        let presale_chain_id = get(PRESALE_CHAIN_ID_ENV)
            .map(|raw| parse_chain_id(&raw))
            .transpose()
            .map_err(|reason| ConfigError::InvalidValue {
                var: PRESALE_CHAIN_ID_ENV,
                reason,
            })?;

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            provider_url: get(WALLET_PROVIDER_URL_ENV),
            data_dir: get(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            poll_interval,
            presale_chain_id,
            delivery_delay,
            log_format,
        })
    }
}

fn parse_millis(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidValue {
            var,
            reason: format!("{raw}: {e}"),
        })
}
