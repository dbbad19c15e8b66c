// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used by
//! the store and the maintenance binary. Configuration is loaded from the
//! environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `data.db` and `backups/` | `./data` |
//! | `WALLET_NETWORK` | `mainnet` or `testnet` | `mainnet` |
//! | `STORE_VARIANT` | Variant for new stores (`envelope` or `sealed`) | `envelope` |
//! | `STORE_COMPACTION` | `always`, `never` or `platform` | `platform` |
//! | `WALLET_STORE_PASSWORD` | Store password (binary only) | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage::{CompactionPolicy, MigrationContext, Network, StorageVariant};

/// Environment variable name for the data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Environment variable name for the blockchain network.
///
/// Some migrations only apply to one network (testnet XTZ purge).
pub const NETWORK_ENV: &str = "WALLET_NETWORK";

/// Environment variable name for the storage variant used by new stores.
///
/// Existing files keep the variant they were written with.
pub const STORE_VARIANT_ENV: &str = "STORE_VARIANT";

/// Environment variable name for the post-migration compaction policy.
pub const COMPACTION_ENV: &str = "STORE_COMPACTION";

/// Environment variable name for the store password.
pub const PASSWORD_ENV: &str = "WALLET_STORE_PASSWORD";

/// Environment variable name for log output format.
///
/// - `json`: Structured JSON logs (production)
/// - `pretty`: Human-readable logs (development)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration error raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn parse_var<T: FromStr<Err = String> + Default>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse()
            .map_err(|reason| ConfigError::Invalid { var, reason }),
        _ => Ok(T::default()),
    }
}

/// Options for opening a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Variant used when the file does not exist yet.
    pub variant: StorageVariant,
    pub network: Network,
    pub compaction: CompactionPolicy,
}

impl StoreConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            variant: parse_var(&lookup, STORE_VARIANT_ENV)?,
            network: parse_var(&lookup, NETWORK_ENV)?,
            compaction: parse_var(&lookup, COMPACTION_ENV)?,
        })
    }

    pub fn migration_context(&self) -> MigrationContext {
        MigrationContext {
            network: self.network,
            compaction: self.compaction,
        }
    }
}

/// Data directory from `DATA_DIR`, or [`DEFAULT_DATA_DIR`].
pub fn data_dir() -> PathBuf {
    env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}
