// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store maintenance binary: opens the wallet store (running any pending
//! migrations) and reports its state.

use std::env;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wallet_docstore::config::{self, ConfigError, LogFormat, DEFAULT_LOG_FILTER, PASSWORD_ENV};
use wallet_docstore::storage::paths::DATA_FILE_NAME;
use wallet_docstore::{AsyncWalletStore, StoreConfig};
use zeroize::Zeroizing;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match LogFormat::from_env() {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = StoreConfig::from_env()?;
    let password = env::var(PASSWORD_ENV)
        .map(|p| Zeroizing::new(p.into_bytes()))
        .map_err(|_| ConfigError::Missing(PASSWORD_ENV))?;
    let path = config::data_dir().join(DATA_FILE_NAME);

    let cancel = CancellationToken::new();
    let store = AsyncWalletStore::open(path, password, config, &cancel).await?;

    let (version, counts) = store
        .run(&cancel, |s| Ok((s.schema_version()?, s.collection_counts()?)))
        .await?;

    let outcome = store.blocking_store().migration_outcome();
    tracing::info!(
        variant = %store.blocking_store().variant(),
        version = ?version,
        migrated_from = ?outcome.from,
        backups = outcome.backups.len(),
        "Store ready"
    );
    for action in outcome.actions.iter() {
        tracing::warn!(action = %action, "Pending follow-up action");
    }
    for (collection, count) in counts {
        tracing::info!(collection, count, "Collection");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Store maintenance failed");
            ExitCode::FAILURE
        }
    }
}
