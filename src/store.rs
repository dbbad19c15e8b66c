// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet store handle.
//!
//! Opening a store derives the session keys from the password, picks the
//! storage variant (the file's own, or the configured one for new files),
//! verifies the key and brings the schema up to date. The handle then hands
//! out typed repositories that share its lock.

use std::path::Path;

use zeroize::Zeroizing;

use crate::config::StoreConfig;
use crate::crypto::{SecretDeriver, Sha256SecretDeriver};
use crate::error::StoreResult;
use crate::storage::migrations::{self, MigrationActions, MigrationOutcome};
use crate::storage::schema::ALL_COLLECTIONS;
use crate::storage::{
    AddressRepository, EncryptedStorage, OrderRepository, OutputRepository, StoragePaths, StorageVariant,
    SwapRepository, TokenBalanceRepository, TokenContractRepository, TokenTransferRepository,
    TransactionRepository,
};

/// An open wallet store.
///
/// Key material lives in zeroizing buffers and is wiped when the handle is
/// dropped or [`closed`](WalletStore::close).
pub struct WalletStore {
    storage: EncryptedStorage,
    deriver: Box<dyn SecretDeriver>,
    outcome: MigrationOutcome,
}

impl std::fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStore")
            .field("storage", &self.storage)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl WalletStore {
    /// Open (or create) the store at `path` with the default secret deriver.
    pub fn open(path: impl AsRef<Path>, password: &[u8], config: &StoreConfig) -> StoreResult<Self> {
        Self::open_with(path, password, config, Sha256SecretDeriver)
    }

    /// Open (or create) the store at `path`.
    ///
    /// Fails with [`StoreError::Decryption`](crate::error::StoreError::Decryption)
    /// on a wrong password, and with any hard migration error.
    pub fn open_with(
        path: impl AsRef<Path>,
        password: &[u8],
        config: &StoreConfig,
        deriver: impl SecretDeriver + 'static,
    ) -> StoreResult<Self> {
        let paths = StoragePaths::new(path);
        let variant = match StorageVariant::detect(paths.data_file())? {
            Some(found) => {
                if found != config.variant {
                    tracing::info!(found = %found, configured = %config.variant, "Using variant of existing store");
                }
                found
            }
            None => config.variant,
        };

        let secret = deriver.derive_secret(password);
        let storage = EncryptedStorage::new(paths, variant, secret.as_slice());
        drop(secret);

        let outcome = {
            let session = storage.lock()?;
            session.ensure_key_check()?;
            migrations::migrate(&session, &config.migration_context())?
        };

        tracing::info!(
            path = %storage.paths().data_file().display(),
            variant = %variant,
            from = ?outcome.from,
            version = outcome.to,
            backups = outcome.backups.len(),
            "Wallet store opened"
        );
        for action in outcome.actions.iter() {
            tracing::info!(action = %action, "Follow-up required after migration");
        }

        Ok(Self {
            storage,
            deriver: Box::new(deriver),
            outcome,
        })
    }

    pub fn path(&self) -> &Path {
        self.storage.paths().data_file()
    }

    pub fn variant(&self) -> StorageVariant {
        self.storage.variant()
    }

    /// What the migration driver did during open.
    pub fn migration_outcome(&self) -> &MigrationOutcome {
        &self.outcome
    }

    /// Follow-up work the account layer owes after open.
    pub fn actions(&self) -> &MigrationActions {
        &self.outcome.actions
    }

    pub fn schema_version(&self) -> StoreResult<Option<u32>> {
        self.storage.with_connection(|conn, _| conn.schema_version())
    }

    /// Stored record count per collection.
    pub fn collection_counts(&self) -> StoreResult<Vec<(&'static str, usize)>> {
        self.storage.with_connection(|conn, _| {
            ALL_COLLECTIONS
                .iter()
                .map(|schema| -> StoreResult<(&'static str, usize)> {
                    Ok((schema.name, conn.count(schema.name)?))
                })
                .collect()
        })
    }

    /// Re-key the store under `new_password` in one atomic commit.
    pub fn change_password(&self, new_password: &[u8]) -> StoreResult<()> {
        let secret: Zeroizing<[u8; 32]> = self.deriver.derive_secret(new_password);
        self.storage.lock()?.rekey(secret.as_slice())
    }

    /// Close the store, wiping key material.
    pub fn close(self) {
        tracing::debug!(path = %self.path().display(), "Wallet store closed");
    }

    pub fn storage(&self) -> &EncryptedStorage {
        &self.storage
    }

    pub fn addresses(&self) -> AddressRepository<'_> {
        AddressRepository::new(&self.storage)
    }

    pub fn transactions(&self) -> TransactionRepository<'_> {
        TransactionRepository::new(&self.storage)
    }

    pub fn outputs(&self) -> OutputRepository<'_> {
        OutputRepository::new(&self.storage)
    }

    pub fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.storage)
    }

    pub fn swaps(&self) -> SwapRepository<'_> {
        SwapRepository::new(&self.storage)
    }

    pub fn token_balances(&self) -> TokenBalanceRepository<'_> {
        TokenBalanceRepository::new(&self.storage)
    }

    pub fn token_transfers(&self) -> TokenTransferRepository<'_> {
        TokenTransferRepository::new(&self.storage)
    }

    pub fn token_contracts(&self) -> TokenContractRepository<'_> {
        TokenContractRepository::new(&self.storage)
    }
}
