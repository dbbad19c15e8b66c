// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Async access to a [`WalletStore`].
//!
//! Store work is blocking disk and CPU work, so every call runs on tokio's
//! blocking pool. Calls take a `CancellationToken`; a token cancelled before
//! the blocking work starts yields [`StoreError::Cancelled`] and nothing is
//! read or written. Once started, a call runs to completion.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::WalletStore;

/// Cloneable async handle to one open store.
#[derive(Clone, Debug)]
pub struct AsyncWalletStore {
    inner: Arc<WalletStore>,
}

async fn blocking<R, F>(cancel: &CancellationToken, f: F) -> StoreResult<R>
where
    F: FnOnce() -> StoreResult<R> + Send + 'static,
    R: Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        f()
    })
    .await
    .map_err(|e| StoreError::StoreIo(format!("blocking task failed: {e}")))?
}

impl AsyncWalletStore {
    pub fn new(store: WalletStore) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Open the store on the blocking pool.
    pub async fn open(
        path: PathBuf,
        password: Zeroizing<Vec<u8>>,
        config: StoreConfig,
        cancel: &CancellationToken,
    ) -> StoreResult<Self> {
        let store = blocking(cancel, move || WalletStore::open(&path, &password, &config)).await?;
        Ok(Self::new(store))
    }

    /// Direct access for callers already on a blocking thread.
    pub fn blocking_store(&self) -> &WalletStore {
        &self.inner
    }

    /// Run `f` against the store on the blocking pool.
    pub async fn run<R, F>(&self, cancel: &CancellationToken, f: F) -> StoreResult<R>
    where
        F: FnOnce(&WalletStore) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        blocking(cancel, move || f(&store)).await
    }

    pub async fn change_password(
        &self,
        new_password: Zeroizing<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.run(cancel, move |store| store.change_password(&new_password))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeyIndex, WalletAddress};

    async fn open(dir: &tempfile::TempDir) -> AsyncWalletStore {
        AsyncWalletStore::open(
            dir.path().join("data.db"),
            Zeroizing::new(b"pw".to_vec()),
            StoreConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn runs_repository_calls() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        let token = CancellationToken::new();

        let address = WalletAddress::new("BTC", "1abc", KeyIndex::default());
        let inserted = address.clone();
        assert!(store
            .run(&token, move |s| s.addresses().upsert(&inserted))
            .await
            .unwrap());

        let found = store
            .run(&token, |s| s.addresses().get_address("BTC", "1abc"))
            .await
            .unwrap();
        assert_eq!(found, Some(address));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        let token = CancellationToken::new();
        token.cancel();

        let address = WalletAddress::new("BTC", "1abc", KeyIndex::default());
        let result = store
            .run(&token, move |s| s.addresses().upsert(&address))
            .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));

        let count = store
            .run(&CancellationToken::new(), |s| s.addresses().list())
            .await
            .unwrap()
            .len();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn cancelled_open_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = AsyncWalletStore::open(
            dir.path().join("data.db"),
            Zeroizing::new(b"pw".to_vec()),
            StoreConfig::default(),
            &token,
        )
        .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
        assert!(!dir.path().join("data.db").exists());
    }
}
