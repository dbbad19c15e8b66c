// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction repository for persisting transaction history.
//!
//! Keyed by `{currency}:{txId}`; `currency` and `state` are cleartext so the
//! wallet can find unconfirmed transactions without decrypting the history.

use std::ops::Deref;

use super::{Query, Repository};
use crate::error::StoreResult;
use crate::models::{TxState, WalletTransaction};
use crate::storage::encrypted_fs::EncryptedStorage;
use crate::storage::filter::Filter;

/// Repository for wallet transactions.
pub struct TransactionRepository<'a> {
    repo: Repository<'a, WalletTransaction>,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    pub fn get_transaction(&self, currency: &str, tx_id: &str) -> StoreResult<Option<WalletTransaction>> {
        self.repo.get(&WalletTransaction::unique_id(currency, tx_id))
    }

    pub fn by_currency(&self, currency: &str) -> StoreResult<Vec<WalletTransaction>> {
        self.repo.query(&Query::filter(Filter::eq("currency", currency)))
    }

    /// Transactions not yet confirmed or failed, across all currencies.
    pub fn unconfirmed(&self) -> StoreResult<Vec<WalletTransaction>> {
        self.repo.query(&Query::filter(Filter::any_of(
            "state",
            [TxState::Pending.as_str(), TxState::Unconfirmed.as_str()],
        )))
    }

    pub fn remove_transaction(&self, currency: &str, tx_id: &str) -> StoreResult<bool> {
        self.repo.delete(&WalletTransaction::unique_id(currency, tx_id))
    }
}

impl<'a> Deref for TransactionRepository<'a> {
    type Target = Repository<'a, WalletTransaction>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
