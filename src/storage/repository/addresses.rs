// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address repository.
//!
//! Addresses are keyed by `{address}:{currency}`. Only `currency` and
//! `hasActivity` are cleartext; balances and key paths stay sealed and are
//! filtered after decryption.

use std::ops::Deref;

use super::{Query, Repository};
use crate::error::StoreResult;
use crate::models::WalletAddress;
use crate::storage::encrypted_fs::EncryptedStorage;
use crate::storage::filter::Filter;

/// Repository for wallet addresses.
pub struct AddressRepository<'a> {
    repo: Repository<'a, WalletAddress>,
}

impl<'a> AddressRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    pub fn get_address(&self, currency: &str, address: &str) -> StoreResult<Option<WalletAddress>> {
        self.repo.get(&WalletAddress::unique_id(address, currency))
    }

    pub fn addresses_by_currency(&self, currency: &str) -> StoreResult<Vec<WalletAddress>> {
        self.repo.query(&Query::filter(Filter::eq("currency", currency)))
    }

    /// Addresses of `currency` holding a non-zero balance.
    pub fn unspent_addresses(
        &self,
        currency: &str,
        include_unconfirmed: bool,
    ) -> StoreResult<Vec<WalletAddress>> {
        let mut addresses = self.addresses_by_currency(currency)?;
        addresses.retain(|a| a.has_funds(include_unconfirmed));
        Ok(addresses)
    }

    /// Highest-index used address on a derivation chain.
    pub fn last_active_address(&self, currency: &str, chain: u32) -> StoreResult<Option<WalletAddress>> {
        let active = self.repo.query(&Query::filter(
            Filter::eq("currency", currency).and(Filter::eq("hasActivity", true)),
        ))?;
        Ok(active
            .into_iter()
            .filter(|a| a.key_index.chain == chain)
            .max_by_key(|a| (a.key_index.account, a.key_index.index)))
    }
}

impl<'a> Deref for AddressRepository<'a> {
    type Target = Repository<'a, WalletAddress>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
