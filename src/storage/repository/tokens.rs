// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token repositories: balances, transfers and contract metadata.
//!
//! ## Storage Layout
//!
//! ```text
//! token_balances:  {address}:{contract}:{tokenId}   cleartext: currency, contract
//! token_transfers: {id}:{contract}:{tokenId}        cleartext: contract, currency
//! token_contracts: {address}                        cleartext: contractType
//! ```

use std::ops::Deref;

use super::{Query, Repository};
use crate::error::StoreResult;
use crate::models::{TokenBalance, TokenContract, TokenTransfer};
use crate::storage::encrypted_fs::EncryptedStorage;
use crate::storage::filter::Filter;

// =============================================================================
// Balances
// =============================================================================

pub struct TokenBalanceRepository<'a> {
    repo: Repository<'a, TokenBalance>,
}

impl<'a> TokenBalanceRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    /// Balances held by one address. The address is sealed, so this decrypts
    /// the whole collection.
    pub fn by_address(&self, address: &str) -> StoreResult<Vec<TokenBalance>> {
        let mut balances = self.repo.list()?;
        balances.retain(|b| b.address == address);
        Ok(balances)
    }

    pub fn by_contract(&self, contract: &str) -> StoreResult<Vec<TokenBalance>> {
        self.repo.query(&Query::filter(Filter::eq("contract", contract)))
    }
}

impl<'a> Deref for TokenBalanceRepository<'a> {
    type Target = Repository<'a, TokenBalance>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

// =============================================================================
// Transfers
// =============================================================================

pub struct TokenTransferRepository<'a> {
    repo: Repository<'a, TokenTransfer>,
}

impl<'a> TokenTransferRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    /// Transfers of one contract, newest first.
    ///
    /// Ordering needs the sealed `creationTime`, so every transfer of the
    /// contract is decrypted before the page is cut.
    pub fn by_contract(
        &self,
        contract: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> StoreResult<Vec<TokenTransfer>> {
        let mut transfers = self
            .repo
            .query(&Query::filter(Filter::eq("contract", contract)))?;
        transfers.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

        let page = transfers.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }
}

impl<'a> Deref for TokenTransferRepository<'a> {
    type Target = Repository<'a, TokenTransfer>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

// =============================================================================
// Contracts
// =============================================================================

pub struct TokenContractRepository<'a> {
    repo: Repository<'a, TokenContract>,
}

impl<'a> TokenContractRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    pub fn contracts(&self) -> StoreResult<Vec<TokenContract>> {
        self.repo.list()
    }

    pub fn get_contract(&self, address: &str) -> StoreResult<Option<TokenContract>> {
        self.repo.get(address)
    }
}

impl<'a> Deref for TokenContractRepository<'a> {
    type Target = Repository<'a, TokenContract>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractType, TxState};
    use crate::storage::repository::tests::{temp_storage, VARIANTS};
    use chrono::{Duration, Utc};

    fn balance(address: &str, contract: &str, token_id: u64) -> TokenBalance {
        TokenBalance {
            currency: "TZBTC".into(),
            address: address.into(),
            contract: contract.into(),
            token_id,
            symbol: "tzBTC".into(),
            decimals: 8,
            balance: "1".into(),
            last_successful_update: None,
        }
    }

    fn transfer(id: &str, contract: &str, minutes_ago: i64) -> TokenTransfer {
        TokenTransfer {
            id: id.into(),
            currency: "TZBTC".into(),
            contract: contract.into(),
            token_id: 0,
            from: "tz1a".into(),
            to: "tz1b".into(),
            amount: "1".into(),
            state: TxState::Confirmed,
            creation_time: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn balances_by_address_and_contract() {
        for variant in VARIANTS {
            let (storage, _dir) = temp_storage(variant);
            let repo = TokenBalanceRepository::new(&storage);
            repo.upsert_many(&[
                balance("tz1a", "KT1x", 0),
                balance("tz1a", "KT1y", 0),
                balance("tz1b", "KT1x", 0),
            ])
            .unwrap();

            assert_eq!(repo.by_address("tz1a").unwrap().len(), 2);
            assert_eq!(repo.by_contract("KT1x").unwrap().len(), 2);
            assert!(repo.by_contract("KT1z").unwrap().is_empty());
        }
    }

    #[test]
    fn transfers_are_newest_first_and_paged() {
        let (storage, _dir) = temp_storage(crate::storage::codec::StorageVariant::Envelope);
        let repo = TokenTransferRepository::new(&storage);
        repo.upsert_many(&[
            transfer("op3", "KT1x", 30),
            transfer("op1", "KT1x", 10),
            transfer("op2", "KT1x", 20),
            transfer("op9", "KT1y", 0),
        ])
        .unwrap();

        let ids = |v: Vec<TokenTransfer>| v.into_iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(repo.by_contract("KT1x", 0, None).unwrap()), ["op1", "op2", "op3"]);
        assert_eq!(ids(repo.by_contract("KT1x", 1, Some(1)).unwrap()), ["op2"]);
        assert!(repo.by_contract("KT1x", 5, None).unwrap().is_empty());
    }

    #[test]
    fn contracts_by_address() {
        for variant in VARIANTS {
            let (storage, _dir) = temp_storage(variant);
            let repo = TokenContractRepository::new(&storage);
            let contract = TokenContract {
                address: "KT1x".into(),
                name: "tzBTC".into(),
                contract_type: ContractType::Fa12,
            };
            repo.upsert(&contract).unwrap();

            assert_eq!(repo.get_contract("KT1x").unwrap(), Some(contract));
            assert_eq!(repo.contracts().unwrap().len(), 1);
        }
    }
}
