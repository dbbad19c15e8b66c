// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! UTXO repository.

use std::ops::Deref;

use super::{Query, Repository};
use crate::error::StoreResult;
use crate::models::TxOutput;
use crate::storage::encrypted_fs::EncryptedStorage;
use crate::storage::filter::Filter;

/// Repository for transaction outputs. Only `currency` is cleartext; owner
/// address and spent state are checked after decryption.
pub struct OutputRepository<'a> {
    repo: Repository<'a, TxOutput>,
}

impl<'a> OutputRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    /// Outputs of `currency`, optionally restricted to one owner address.
    pub fn outputs(&self, currency: &str, address: Option<&str>) -> StoreResult<Vec<TxOutput>> {
        let mut outputs = self.repo.query(&Query::filter(Filter::eq("currency", currency)))?;
        if let Some(address) = address {
            outputs.retain(|o| o.address == address);
        }
        Ok(outputs)
    }

    /// Unspent outputs of `currency`.
    pub fn available_outputs(&self, currency: &str) -> StoreResult<Vec<TxOutput>> {
        let mut outputs = self.outputs(currency, None)?;
        outputs.retain(|o| !o.is_spent());
        Ok(outputs)
    }

    pub fn get_output(&self, currency: &str, tx_id: &str, index: u32) -> StoreResult<Option<TxOutput>> {
        self.repo.get(&TxOutput::unique_id(currency, tx_id, index))
    }
}

impl<'a> Deref for OutputRepository<'a> {
    type Target = Repository<'a, TxOutput>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
