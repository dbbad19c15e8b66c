// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Swap repository.

use std::ops::Deref;

use super::{Query, Repository};
use crate::error::StoreResult;
use crate::models::{Swap, SwapStatus};
use crate::storage::encrypted_fs::EncryptedStorage;
use crate::storage::filter::Filter;

/// Repository for atomic swaps, keyed by swap id.
pub struct SwapRepository<'a> {
    repo: Repository<'a, Swap>,
}

impl<'a> SwapRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    /// Insert a new swap. Returns `false` if the id is already taken.
    pub fn add_swap(&self, swap: &Swap) -> StoreResult<bool> {
        self.repo.try_insert(swap)
    }

    /// Replace an existing swap. Returns `false` if it is not stored.
    pub fn update_swap(&self, swap: &Swap) -> StoreResult<bool> {
        self.repo
            .update(&swap.id.to_string(), |current| current.map(|_| swap.clone()))
    }

    pub fn get_swap(&self, id: i64) -> StoreResult<Option<Swap>> {
        self.repo.get(&id.to_string())
    }

    pub fn swaps(&self) -> StoreResult<Vec<Swap>> {
        self.repo.list()
    }

    /// Swaps that have not reached a final status.
    pub fn active_swaps(&self) -> StoreResult<Vec<Swap>> {
        let finals = SwapStatus::ALL
            .into_iter()
            .filter(|s| s.is_final())
            .map(SwapStatus::as_str);
        self.repo
            .query(&Query::filter(Filter::Not(Box::new(Filter::any_of("status", finals)))))
    }
}

impl<'a> Deref for SwapRepository<'a> {
    type Target = Repository<'a, Swap>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
