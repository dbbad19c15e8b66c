// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order repository.
//!
//! Orders are keyed by their client order id. Exchange updates can arrive
//! out of order, so [`OrderRepository::upsert_order`] never replaces a
//! stored order with an older snapshot.

use std::ops::Deref;

use super::{Query, Repository};
use crate::error::StoreResult;
use crate::models::Order;
use crate::storage::encrypted_fs::EncryptedStorage;
use crate::storage::filter::Filter;

/// Repository for exchange orders.
pub struct OrderRepository<'a> {
    repo: Repository<'a, Order>,
}

impl<'a> OrderRepository<'a> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            repo: Repository::new(storage),
        }
    }

    pub fn get_order(&self, client_order_id: &str) -> StoreResult<Option<Order>> {
        self.repo.get(client_order_id)
    }

    pub fn by_symbol(&self, symbol: &str) -> StoreResult<Vec<Order>> {
        self.repo.query(&Query::filter(Filter::eq("symbol", symbol)))
    }

    /// Store `order` unless the stored copy was updated more recently.
    ///
    /// Returns `false` when the stored copy is newer.
    pub fn upsert_order(&self, order: &Order) -> StoreResult<bool> {
        self.repo.update(&order.client_order_id, |current| match current {
            Some(stored) if stored.last_updated > order.last_updated => {
                tracing::debug!(
                    client_order_id = %order.client_order_id,
                    "Ignoring stale order update"
                );
                None
            }
            _ => Some(order.clone()),
        })
    }

    pub fn remove_all(&self) -> StoreResult<usize> {
        self.repo.delete_all()
    }
}

impl<'a> Deref for OrderRepository<'a> {
    type Target = Repository<'a, Order>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
