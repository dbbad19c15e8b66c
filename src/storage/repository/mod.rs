// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to encrypted storage.
//!
//! [`Repository`] implements the operations shared by every entity kind on
//! top of [`EncryptedStorage`]; the per-kind repositories add the lookups the
//! wallet needs for that kind.
//!
//! ## Error Policy
//!
//! - `StoreIo` failures are logged and turned into `None` / `false` / `0` /
//!   an empty list, so the rest of the wallet keeps working.
//! - Everything else (decryption, unindexed filters, malformed records)
//!   propagates. A query fails as a whole if any matching record does not
//!   decrypt.

use std::marker::PhantomData;

use super::encrypted_fs::EncryptedStorage;
use super::filter::Filter;
use super::schema::{Document, Entity};
use crate::error::{StoreError, StoreResult};

pub mod addresses;
pub mod orders;
pub mod outputs;
pub mod swaps;
pub mod tokens;
pub mod transactions;

pub use addresses::AddressRepository;
pub use orders::OrderRepository;
pub use outputs::OutputRepository;
pub use swaps::SwapRepository;
pub use tokens::{TokenBalanceRepository, TokenContractRepository, TokenTransferRepository};
pub use transactions::TransactionRepository;

/// Predicate plus pagination. `offset` and `limit` apply after decryption.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Filter::All,
            offset: 0,
            limit: None,
        }
    }
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Generic repository over one entity kind.
pub struct Repository<'a, E: Entity> {
    storage: &'a EncryptedStorage,
    _kind: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Repository<'a, E> {
    pub fn new(storage: &'a EncryptedStorage) -> Self {
        Self {
            storage,
            _kind: PhantomData,
        }
    }

    /// Swallow soft errors into the empty value for `T`.
    fn soft<T: Default>(&self, op: &'static str, result: StoreResult<T>) -> StoreResult<T> {
        match result {
            Err(e) if e.is_soft() => {
                tracing::error!(collection = E::SCHEMA.name, op, error = %e, "Store operation failed");
                Ok(T::default())
            }
            other => other,
        }
    }

    /// Insert or replace. Returns `false` only when a soft failure was swallowed.
    pub fn upsert(&self, record: &E) -> StoreResult<bool> {
        let result = self.storage.with_connection(|conn, codec| {
            let doc = record.to_document()?;
            let stored = codec.encode(E::SCHEMA, &doc)?;
            let id = codec.primary_id(&record.logical_id());
            conn.write(|batch| batch.put(E::SCHEMA.name, &id, &stored))?;
            Ok(true)
        });
        self.soft("upsert", result)
    }

    /// Insert or replace many records in one write transaction.
    pub fn upsert_many(&self, records: &[E]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let result = self.storage.with_connection(|conn, codec| {
            let mut encoded = Vec::with_capacity(records.len());
            for record in records {
                let stored = codec.encode(E::SCHEMA, &record.to_document()?)?;
                encoded.push((codec.primary_id(&record.logical_id()), stored));
            }
            conn.write(|batch| {
                for (id, stored) in &encoded {
                    batch.put(E::SCHEMA.name, id, stored)?;
                }
                Ok(encoded.len())
            })
        });
        self.soft("upsert_many", result)
    }

    /// Insert only if the logical id is free. Check and insert share one
    /// write transaction.
    pub fn try_insert(&self, record: &E) -> StoreResult<bool> {
        let result = self.storage.with_connection(|conn, codec| {
            let stored = codec.encode(E::SCHEMA, &record.to_document()?)?;
            let id = codec.primary_id(&record.logical_id());
            conn.write(|batch| {
                if batch.get(E::SCHEMA.name, &id)?.is_some() {
                    return Ok(false);
                }
                batch.put(E::SCHEMA.name, &id, &stored)?;
                Ok(true)
            })
        });
        self.soft("try_insert", result)
    }

    /// Point lookup by logical id.
    pub fn get(&self, logical_id: &str) -> StoreResult<Option<E>> {
        let result = self.storage.with_connection(|conn, codec| {
            match conn.get(E::SCHEMA.name, &codec.primary_id(logical_id))? {
                Some(stored) => Ok(Some(E::from_document(codec.decode(E::SCHEMA, &stored)?)?)),
                None => Ok(None),
            }
        });
        self.soft("get", result)
    }

    /// Filter on cleartext index fields, decrypt matches, then paginate.
    pub fn query(&self, query: &Query) -> StoreResult<Vec<E>> {
        query.filter.validate(E::SCHEMA)?;
        let docs = self.matching_documents(&query.filter)?;
        let records = docs
            .into_iter()
            .map(E::from_document)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(query.paginate(records))
    }

    /// Every record of the collection.
    pub fn list(&self) -> StoreResult<Vec<E>> {
        self.query(&Query::all())
    }

    /// Number of records matching `filter`, evaluated on the index only.
    pub fn count(&self, filter: &Filter) -> StoreResult<usize> {
        filter.validate(E::SCHEMA)?;
        let result = self.storage.with_connection(|conn, codec| {
            let mut n = 0;
            for (_, stored) in conn.scan(E::SCHEMA.name)? {
                if filter.matches(index_of::<E>(codec.index_view(E::SCHEMA, &stored))?) {
                    n += 1;
                }
            }
            Ok(n)
        });
        self.soft("count", result)
    }

    /// Remove by logical id. Absent ids return `false`.
    pub fn delete(&self, logical_id: &str) -> StoreResult<bool> {
        let result = self.storage.with_connection(|conn, codec| {
            let id = codec.primary_id(logical_id);
            conn.write(|batch| batch.remove(E::SCHEMA.name, &id))
        });
        self.soft("delete", result)
    }

    /// Remove every record whose index matches `filter`. Nothing is decrypted.
    pub fn delete_where(&self, filter: &Filter) -> StoreResult<usize> {
        filter.validate(E::SCHEMA)?;
        let result = self.storage.with_connection(|conn, codec| {
            conn.write(|batch| {
                let mut removed = 0;
                for (id, stored) in batch.scan(E::SCHEMA.name)? {
                    if filter.matches(index_of::<E>(codec.index_view(E::SCHEMA, &stored))?) {
                        batch.remove(E::SCHEMA.name, &id)?;
                        removed += 1;
                    }
                }
                Ok(removed)
            })
        });
        self.soft("delete_where", result)
    }

    /// Remove the whole collection.
    pub fn delete_all(&self) -> StoreResult<usize> {
        let result = self.storage.with_connection(|conn, _| {
            let count = conn.count(E::SCHEMA.name)?;
            conn.write(|batch| batch.drop_collection(E::SCHEMA.name))?;
            Ok(count)
        });
        self.soft("delete_all", result)
    }

    /// Read-modify-write of one record inside a single write transaction.
    ///
    /// `f` receives the current record (if any) and returns the record to
    /// store, or `None` to leave the store untouched. Returns whether a
    /// write happened.
    pub fn update(&self, logical_id: &str, f: impl FnOnce(Option<E>) -> Option<E>) -> StoreResult<bool> {
        let result = self.storage.with_connection(|conn, codec| {
            let id = codec.primary_id(logical_id);
            conn.write(|batch| {
                let current = match batch.get(E::SCHEMA.name, &id)? {
                    Some(stored) => Some(E::from_document(codec.decode(E::SCHEMA, &stored)?)?),
                    None => None,
                };
                let Some(next) = f(current) else {
                    return Ok(false);
                };
                if next.logical_id() != logical_id {
                    return Err(StoreError::invalid_record(
                        E::SCHEMA.name,
                        "update must not change the logical id",
                    ));
                }
                let stored = codec.encode(E::SCHEMA, &next.to_document()?)?;
                batch.put(E::SCHEMA.name, &id, &stored)?;
                Ok(true)
            })
        });
        self.soft("update", result)
    }

    fn matching_documents(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        let result = self.storage.with_connection(|conn, codec| {
            let mut docs = Vec::new();
            for (_, stored) in conn.scan(E::SCHEMA.name)? {
                if filter.matches(index_of::<E>(codec.index_view(E::SCHEMA, &stored))?) {
                    docs.push(codec.decode(E::SCHEMA, &stored)?);
                }
            }
            Ok(docs)
        });
        self.soft("query", result)
    }
}

fn index_of<E: Entity>(
    view: Option<&serde_json::Map<String, serde_json::Value>>,
) -> StoreResult<&serde_json::Map<String, serde_json::Value>> {
    view.ok_or_else(|| {
        StoreError::Decryption(format!("{}: stored document has a missing or incomplete cleartext index", E::SCHEMA.name))
    })
}
