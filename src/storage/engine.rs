// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Low-level document engine.
//!
//! A [`Connection`] maps named collections to `id -> JSON document` tables
//! and keeps a small metadata map (schema version, key check). It has two
//! physical backings:
//!
//! - **redb**: one table per collection plus a `__meta` table. Documents are
//!   stored as raw JSON bytes; record-level encryption happens above this layer.
//! - **sealed**: the whole image lives in memory and is re-sealed to disk on
//!   every committed write (see [`super::sealed`]).
//!
//! ## Storage Layout (redb)
//!
//! ```text
//! __meta:            key (&str) -> JSON bytes
//! <collection name>: id (&str)  -> JSON document bytes
//! ```
//!
//! All mutations go through [`Connection::write`], which is atomic for both
//! backings: either the whole closure commits or nothing does.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use serde_json::Value;
use zeroize::Zeroizing;

use super::paths::StoragePaths;
use super::schema::ALL_COLLECTIONS;
use super::sealed::{self, SealedImage};
use crate::crypto::keys::KEY_SIZE;
use crate::error::{StoreError, StoreResult};

/// Metadata table name.
const META_TABLE: &str = "__meta";

/// Metadata key holding the schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

fn table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn parse(collection: &str, bytes: &[u8]) -> StoreResult<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::invalid_record(collection, format!("stored bytes are not JSON: {e}")))
}

/// An open store file.
pub enum Connection {
    Redb(Database),
    Sealed {
        paths: StoragePaths,
        image: SealedImage,
        file_key: Zeroizing<[u8; KEY_SIZE]>,
    },
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Redb(_) => f.write_str("Connection::Redb"),
            Connection::Sealed { paths, .. } => f
                .debug_struct("Connection::Sealed")
                .field("path", &paths.data_file())
                .field("file_key", &"[REDACTED]")
                .finish(),
        }
    }
}

impl Connection {
    /// Open (or create) a redb-backed store file.
    pub fn open_redb(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Ok(Connection::Redb(db))
    }

    /// Open (or create) a sealed store file under `file_key`.
    ///
    /// Fails with [`StoreError::Decryption`] if the key does not open the file.
    pub fn open_sealed(paths: &StoragePaths, file_key: Zeroizing<[u8; KEY_SIZE]>) -> StoreResult<Self> {
        let image = sealed::load(paths.data_file(), &file_key)?;
        Ok(Connection::Sealed {
            paths: paths.clone(),
            image,
            file_key,
        })
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Read a metadata value.
    pub fn meta(&self, key: &str) -> StoreResult<Option<Value>> {
        match self {
            Connection::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = match read_txn.open_table(table(META_TABLE)) {
                    Ok(t) => t,
                    Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let value = match table.get(key)? {
                    Some(value) => Some(parse(META_TABLE, value.value())?),
                    None => None,
                };
                Ok(value)
            }
            Connection::Sealed { image, .. } => Ok(image.meta.get(key).cloned()),
        }
    }

    /// Stamped schema version, `None` if the file was never stamped.
    pub fn schema_version(&self) -> StoreResult<Option<u32>> {
        match self.meta(SCHEMA_VERSION_KEY)? {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| StoreError::invalid_record(META_TABLE, "schema version is not a u32")),
        }
    }

    /// Whether no known collection holds any document.
    pub fn is_empty(&self) -> StoreResult<bool> {
        for schema in ALL_COLLECTIONS {
            if self.count(schema.name)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch one stored document by primary id.
    pub fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        match self {
            Connection::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = match read_txn.open_table(table(collection)) {
                    Ok(t) => t,
                    Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let value = match table.get(id)? {
                    Some(value) => Some(parse(collection, value.value())?),
                    None => None,
                };
                Ok(value)
            }
            Connection::Sealed { image, .. } => Ok(image
                .collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .cloned()),
        }
    }

    /// All stored documents of a collection in primary-id order.
    pub fn scan(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        match self {
            Connection::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = match read_txn.open_table(table(collection)) {
                    Ok(t) => t,
                    Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                    Err(e) => return Err(e.into()),
                };
                let mut docs = Vec::new();
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    docs.push((key.value().to_string(), parse(collection, value.value())?));
                }
                Ok(docs)
            }
            Connection::Sealed { image, .. } => Ok(image
                .collections
                .get(collection)
                .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default()),
        }
    }

    /// Number of stored documents in a collection.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        match self {
            Connection::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = match read_txn.open_table(table(collection)) {
                    Ok(t) => t,
                    Err(TableError::TableDoesNotExist(_)) => return Ok(0),
                    Err(e) => return Err(e.into()),
                };
                let mut n = 0;
                for entry in table.iter()? {
                    entry?;
                    n += 1;
                }
                Ok(n)
            }
            Connection::Sealed { image, .. } => {
                Ok(image.collections.get(collection).map_or(0, |docs| docs.len()))
            }
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Run `f` inside one atomic write transaction.
    ///
    /// If `f` returns an error nothing is committed.
    pub fn write<R>(&mut self, f: impl FnOnce(&mut Batch<'_>) -> StoreResult<R>) -> StoreResult<R> {
        match self {
            Connection::Redb(db) => {
                let write_txn = db.begin_write()?;
                let result = {
                    let mut batch = Batch::Redb(&write_txn);
                    f(&mut batch)
                };
                match result {
                    Ok(value) => {
                        write_txn.commit()?;
                        Ok(value)
                    }
                    Err(e) => {
                        write_txn.abort()?;
                        Err(e)
                    }
                }
            }
            Connection::Sealed {
                paths,
                image,
                file_key,
            } => {
                let mut staged = image.clone();
                let value = f(&mut Batch::Sealed(&mut staged))?;
                sealed::seal(paths, &staged, file_key)?;
                *image = staged;
                Ok(value)
            }
        }
    }

    /// Replace the file key of a sealed connection and re-seal under it.
    pub fn rekey_sealed(&mut self, new_key: Zeroizing<[u8; KEY_SIZE]>) -> StoreResult<()> {
        match self {
            Connection::Sealed {
                paths,
                image,
                file_key,
            } => {
                sealed::seal(paths, image, &new_key)?;
                *file_key = new_key;
                Ok(())
            }
            Connection::Redb(_) => Err(StoreError::StoreIo(
                "cannot re-key the file of a record-encrypted store".to_string(),
            )),
        }
    }

    /// Reclaim free space ("shrink").
    ///
    /// redb compacts in place; a sealed image is rewritten under a fresh nonce.
    pub fn compact(&mut self) -> StoreResult<bool> {
        match self {
            Connection::Redb(db) => Ok(db.compact()?),
            Connection::Sealed {
                paths,
                image,
                file_key,
            } => {
                sealed::seal(paths, image, file_key)?;
                Ok(true)
            }
        }
    }
}

// =============================================================================
// Write batch
// =============================================================================

/// Mutable view over one in-flight write transaction.
pub enum Batch<'a> {
    Redb(&'a redb::WriteTransaction),
    Sealed(&'a mut SealedImage),
}

impl Batch<'_> {
    pub fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        match self {
            Batch::Redb(txn) => {
                let table = txn.open_table(table(collection))?;
                let value = match table.get(id)? {
                    Some(value) => Some(parse(collection, value.value())?),
                    None => None,
                };
                Ok(value)
            }
            Batch::Sealed(image) => Ok(image
                .collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .cloned()),
        }
    }

    pub fn scan(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        match self {
            Batch::Redb(txn) => {
                let table = txn.open_table(table(collection))?;
                let mut docs = Vec::new();
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    docs.push((key.value().to_string(), parse(collection, value.value())?));
                }
                Ok(docs)
            }
            Batch::Sealed(image) => Ok(image
                .collections
                .get(collection)
                .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default()),
        }
    }

    /// Insert or replace a document. Returns whether one was replaced.
    pub fn put(&mut self, collection: &str, id: &str, doc: &Value) -> StoreResult<bool> {
        match self {
            Batch::Redb(txn) => {
                let bytes = serde_json::to_vec(doc)?;
                let mut table = txn.open_table(table(collection))?;
                let replaced = table.insert(id, bytes.as_slice())?.is_some();
                Ok(replaced)
            }
            Batch::Sealed(image) => Ok(image
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), doc.clone())
                .is_some()),
        }
    }

    /// Remove a document. Returns whether it existed.
    pub fn remove(&mut self, collection: &str, id: &str) -> StoreResult<bool> {
        match self {
            Batch::Redb(txn) => {
                let mut table = txn.open_table(table(collection))?;
                let removed = table.remove(id)?.is_some();
                Ok(removed)
            }
            Batch::Sealed(image) => Ok(image
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .is_some()),
        }
    }

    /// Drop a whole collection. Returns whether it existed.
    pub fn drop_collection(&mut self, collection: &str) -> StoreResult<bool> {
        match self {
            Batch::Redb(txn) => Ok(txn.delete_table(table(collection))?),
            Batch::Sealed(image) => Ok(image.collections.remove(collection).is_some()),
        }
    }

    pub fn meta(&self, key: &str) -> StoreResult<Option<Value>> {
        match self {
            Batch::Redb(txn) => {
                let table = txn.open_table(table(META_TABLE))?;
                let value = match table.get(key)? {
                    Some(value) => Some(parse(META_TABLE, value.value())?),
                    None => None,
                };
                Ok(value)
            }
            Batch::Sealed(image) => Ok(image.meta.get(key).cloned()),
        }
    }

    pub fn set_meta(&mut self, key: &str, value: &Value) -> StoreResult<()> {
        match self {
            Batch::Redb(txn) => {
                let bytes = serde_json::to_vec(value)?;
                let mut table = txn.open_table(table(META_TABLE))?;
                table.insert(key, bytes.as_slice())?;
                Ok(())
            }
            Batch::Sealed(image) => {
                image.meta.insert(key.to_string(), value.clone());
                Ok(())
            }
        }
    }

    pub fn set_schema_version(&mut self, version: u32) -> StoreResult<()> {
        self.set_meta(SCHEMA_VERSION_KEY, &Value::from(version))
    }
}
