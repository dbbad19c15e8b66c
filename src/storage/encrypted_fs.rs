// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted storage manager: key material plus the per-store lock.
//!
//! ## Security Note
//!
//! Key material is derived once per open from the session secret and kept in
//! `Zeroizing` buffers. Nothing in this module logs keys, secrets or
//! decrypted records.
//!
//! ## Locking
//!
//! Every operation takes the store lock for its whole duration
//! (lock → open connection → read/write → drop connection → unlock). redb
//! refuses a second handle on an open file and the sealed image is not
//! reentrant, so the same lock covers both variants.

use std::sync::{Mutex, MutexGuard};

use zeroize::Zeroizing;

use super::codec::{logical_id_of, DocumentCodec, EnvelopeCodec, PlainCodec, StorageVariant};
use super::engine::Connection;
use super::paths::StoragePaths;
use super::schema::ALL_COLLECTIONS;
use crate::crypto::keys::{derive_file_key, KEY_SIZE};
use crate::crypto::MasterKey;
use crate::error::{StoreError, StoreResult};

/// Metadata key of the master-key check record.
pub const KEY_CHECK_KEY: &str = "key_check";

static PLAIN_CODEC: PlainCodec = PlainCodec;

/// Variant-specific key material.
enum Keys {
    Envelope(EnvelopeCodec),
    Sealed { file_key: Zeroizing<[u8; KEY_SIZE]> },
}

impl Keys {
    fn derive(variant: StorageVariant, secret: &[u8]) -> Self {
        match variant {
            StorageVariant::Envelope => Keys::Envelope(EnvelopeCodec::new(MasterKey::derive(secret))),
            StorageVariant::Sealed => Keys::Sealed {
                file_key: derive_file_key(secret),
            },
        }
    }
}

/// Encrypted storage manager for one store file.
pub struct EncryptedStorage {
    paths: StoragePaths,
    variant: StorageVariant,
    keys: Mutex<Keys>,
}

impl std::fmt::Debug for EncryptedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStorage")
            .field("path", &self.paths.data_file())
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl EncryptedStorage {
    /// Create a storage manager. Touches no files.
    pub fn new(paths: StoragePaths, variant: StorageVariant, secret: &[u8]) -> Self {
        Self {
            paths,
            variant,
            keys: Mutex::new(Keys::derive(variant, secret)),
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn variant(&self) -> StorageVariant {
        self.variant
    }

    /// Acquire the store lock.
    pub fn lock(&self) -> StoreResult<Session<'_>> {
        let keys = self.keys.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(Session {
            paths: &self.paths,
            keys,
        })
    }

    /// Run `f` on a fresh connection while holding the store lock.
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut Connection, &dyn DocumentCodec) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let session = self.lock()?;
        let mut conn = session.connect()?;
        f(&mut conn, session.codec())
    }
}

/// Exclusive access to a store, held for the duration of one operation.
pub struct Session<'a> {
    paths: &'a StoragePaths,
    keys: MutexGuard<'a, Keys>,
}

impl Session<'_> {
    pub fn paths(&self) -> &StoragePaths {
        self.paths
    }

    pub fn codec(&self) -> &dyn DocumentCodec {
        match &*self.keys {
            Keys::Envelope(codec) => codec as &dyn DocumentCodec,
            Keys::Sealed { .. } => &PLAIN_CODEC,
        }
    }

    /// Open a short-lived connection to the store file.
    pub fn connect(&self) -> StoreResult<Connection> {
        match &*self.keys {
            Keys::Envelope(_) => Connection::open_redb(self.paths.data_file()),
            Keys::Sealed { file_key } => Connection::open_sealed(self.paths, file_key.clone()),
        }
    }

    /// Verify the master key against the stored key-check record, creating
    /// the record if the store has none.
    ///
    /// Stores written before the record existed are probed by decrypting one
    /// existing record first. Sealed stores authenticate on connect.
    pub fn ensure_key_check(&self) -> StoreResult<()> {
        let codec = match &*self.keys {
            Keys::Envelope(codec) => codec,
            Keys::Sealed { .. } => {
                self.connect()?;
                return Ok(());
            }
        };

        let mut conn = self.connect()?;
        if let Some(record) = conn.meta(KEY_CHECK_KEY)? {
            return codec.verify_key_check(&record);
        }

        for schema in ALL_COLLECTIONS {
            if let Some((_, stored)) = conn.scan(schema.name)?.into_iter().next() {
                codec.decode(schema, &stored)?;
                break;
            }
        }

        let record = codec.key_check_record()?;
        conn.write(|batch| batch.set_meta(KEY_CHECK_KEY, &record))?;
        tracing::info!(path = %self.paths.data_file().display(), "Key check record created");
        Ok(())
    }

    /// Re-derive all key material from `new_secret` and rewrite the store
    /// under it in one atomic commit.
    ///
    /// Envelope stores re-encrypt every record (blind ids and subkeys both
    /// depend on the master key). Sealed stores re-seal the image under the
    /// new file key.
    pub fn rekey(&mut self, new_secret: &[u8]) -> StoreResult<()> {
        let mut conn = self.connect()?;

        let next = match &*self.keys {
            Keys::Envelope(old) => {
                let new = EnvelopeCodec::new(MasterKey::derive(new_secret));
                let check = new.key_check_record()?;
                let rewritten = conn.write(|batch| {
                    let mut total = 0usize;
                    for schema in ALL_COLLECTIONS {
                        let stored = batch.scan(schema.name)?;
                        if stored.is_empty() {
                            continue;
                        }
                        let docs = stored
                            .iter()
                            .map(|(_, value)| old.decode(schema, value))
                            .collect::<StoreResult<Vec<_>>>()?;

                        batch.drop_collection(schema.name)?;
                        for doc in &docs {
                            let id = new.primary_id(logical_id_of(schema, doc)?);
                            batch.put(schema.name, &id, &new.encode(schema, doc)?)?;
                        }
                        total += docs.len();
                    }
                    batch.set_meta(KEY_CHECK_KEY, &check)?;
                    Ok(total)
                })?;
                tracing::info!(records = rewritten, "Store re-keyed");
                Keys::Envelope(new)
            }
            Keys::Sealed { .. } => {
                let file_key = derive_file_key(new_secret);
                conn.rekey_sealed(file_key.clone())?;
                tracing::info!("Sealed store re-keyed");
                Keys::Sealed { file_key }
            }
        };
        *self.keys = next;
        Ok(())
    }
}
