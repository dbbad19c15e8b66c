// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::Value;
use wallet_docstore::crypto::{SecretDeriver, Sha256SecretDeriver};
use wallet_docstore::storage::schema::{CollectionSchema, Document, ID_FIELD};
use wallet_docstore::storage::{DocumentCodec, EncryptedStorage, StoragePaths, StorageVariant};
use wallet_docstore::StoreConfig;

pub const VARIANTS: [StorageVariant; 2] = [StorageVariant::Envelope, StorageVariant::Sealed];

pub fn config(variant: StorageVariant) -> StoreConfig {
    StoreConfig {
        variant,
        ..Default::default()
    }
}

pub fn data_file(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("data.db")
}

/// Storage manager keyed the way `WalletStore::open` keys it.
pub fn raw_storage(path: &Path, variant: StorageVariant, password: &[u8]) -> EncryptedStorage {
    let secret = Sha256SecretDeriver.derive_secret(password);
    EncryptedStorage::new(StoragePaths::new(path), variant, secret.as_slice())
}

/// Write legacy documents straight into the store and stamp `version`.
pub fn seed(
    path: &Path,
    variant: StorageVariant,
    password: &[u8],
    version: u32,
    docs: &[(&CollectionSchema, Value)],
) {
    raw_storage(path, variant, password)
        .with_connection(|conn, codec: &dyn DocumentCodec| {
            conn.write(|batch| {
                for (schema, doc) in docs {
                    let doc = doc.as_object().expect("seed documents are objects");
                    let id = codec.primary_id(doc[ID_FIELD].as_str().expect("seed documents carry _id"));
                    batch.put(schema.name, &id, &codec.encode(schema, doc)?)?;
                }
                batch.set_schema_version(version)
            })
        })
        .unwrap();
}

/// Decoded documents of one collection, sorted by `_id`.
pub fn documents(storage: &EncryptedStorage, schema: &CollectionSchema) -> Vec<Document> {
    let mut docs = storage
        .with_connection(|conn, codec| {
            conn.scan(schema.name)?
                .iter()
                .map(|(_, stored)| codec.decode(schema, stored))
                .collect::<Result<Vec<_>, _>>()
        })
        .unwrap();
    docs.sort_by(|a, b| a[ID_FIELD].as_str().cmp(&b[ID_FIELD].as_str()));
    docs
}

pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d[ID_FIELD].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn schema_version(storage: &EncryptedStorage) -> Option<u32> {
    storage.with_connection(|conn, _| conn.schema_version()).unwrap()
}
