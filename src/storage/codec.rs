// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mapping between decoded documents and their stored form.
//!
//! Two variants exist and a store file is exactly one of them:
//!
//! - [`StorageVariant::Envelope`]: every record is sealed individually.
//!   Stored shape:
//!
//!   ```text
//!   { "id": hex(blind id), "data": base64(nonce || ciphertext), "index": { cleartext index fields } }
//!   ```
//!
//!   Cleartext index copies are rebuilt into associated data on decrypt and
//!   compared against the decrypted record, so editing them breaks the record.
//!
//! - [`StorageVariant::Sealed`]: the file as a whole is encrypted; records are
//!   stored as plain JSON with `_id` set to the composite logical id.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64ct::{Base64, Encoding};
use serde_json::{json, Map, Value};

use super::schema::{CollectionSchema, Document, ID_FIELD};
use super::sealed::is_sealed_file;
use crate::crypto::{blind_hex, decrypt, encrypt, Envelope, MasterKey};
use crate::error::{StoreError, StoreResult};

/// Logical id of the record used to verify the master key at open.
const KEY_CHECK_ID: &str = "__key_check";
const KEY_CHECK_PLAINTEXT: &[u8] = b"wallet-docstore key check v1";
const KEY_CHECK_AD: &[u8] = b"key_check";

/// Physical layout of one store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageVariant {
    /// Per-record envelopes with blind ids (preferred).
    #[default]
    Envelope,
    /// Whole-file encryption (legacy).
    Sealed,
}

impl StorageVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageVariant::Envelope => "envelope",
            StorageVariant::Sealed => "sealed",
        }
    }

    /// Variant of an existing store file, `None` if there is no file yet.
    pub fn detect(path: &Path) -> StoreResult<Option<StorageVariant>> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        if is_sealed_file(path)? {
            Ok(Some(StorageVariant::Sealed))
        } else {
            Ok(Some(StorageVariant::Envelope))
        }
    }
}

impl fmt::Display for StorageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "envelope" | "a" => Ok(StorageVariant::Envelope),
            "sealed" | "b" => Ok(StorageVariant::Sealed),
            other => Err(format!("unknown storage variant `{other}`")),
        }
    }
}

/// Strategy turning decoded documents into stored documents and back.
pub trait DocumentCodec: Send + Sync {
    fn variant(&self) -> StorageVariant;

    /// On-disk primary id for a logical id.
    fn primary_id(&self, logical_id: &str) -> String;

    /// Encode a decoded document (which must carry `_id`).
    fn encode(&self, schema: &CollectionSchema, doc: &Document) -> StoreResult<Value>;

    /// Decode a stored document back to the record fields plus `_id`.
    fn decode(&self, schema: &CollectionSchema, stored: &Value) -> StoreResult<Document>;

    /// Cleartext fields filters may run on, without decrypting.
    ///
    /// `None` when the stored document carries no usable index for `schema`.
    fn index_view<'a>(&self, schema: &CollectionSchema, stored: &'a Value) -> Option<&'a Map<String, Value>>;
}

/// The `_id` carried by a decoded document.
pub(crate) fn logical_id_of<'a>(schema: &CollectionSchema, doc: &'a Document) -> StoreResult<&'a str> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::invalid_record(schema.name, "document has no string `_id`"))
}

// =============================================================================
// Envelope variant
// =============================================================================

/// Per-record AES-256-GCM envelopes addressed by blind ids.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    master: MasterKey,
}

impl EnvelopeCodec {
    pub fn new(master: MasterKey) -> Self {
        Self { master }
    }

    /// Sealed marker stored in metadata; only the right master key opens it.
    pub fn key_check_record(&self) -> StoreResult<Value> {
        let envelope = encrypt(&self.master, KEY_CHECK_ID, KEY_CHECK_PLAINTEXT, KEY_CHECK_AD)?;
        Ok(json!({
            "id": envelope.id,
            "data": Base64::encode_string(&envelope.data),
        }))
    }

    /// Verify a marker written by [`Self::key_check_record`].
    pub fn verify_key_check(&self, record: &Value) -> StoreResult<()> {
        let envelope = parse_envelope(record)?;
        if envelope.id != blind_hex(&self.master, KEY_CHECK_ID) {
            return Err(StoreError::Decryption("wrong password".to_string()));
        }
        let plaintext = decrypt(&self.master, &envelope, KEY_CHECK_AD)
            .map_err(|_| StoreError::Decryption("wrong password".to_string()))?;
        if plaintext.as_slice() != KEY_CHECK_PLAINTEXT {
            return Err(StoreError::Decryption("key check mismatch".to_string()));
        }
        Ok(())
    }
}

fn parse_envelope(stored: &Value) -> StoreResult<Envelope> {
    let id = stored
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decryption("envelope has no id".to_string()))?;
    let data = stored
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decryption("envelope has no payload".to_string()))?;
    let data = Base64::decode_vec(data)
        .map_err(|_| StoreError::Decryption("envelope payload is not base64".to_string()))?;
    Ok(Envelope {
        id: id.to_string(),
        data,
    })
}

impl DocumentCodec for EnvelopeCodec {
    fn variant(&self) -> StorageVariant {
        StorageVariant::Envelope
    }

    fn primary_id(&self, logical_id: &str) -> String {
        blind_hex(&self.master, logical_id)
    }

    fn encode(&self, schema: &CollectionSchema, doc: &Document) -> StoreResult<Value> {
        let logical_id = logical_id_of(schema, doc)?;
        let index = schema.index_values(doc);
        let associated_data = schema.associated_data(&index);
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(doc)?);

        let envelope = encrypt(&self.master, logical_id, &plaintext, &associated_data)?;
        Ok(json!({
            "id": envelope.id,
            "data": Base64::encode_string(&envelope.data),
            "index": index,
        }))
    }

    fn decode(&self, schema: &CollectionSchema, stored: &Value) -> StoreResult<Document> {
        let envelope = parse_envelope(stored)?;
        let index = self
            .index_view(schema, stored)
            .ok_or_else(|| StoreError::Decryption(format!("{}: envelope index is missing or incomplete", schema.name)))?;

        let plaintext = decrypt(&self.master, &envelope, &schema.associated_data(index))?;
        let doc: Document = serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::invalid_record(schema.name, format!("sealed record is not a JSON object: {e}")))?;

        let logical_id = logical_id_of(schema, &doc)?;
        if self.primary_id(logical_id) != envelope.id {
            return Err(StoreError::Decryption(format!(
                "{}: envelope id does not belong to its record",
                schema.name
            )));
        }

        // Same key set and same values; a dropped field counts as tampering.
        if schema.index_values(&doc) != *index {
            return Err(StoreError::Decryption(format!(
                "{}: cleartext index disagrees with sealed record",
                schema.name
            )));
        }

        Ok(doc)
    }

    fn index_view<'a>(&self, schema: &CollectionSchema, stored: &'a Value) -> Option<&'a Map<String, Value>> {
        // Exactly the declared fields; a dropped key would silently fail every filter on it.
        stored
            .get("index")
            .and_then(Value::as_object)
            .filter(|index| {
                index.len() == schema.index_fields.len()
                    && schema.index_fields.iter().all(|field| index.contains_key(*field))
            })
    }
}

// =============================================================================
// Sealed (plain record) variant
// =============================================================================

/// Records stored as plain JSON inside a whole-file sealed container.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl DocumentCodec for PlainCodec {
    fn variant(&self) -> StorageVariant {
        StorageVariant::Sealed
    }

    fn primary_id(&self, logical_id: &str) -> String {
        logical_id.to_string()
    }

    fn encode(&self, schema: &CollectionSchema, doc: &Document) -> StoreResult<Value> {
        logical_id_of(schema, doc)?;
        Ok(Value::Object(doc.clone()))
    }

    fn decode(&self, schema: &CollectionSchema, stored: &Value) -> StoreResult<Document> {
        let doc = stored
            .as_object()
            .cloned()
            .ok_or_else(|| StoreError::invalid_record(schema.name, "stored document is not an object"))?;
        logical_id_of(schema, &doc)?;
        Ok(doc)
    }

    fn index_view<'a>(&self, _schema: &CollectionSchema, stored: &'a Value) -> Option<&'a Map<String, Value>> {
        stored.as_object()
    }
}
