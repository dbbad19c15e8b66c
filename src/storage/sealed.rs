// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Whole-file sealed container (legacy storage variant).
//!
//! The entire store image (metadata plus every collection) is serialized and
//! encrypted as a single AES-256-GCM blob under a file key derived from the
//! session secret. Records inside are plain JSON documents keyed by their
//! composite string ids.
//!
//! ## File Layout
//!
//! ```text
//! [magic "WDBSEAL1" (8)][nonce (12)][ciphertext || tag]
//! ```
//!
//! The magic is bound as associated data. Writes go to a temp file which is
//! fsynced and renamed over the store file, so a crash leaves either the old
//! or the new image on disk.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use super::paths::StoragePaths;
use crate::crypto::cipher::{NONCE_SIZE, TAG_SIZE};
use crate::crypto::keys::KEY_SIZE;
use crate::error::{StoreError, StoreResult};

/// Magic header identifying a sealed store file.
pub const SEALED_MAGIC: &[u8; 8] = b"WDBSEAL1";

/// Decrypted contents of a sealed store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SealedImage {
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
    #[serde(default)]
    pub collections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Whether the file at `path` starts with the sealed magic header.
pub fn is_sealed_file(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let mut magic = [0u8; 8];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == SEALED_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

fn cipher(file_key: &[u8; KEY_SIZE]) -> StoreResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(file_key)
        .map_err(|e| StoreError::Decryption(format!("invalid file key: {e}")))
}

/// Read and decrypt the image at `path`. Absent or empty files yield an empty image.
pub fn load(path: &Path, file_key: &[u8; KEY_SIZE]) -> StoreResult<SealedImage> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SealedImage::default()),
        Err(e) => return Err(e.into()),
    };
    if raw.is_empty() {
        return Ok(SealedImage::default());
    }

    if raw.len() < SEALED_MAGIC.len() + NONCE_SIZE + TAG_SIZE || &raw[..8] != SEALED_MAGIC {
        return Err(StoreError::Decryption(
            "not a sealed store file".to_string(),
        ));
    }

    let (nonce, ciphertext) = raw[8..].split_at(NONCE_SIZE);
    let plaintext = Zeroizing::new(
        cipher(file_key)?
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: SEALED_MAGIC,
                },
            )
            .map_err(|_| {
                StoreError::Decryption("sealed store did not authenticate: wrong password or corrupted file".to_string())
            })?,
    );

    serde_json::from_slice(&plaintext)
        .map_err(|e| StoreError::Decryption(format!("sealed image is malformed: {e}")))
}

/// Encrypt `image` under `file_key` and atomically replace the store file.
pub fn seal(paths: &StoragePaths, image: &SealedImage, file_key: &[u8; KEY_SIZE]) -> StoreResult<()> {
    let plaintext = Zeroizing::new(serde_json::to_vec(image)?);

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher(file_key)?
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_slice(),
                aad: SEALED_MAGIC,
            },
        )
        .map_err(|_| StoreError::StoreIo("sealing store image failed".to_string()))?;

    if let Some(parent) = paths.data_file().parent() {
        fs::create_dir_all(parent)?;
    }

    // Write to temp file first, then rename for atomicity
    let temp_path = paths.temp_file();
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(SEALED_MAGIC)?;
        file.write_all(&nonce)?;
        file.write_all(&ciphertext)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, paths.data_file())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_image() -> SealedImage {
        let mut image = SealedImage::default();
        image.meta.insert("schema_version".into(), json!(3));
        image
            .collections
            .entry("addresses".into())
            .or_default()
            .insert("1abc:BTC".into(), json!({"_id": "1abc:BTC", "currency": "BTC"}));
        image
    }

    #[test]
    fn seal_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());
        let key = [5u8; KEY_SIZE];

        seal(&paths, &sample_image(), &key).unwrap();
        assert!(is_sealed_file(paths.data_file()).unwrap());

        let loaded = load(paths.data_file(), &key).unwrap();
        assert_eq!(loaded.meta["schema_version"], json!(3));
        assert_eq!(loaded.collections["addresses"].len(), 1);
        assert!(!paths.temp_file().exists());
    }

    #[test]
    fn plaintext_never_hits_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());
        seal(&paths, &sample_image(), &[5u8; KEY_SIZE]).unwrap();

        let raw = fs::read(paths.data_file()).unwrap();
        let needle = b"1abc:BTC";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn wrong_key_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::in_dir(dir.path());
        seal(&paths, &sample_image(), &[5u8; KEY_SIZE]).unwrap();

        let result = load(paths.data_file(), &[6u8; KEY_SIZE]);
        assert!(matches!(result, Err(StoreError::Decryption(_))));
    }

    #[test]
    fn missing_file_is_empty_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let image = load(&path, &[1u8; KEY_SIZE]).unwrap();
        assert!(image.collections.is_empty());
        assert!(!is_sealed_file(&path).unwrap());
    }

    #[test]
    fn non_sealed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.db");
        fs::write(&path, b"redb plain file contents").unwrap();
        assert!(!is_sealed_file(&path).unwrap());
        assert!(matches!(
            load(&path, &[1u8; KEY_SIZE]),
            Err(StoreError::Decryption(_))
        ));
    }
}
