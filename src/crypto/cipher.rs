// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Document cipher: authenticated encryption of one logical record.
//!
//! ## Envelope Layout
//!
//! ```text
//! id   = hex(BlindIdentifier)
//! data = nonce (12 bytes) || AES-256-GCM ciphertext || tag (16 bytes)
//! ```
//!
//! The record subkey is `HMAC-SHA256(MasterKey, BlindIdentifier)`, so every
//! record is encrypted under its own key. Nonces are drawn from the OS CSPRNG
//! on every call.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::blind::{blind, parse_blind_hex};
use super::keys::{hmac_sha256, MasterKey, KEY_SIZE};
use crate::error::{StoreError, StoreResult};

/// AES-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypted form of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Hex-encoded blind identifier.
    pub id: String,
    /// `nonce || ciphertext`.
    pub data: Vec<u8>,
}

fn record_subkey(master: &MasterKey, blind_id: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    hmac_sha256(master.as_bytes(), &[blind_id])
}

/// A key rejected on the write path is a local fault, not a decryption failure.
fn encryption_cipher(subkey: &[u8]) -> StoreResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(subkey)
        .map_err(|e| StoreError::StoreIo(format!("invalid record key: {e}")))
}

/// Encrypt `plaintext` for the record identified by `logical_id`.
pub fn encrypt(
    master: &MasterKey,
    logical_id: &str,
    plaintext: &[u8],
    associated_data: &[u8],
) -> StoreResult<Envelope> {
    let blind_id = blind(master, logical_id);
    let subkey = record_subkey(master, blind_id.as_slice());
    let cipher = encryption_cipher(subkey.as_slice())?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|_| StoreError::StoreIo("record encryption failed".to_string()))?;

    let mut data = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    data.extend_from_slice(&nonce_bytes);
    data.extend_from_slice(&ciphertext);

    Ok(Envelope {
        id: hex::encode(blind_id.as_slice()),
        data,
    })
}

/// Decrypt an envelope. The envelope id is treated as already blind.
///
/// Fails with [`StoreError::Decryption`] on a wrong key, corrupted data,
/// associated-data mismatch, or a payload shorter than nonce + tag.
pub fn decrypt(
    master: &MasterKey,
    envelope: &Envelope,
    associated_data: &[u8],
) -> StoreResult<Zeroizing<Vec<u8>>> {
    let blind_id = parse_blind_hex(&envelope.id)
        .ok_or_else(|| StoreError::Decryption("malformed envelope id".to_string()))?;

    if envelope.data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(StoreError::Decryption(format!(
            "envelope payload too short: {} bytes",
            envelope.data.len()
        )));
    }

    let subkey = record_subkey(master, blind_id.as_slice());
    let cipher = Aes256Gcm::new_from_slice(subkey.as_slice())
        .map_err(|e| StoreError::Decryption(format!("invalid record key: {e}")))?;

    let (nonce, ciphertext) = envelope.data.split_at(NONCE_SIZE);
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: associated_data,
            },
        )
        .map_err(|_| {
            StoreError::Decryption(
                "authentication failed: wrong key, corrupted data or tampered index".to_string(),
            )
        })?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> MasterKey {
        MasterKey::from_bytes([byte; 32])
    }

    #[test]
    fn round_trip() {
        let k = key(1);
        let env = encrypt(&k, "1abc:BTC", b"{\"balance\":\"1.5\"}", b"BTC:true").unwrap();
        let plain = decrypt(&k, &env, b"BTC:true").unwrap();
        assert_eq!(plain.as_slice(), b"{\"balance\":\"1.5\"}");
    }

    #[test]
    fn envelope_id_is_blind_hex() {
        let k = key(1);
        let env = encrypt(&k, "1abc:BTC", b"x", b"").unwrap();
        assert_eq!(env.id, crate::crypto::blind_hex(&k, "1abc:BTC"));
        assert!(!env.id.contains("1abc"));
    }

    #[test]
    fn associated_data_mismatch_fails() {
        let k = key(1);
        let env = encrypt(&k, "1abc:BTC", b"payload", b"BTC:true").unwrap();
        let result = decrypt(&k, &env, b"BTC:false");
        assert!(matches!(result, Err(StoreError::Decryption(_))));
    }

    #[test]
    fn wrong_master_key_fails() {
        let env = encrypt(&key(1), "1abc:BTC", b"payload", b"BTC").unwrap();
        let result = decrypt(&key(2), &env, b"BTC");
        assert!(matches!(result, Err(StoreError::Decryption(_))));
    }

    #[test]
    fn swapped_id_fails() {
        let k = key(1);
        let mut env = encrypt(&k, "1abc:BTC", b"payload", b"BTC").unwrap();
        env.id = crate::crypto::blind_hex(&k, "2def:BTC");
        assert!(matches!(decrypt(&k, &env, b"BTC"), Err(StoreError::Decryption(_))));
    }

    #[test]
    fn flipped_bit_fails() {
        let k = key(1);
        let mut env = encrypt(&k, "1abc:BTC", b"payload", b"BTC").unwrap();
        let last = env.data.len() - 1;
        env.data[last] ^= 0x01;
        assert!(matches!(decrypt(&k, &env, b"BTC"), Err(StoreError::Decryption(_))));
    }

    #[test]
    fn short_payload_fails() {
        let k = key(1);
        let env = Envelope {
            id: crate::crypto::blind_hex(&k, "x"),
            data: vec![0u8; NONCE_SIZE - 1],
        };
        assert!(matches!(decrypt(&k, &env, b""), Err(StoreError::Decryption(_))));
    }

    #[test]
    fn rejected_write_key_is_an_io_fault() {
        assert!(matches!(encryption_cipher(&[0u8; 5]), Err(StoreError::StoreIo(_))));
        assert!(encryption_cipher(&[0u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn nonces_are_fresh_per_call() {
        let k = key(1);
        let a = encrypt(&k, "same", b"payload", b"").unwrap();
        let b = encrypt(&k, "same", b"payload", b"").unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.data[..NONCE_SIZE], b.data[..NONCE_SIZE]);
        assert_ne!(a.data, b.data);
    }
}
