// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session key material.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Size of every derived key in bytes.
pub const KEY_SIZE: usize = 32;

const MASTER_KEY_LABEL: &[u8] = b"db_encryption";
const FILE_KEY_LABEL: &[u8] = b"file_encryption";

/// Computes `HMAC-SHA256(key, data)` into a zeroizing buffer.
pub(crate) fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Zeroizing<[u8; KEY_SIZE]> {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; KEY_SIZE]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

// =============================================================================
// Password-derived secret
// =============================================================================

/// Turns the user's password into the 32-byte secret the store keys derive from.
///
/// Secure password handling (stretching, hardware-backed storage) belongs to
/// the caller; the store only needs a deterministic secret.
pub trait SecretDeriver: Send + Sync {
    fn derive_secret(&self, password: &[u8]) -> Zeroizing<[u8; KEY_SIZE]>;
}

/// Default deriver: `SHA-256(password)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256SecretDeriver;

impl SecretDeriver for Sha256SecretDeriver {
    fn derive_secret(&self, password: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; KEY_SIZE]);
        out.copy_from_slice(&Sha256::digest(password));
        out
    }
}

// =============================================================================
// Master key
// =============================================================================

/// Per-session master key: `HMAC-SHA256(secret, "db_encryption")`.
///
/// Wiped when dropped.
#[derive(Clone)]
pub struct MasterKey {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl MasterKey {
    /// Derive the master key from the password-derived secret.
    pub fn derive(secret: &[u8]) -> Self {
        Self {
            key: hmac_sha256(secret, &[MASTER_KEY_LABEL]),
        }
    }

    /// Wrap raw key bytes (tests and key-rotation plumbing).
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(bytes),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Whole-file key for the sealed storage variant: `HMAC-SHA256(secret, "file_encryption")`.
pub(crate) fn derive_file_key(secret: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    hmac_sha256(secret, &[FILE_KEY_LABEL])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_matches_hmac_construction() {
        let secret = [7u8; 32];
        let key = MasterKey::derive(&secret);

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&secret).unwrap();
        mac.update(b"db_encryption");
        let expected = mac.finalize().into_bytes();

        assert_eq!(key.as_bytes().as_slice(), expected.as_slice());
    }

    #[test]
    fn file_key_differs_from_master_key() {
        let secret = [7u8; 32];
        let master = MasterKey::derive(&secret);
        let file = derive_file_key(&secret);
        assert_ne!(master.as_bytes(), &*file);
    }

    #[test]
    fn sha256_deriver_is_deterministic() {
        let deriver = Sha256SecretDeriver;
        let a = deriver.derive_secret(b"correct horse");
        let b = deriver.derive_secret(b"correct horse");
        let c = deriver.derive_secret(b"battery staple");
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn debug_redacts_key() {
        let key = MasterKey::from_bytes([0xAB; 32]);
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("ab"));
    }
}
