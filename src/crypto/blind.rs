// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blind identifiers.
//!
//! A blind identifier hides a record's logical key (e.g. `"1abc:BTC"`) from
//! anyone reading the store file, while staying deterministic so point lookups
//! and idempotent upserts never need a table scan:
//!
//! `HMAC-SHA256(MasterKey, "id" || logical_id)`

use zeroize::Zeroizing;

use super::keys::{hmac_sha256, MasterKey, KEY_SIZE};

/// Blind identifier size in bytes.
pub const BLIND_ID_SIZE: usize = KEY_SIZE;

const BLIND_ID_PREFIX: &[u8] = b"id";

/// Blind a logical identifier under the session master key.
///
/// The bytes also key the record subkey derivation, so they are wiped on drop.
pub fn blind(master: &MasterKey, logical_id: &str) -> Zeroizing<[u8; BLIND_ID_SIZE]> {
    hmac_sha256(master.as_bytes(), &[BLIND_ID_PREFIX, logical_id.as_bytes()])
}

/// Hex form of [`blind`], used as the primary key on disk.
pub fn blind_hex(master: &MasterKey, logical_id: &str) -> String {
    hex::encode(blind(master, logical_id).as_slice())
}

/// Parse an on-disk identifier back into raw blind bytes.
pub(crate) fn parse_blind_hex(id: &str) -> Option<Zeroizing<[u8; BLIND_ID_SIZE]>> {
    let mut out = Zeroizing::new([0u8; BLIND_ID_SIZE]);
    hex::decode_to_slice(id, out.as_mut_slice()).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(byte: u8) -> MasterKey {
        MasterKey::from_bytes([byte; 32])
    }

    #[test]
    fn blind_is_deterministic() {
        let k = key(1);
        assert_eq!(*blind(&k, "1abc:BTC"), *blind(&k, "1abc:BTC"));
        assert_eq!(blind_hex(&k, "1abc:BTC").len(), BLIND_ID_SIZE * 2);
    }

    #[test]
    fn blind_depends_on_master_key() {
        assert_ne!(*blind(&key(1), "1abc:BTC"), *blind(&key(2), "1abc:BTC"));
    }

    #[test]
    fn blind_has_no_collisions_over_large_sample() {
        let k = key(9);
        let mut seen = HashSet::new();
        for i in 0..20_000 {
            let id = format!("addr{i}:BTC");
            assert!(seen.insert(*blind(&k, &id)), "collision at {id}");
        }
    }

    #[test]
    fn hex_round_trips_through_parser() {
        let k = key(3);
        let hex_id = blind_hex(&k, "ETH:0xdead");
        let parsed = parse_blind_hex(&hex_id).unwrap();
        assert_eq!(*parsed, *blind(&k, "ETH:0xdead"));
    }

    #[test]
    fn blind_bytes_are_wiped_on_drop() {
        let k = key(4);
        let id: Zeroizing<[u8; BLIND_ID_SIZE]> = blind(&k, "LTC:abc");
        assert_eq!(hex::encode(id.as_slice()), blind_hex(&k, "LTC:abc"));
    }

    #[test]
    fn parser_rejects_garbage() {
        assert!(parse_blind_hex("not-hex").is_none());
        assert!(parse_blind_hex("abcd").is_none());
    }
}
