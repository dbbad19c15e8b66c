// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record-Level Cryptography
//!
//! Key hierarchy used by the envelope storage variant:
//!
//! ```text
//! password ──SecretDeriver──▶ secret (32 bytes)
//! secret   ──HMAC("db_encryption")──▶ MasterKey
//! MasterKey ──HMAC("id" || logical_id)──▶ BlindIdentifier (hex = on-disk id)
//! MasterKey ──HMAC(BlindIdentifier)──▶ RecordSubkey ──AES-256-GCM──▶ envelope
//! ```
//!
//! All key material lives in `Zeroizing` buffers and is wiped on drop,
//! including on error paths.

pub mod blind;
pub mod cipher;
pub mod keys;

pub use blind::{blind, blind_hex, BLIND_ID_SIZE};
pub use cipher::{decrypt, encrypt, Envelope, NONCE_SIZE};
pub use keys::{MasterKey, SecretDeriver, Sha256SecretDeriver};
