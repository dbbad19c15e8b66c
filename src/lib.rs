// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet DocStore - encrypted, versioned document store for a
//! non-custodial multi-currency wallet.
//!
//! ## Modules
//!
//! - `crypto` - key derivation, blind identifiers and the record cipher
//! - `storage` - store variants, repositories and schema migrations
//! - `store` - the [`WalletStore`] handle
//! - `state` - async wrapper with cooperative cancellation
//! - `config` - environment configuration

pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use state::AsyncWalletStore;
pub use store::WalletStore;
