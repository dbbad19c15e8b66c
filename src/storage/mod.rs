// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encrypted Storage Module
//!
//! One wallet store is one file, holding a schema version plus a collection
//! per record kind. Two on-disk variants sit behind the same repositories:
//!
//! - **Envelope**: a plain redb file whose values are per-record AES-256-GCM
//!   envelopes keyed by blind identifiers. Only declared index fields are
//!   left in cleartext.
//! - **Sealed**: the whole store image encrypted under one file key. Record
//!   ids are plain composite strings inside the image.
//!
//! ## Storage Layout
//!
//! ```text
//! {data_dir}/
//!   data.db                          # the store file
//!   backups/
//!     data_{ddMMyyyy_HHmmss_fff}     # pre-migration copies
//! ```
//!
//! ## Security Model
//!
//! - Keys derive from the password secret and never touch disk
//! - Record contents and ids are never written in cleartext
//! - Cleartext index fields are bound into each record's associated data
//! - A wrong password fails at open, before any record is returned

pub mod codec;
pub mod encrypted_fs;
pub mod engine;
pub mod filter;
pub mod migrations;
pub mod paths;
pub mod repository;
pub mod schema;
pub mod sealed;

pub use codec::{DocumentCodec, StorageVariant};
pub use encrypted_fs::{EncryptedStorage, Session};
pub use filter::Filter;
pub use migrations::{
    CompactionPolicy, MigrationAction, MigrationActions, MigrationContext, MigrationOutcome, Network,
    LATEST_VERSION,
};
pub use paths::StoragePaths;
pub use repository::{
    AddressRepository, OrderRepository, OutputRepository, Query, Repository, SwapRepository,
    TokenBalanceRepository, TokenContractRepository, TokenTransferRepository, TransactionRepository,
};
pub use schema::{CollectionSchema, Document, Entity};
