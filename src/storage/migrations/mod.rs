// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Versioned schema migrations.
//!
//! The chain is data: [`STEPS`] lists `{from, to, transform}` entries and the
//! driver walks it from the stored version to [`LATEST_VERSION`]. For every
//! step the driver:
//!
//! 1. checks the stored version equals `from` ([`StoreError::InvalidVersion`])
//! 2. closes the connection and copies the file to `backups/`
//! 3. runs the transform and writes `to` in one write transaction
//! 4. compacts the store, best-effort
//!
//! A failed step leaves the store at the last version that fully committed.
//! Fresh stores are stamped with [`LATEST_VERSION`] directly; stores at
//! version 0 take a bootstrap path that drops derived history once and jumps
//! straight to the latest version.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;

use super::codec::{logical_id_of, DocumentCodec};
use super::encrypted_fs::Session;
use super::engine::Batch;
use super::filter::Filter;
use super::schema::{CollectionSchema, Document, ID_FIELD};
use crate::error::{StoreError, StoreResult};

pub mod backup;
mod steps;

pub use backup::{create_backup, list_backups};
pub use steps::STEPS;

/// Schema version written by this build.
pub const LATEST_VERSION: u32 = 10;

// =============================================================================
// Context and results
// =============================================================================

/// Blockchain network the wallet runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Network {
    #[default]
    MainNet,
    TestNet,
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::MainNet),
            "testnet" | "test" => Ok(Network::TestNet),
            other => Err(format!("unknown network `{other}`")),
        }
    }
}

/// When to run the post-migration compaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactionPolicy {
    Always,
    Never,
    /// Compact except on platforms that restrict in-place file rewrites (iOS).
    #[default]
    Platform,
}

impl CompactionPolicy {
    pub fn should_compact(self) -> bool {
        match self {
            CompactionPolicy::Always => true,
            CompactionPolicy::Never => false,
            CompactionPolicy::Platform => std::env::consts::OS != "ios",
        }
    }
}

impl FromStr for CompactionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(CompactionPolicy::Always),
            "never" => Ok(CompactionPolicy::Never),
            "platform" | "auto" => Ok(CompactionPolicy::Platform),
            other => Err(format!("unknown compaction policy `{other}`")),
        }
    }
}

/// Inputs a transform may depend on besides the store content.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationContext {
    pub network: Network,
    pub compaction: CompactionPolicy,
}

/// Follow-up work the account layer must perform after migrating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MigrationAction {
    /// Transaction history was dropped; rescan every currency.
    ReloadTransactions,
    /// Data of one currency was purged; rescan it.
    ReloadCurrency(String),
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationAction::ReloadTransactions => f.write_str("reload-transactions"),
            MigrationAction::ReloadCurrency(code) => write!(f, "reload-currency:{code}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationActions(BTreeSet<MigrationAction>);

impl MigrationActions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(action: MigrationAction) -> Self {
        let mut actions = Self::default();
        actions.insert(action);
        actions
    }

    pub fn insert(&mut self, action: MigrationAction) {
        self.0.insert(action);
    }

    pub fn merge(&mut self, other: MigrationActions) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, action: &MigrationAction) -> bool {
        self.0.contains(action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationAction> {
        self.0.iter()
    }
}

/// What one run of the driver did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Version found on disk, `None` for a fresh store.
    pub from: Option<u32>,
    pub to: u32,
    pub backups: Vec<PathBuf>,
    pub actions: MigrationActions,
}

// =============================================================================
// Steps
// =============================================================================

/// Transform of one migration step.
pub type Transform = fn(&mut MigrationBatch<'_, '_>, &MigrationContext) -> StoreResult<MigrationActions>;

/// One `{from, to, transform}` entry of the chain.
pub struct MigrationStep {
    pub from: u32,
    pub to: u32,
    pub name: &'static str,
    pub transform: Transform,
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("name", &self.name)
            .finish()
    }
}

/// The step starting at `from`, if any.
pub fn step_from(from: u32) -> Option<&'static MigrationStep> {
    STEPS.iter().find(|s| s.from == from)
}

/// Decoded-document view over one in-flight write transaction.
pub struct MigrationBatch<'a, 'b> {
    batch: &'a mut Batch<'b>,
    codec: &'a dyn DocumentCodec,
}

impl<'a, 'b> MigrationBatch<'a, 'b> {
    pub fn new(batch: &'a mut Batch<'b>, codec: &'a dyn DocumentCodec) -> Self {
        Self { batch, codec }
    }

    /// Every record of a collection with its stored primary id.
    pub fn documents(&self, schema: &CollectionSchema) -> StoreResult<Vec<(String, Document)>> {
        self.batch
            .scan(schema.name)?
            .into_iter()
            .map(|(id, stored)| -> StoreResult<(String, Document)> {
                Ok((id, self.codec.decode(schema, &stored)?))
            })
            .collect()
    }

    /// Write a record under the primary id of its `_id`.
    pub fn put(&mut self, schema: &CollectionSchema, doc: &Document) -> StoreResult<()> {
        let id = self.codec.primary_id(logical_id_of(schema, doc)?);
        let stored = self.codec.encode(schema, doc)?;
        self.batch.put(schema.name, &id, &stored)?;
        Ok(())
    }

    pub fn drop_collection(&mut self, schema: &CollectionSchema) -> StoreResult<bool> {
        self.batch.drop_collection(schema.name)
    }

    /// Remove records whose cleartext index matches `filter`, without decrypting.
    pub fn delete_where(&mut self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<usize> {
        filter.validate(schema)?;
        let mut removed = 0;
        for (id, stored) in self.batch.scan(schema.name)? {
            let index = self.codec.index_view(schema, &stored).ok_or_else(|| {
                StoreError::Decryption(format!("{}: stored document has a missing or incomplete cleartext index", schema.name))
            })?;
            if filter.matches(index) {
                self.batch.remove(schema.name, &id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Apply `patch` to every record; records it reports as changed are
    /// rewritten in place. Returns how many changed.
    pub fn update(
        &mut self,
        schema: &CollectionSchema,
        mut patch: impl FnMut(&mut Document) -> bool,
    ) -> StoreResult<usize> {
        let mut changed = 0;
        for (id, mut doc) in self.documents(schema)? {
            if patch(&mut doc) {
                let stored = self.codec.encode(schema, &doc)?;
                self.batch.put(schema.name, &id, &stored)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Move records to a new logical id computed by `new_id`.
    ///
    /// Records whose new id is already held by a record that keeps its id are
    /// dropped; the first record moved onto a free id wins. Returns
    /// `(moved, dropped)`.
    pub fn rekey(
        &mut self,
        schema: &CollectionSchema,
        mut new_id: impl FnMut(&Document) -> Option<String>,
    ) -> StoreResult<(usize, usize)> {
        let docs = self.documents(schema)?;
        let mut moves = Vec::new();
        for (stored_id, doc) in docs {
            let current = logical_id_of(schema, &doc)?.to_string();
            match new_id(&doc) {
                Some(target) if target != current => moves.push((stored_id, target, doc)),
                _ => {}
            }
        }

        for (stored_id, _, _) in &moves {
            self.batch.remove(schema.name, stored_id)?;
        }

        let (mut moved, mut dropped) = (0, 0);
        for (_, target, mut doc) in moves {
            let target_primary = self.codec.primary_id(&target);
            if self.batch.get(schema.name, &target_primary)?.is_some() {
                dropped += 1;
                continue;
            }
            doc.insert(ID_FIELD.to_string(), Value::String(target));
            self.put(schema, &doc)?;
            moved += 1;
        }
        Ok((moved, dropped))
    }
}

// =============================================================================
// Driver
// =============================================================================

fn compact(session: &Session<'_>, ctx: &MigrationContext, version: u32) {
    if !ctx.compaction.should_compact() {
        tracing::warn!(version, os = std::env::consts::OS, "Compaction skipped by policy");
        return;
    }
    let result = session.connect().and_then(|mut conn| conn.compact());
    if let Err(e) = result {
        tracing::error!(version, error = %e, "Compaction failed");
    }
}

/// Apply one step. The store must be at `step.from`.
pub fn run_step(
    session: &Session<'_>,
    step: &MigrationStep,
    ctx: &MigrationContext,
) -> StoreResult<(PathBuf, MigrationActions)> {
    {
        let conn = session.connect()?;
        let found = conn.schema_version()?.unwrap_or(0);
        if found != step.from {
            return Err(StoreError::InvalidVersion {
                expected: step.from,
                found,
            });
        }
    }

    let backup = create_backup(session.paths())?;

    let codec = session.codec();
    let mut conn = session.connect()?;
    let actions = conn.write(|batch| {
        let actions = {
            let mut docs = MigrationBatch::new(batch, codec);
            (step.transform)(&mut docs, ctx)?
        };
        batch.set_schema_version(step.to)?;
        Ok(actions)
    })?;
    drop(conn);

    tracing::info!(from = step.from, to = step.to, step = step.name, "Migration step applied");
    compact(session, ctx, step.to);
    Ok((backup, actions))
}

/// Bring the store up to [`LATEST_VERSION`].
pub fn migrate(session: &Session<'_>, ctx: &MigrationContext) -> StoreResult<MigrationOutcome> {
    let (version, empty) = {
        let conn = session.connect()?;
        (conn.schema_version()?, conn.is_empty()?)
    };

    let current = match version {
        None if empty => {
            session
                .connect()?
                .write(|batch| batch.set_schema_version(LATEST_VERSION))?;
            tracing::info!(version = LATEST_VERSION, "New store stamped");
            return Ok(MigrationOutcome {
                from: None,
                to: LATEST_VERSION,
                ..Default::default()
            });
        }
        None => 0,
        Some(v) if v > LATEST_VERSION => {
            return Err(StoreError::InvalidVersion {
                expected: LATEST_VERSION,
                found: v,
            });
        }
        Some(v) => v,
    };

    let mut outcome = MigrationOutcome {
        from: Some(current),
        to: current,
        ..Default::default()
    };
    if current == LATEST_VERSION {
        return Ok(outcome);
    }

    if current == 0 {
        let (backup, actions) = bootstrap(session, ctx)?;
        outcome.backups.push(backup);
        outcome.actions.merge(actions);
        outcome.to = LATEST_VERSION;
        return Ok(outcome);
    }

    tracing::info!(from = current, to = LATEST_VERSION, "Migrating store");
    for step in STEPS.iter().filter(|s| s.from >= current) {
        let (backup, actions) = run_step(session, step, ctx)?;
        outcome.backups.push(backup);
        outcome.actions.merge(actions);
        outcome.to = step.to;
    }
    Ok(outcome)
}

/// Version 0: run the reload step once and stamp the latest version.
fn bootstrap(session: &Session<'_>, ctx: &MigrationContext) -> StoreResult<(PathBuf, MigrationActions)> {
    let step = step_from(0)
        .ok_or_else(|| StoreError::StoreIo("migration chain has no step from version 0".to_string()))?;

    let backup = create_backup(session.paths())?;
    let codec = session.codec();
    let mut conn = session.connect()?;
    let actions = conn.write(|batch| {
        let actions = {
            let mut docs = MigrationBatch::new(batch, codec);
            (step.transform)(&mut docs, ctx)?
        };
        batch.set_schema_version(LATEST_VERSION)?;
        Ok(actions)
    })?;
    drop(conn);

    tracing::info!(to = LATEST_VERSION, "Bootstrap migration applied");
    compact(session, ctx, LATEST_VERSION);
    Ok((backup, actions))
}
