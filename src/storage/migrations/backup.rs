// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pre-migration backups.
//!
//! Each backup is a byte-for-byte copy of the store file taken while no
//! connection is open, so it reopens with the pre-migration password.

use std::fs::{self, File};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::error::{StoreError, StoreResult};
use crate::storage::paths::StoragePaths;

/// Copy the store file to `backups/data_<ddMMyyyy_HHmmss_fff>`.
///
/// Names have millisecond resolution; if one is taken the copy waits for
/// the next millisecond. The copy is fsynced before returning.
pub fn create_backup(paths: &StoragePaths) -> StoreResult<PathBuf> {
    let dir = paths.backups_dir();
    fs::create_dir_all(&dir).map_err(StoreError::Backup)?;

    let target = loop {
        let candidate = paths.backup_file(Utc::now());
        if !candidate.exists() {
            break candidate;
        }
        thread::sleep(Duration::from_millis(1));
    };

    fs::copy(paths.data_file(), &target).map_err(StoreError::Backup)?;
    File::open(&target)
        .and_then(|f| f.sync_all())
        .map_err(StoreError::Backup)?;

    tracing::info!(backup = %target.display(), "Store backup written");
    Ok(target)
}

/// Existing backups, oldest first.
pub fn list_backups(paths: &StoragePaths) -> StoreResult<Vec<PathBuf>> {
    let dir = paths.backups_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            backups.push(entry.path());
        }
    }
    // Names sort by day first, so order by modification time instead.
    backups.sort_by_key(|p| fs::metadata(p).and_then(|m| m.modified()).ok());
    Ok(backups)
}
