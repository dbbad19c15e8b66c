// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path utilities for the store file and its backups.
//!
//! ```text
//! {root}/
//!   data.db                          # the store file
//!   backups/
//!     data_16102026_142501_042       # one full copy per migration step
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Default store file name inside the data directory.
pub const DATA_FILE_NAME: &str = "data.db";

/// Backup directory name, sibling of the store file.
pub const BACKUPS_DIR_NAME: &str = "backups";

/// Backup file name pattern: `data_<ddMMyyyy_HHmmss_fff>`.
const BACKUP_TIMESTAMP_FORMAT: &str = "%d%m%Y_%H%M%S_%3f";

/// Path utilities for one store file.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    data_file: PathBuf,
}

impl StoragePaths {
    /// Paths for an explicit store file.
    pub fn new(data_file: impl AsRef<Path>) -> Self {
        Self {
            data_file: data_file.as_ref().to_path_buf(),
        }
    }

    /// Paths for the default store file inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(DATA_FILE_NAME))
    }

    /// The store file.
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Directory containing the store file.
    pub fn root(&self) -> &Path {
        self.data_file.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Directory holding pre-migration backups.
    pub fn backups_dir(&self) -> PathBuf {
        self.root().join(BACKUPS_DIR_NAME)
    }

    /// Backup file path for a given instant.
    pub fn backup_file(&self, at: DateTime<Utc>) -> PathBuf {
        self.backups_dir()
            .join(format!("data_{}", at.format(BACKUP_TIMESTAMP_FORMAT)))
    }

    /// Temporary file used while atomically replacing the store file.
    pub fn temp_file(&self) -> PathBuf {
        self.data_file.with_extension("tmp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn in_dir_uses_default_file_name() {
        let paths = StoragePaths::in_dir("/tmp/wallet");
        assert_eq!(paths.data_file(), Path::new("/tmp/wallet/data.db"));
        assert_eq!(paths.root(), Path::new("/tmp/wallet"));
    }

    #[test]
    fn backups_live_next_to_store_file() {
        let paths = StoragePaths::new("/tmp/wallet/custom.db");
        assert_eq!(paths.backups_dir(), PathBuf::from("/tmp/wallet/backups"));
    }

    #[test]
    fn backup_file_name_follows_pattern() {
        let paths = StoragePaths::in_dir("/tmp/wallet");
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 14, 25, 1).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(
            paths.backup_file(at),
            PathBuf::from("/tmp/wallet/backups/data_16102026_142501_042")
        );
    }

    #[test]
    fn temp_file_replaces_extension() {
        let paths = StoragePaths::in_dir("/tmp/wallet");
        assert_eq!(paths.temp_file(), PathBuf::from("/tmp/wallet/data.tmp"));
    }
}
