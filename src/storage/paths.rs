// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the local storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for durable local state.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all local data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Session Paths ==========

    /// Directory holding session state.
    pub fn session_dir(&self) -> PathBuf {
        self.root.join("session")
    }

    /// Path to the "previously connected" marker.
    pub fn connection_marker(&self) -> PathBuf {
        self.session_dir().join("connection.json")
    }

    // ========== Purchase Paths ==========

    /// Directory containing all purchase records.
    pub fn purchases_dir(&self) -> PathBuf {
        self.root.join("purchases")
    }

    /// Path to a specific purchase record.
    pub fn purchase(&self, purchase_id: &str) -> PathBuf {
        self.purchases_dir().join(format!("{purchase_id}.json"))
    }
}
