// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! "Previously connected" marker.
//!
//! Read once at start-up to decide whether to reconnect silently; written on
//! every successful connect and removed on disconnect.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{LocalStorage, StorageError, StorageResult};

/// Marker persisted after a successful connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionMarker {
    /// Whether the wallet was connected when the app last ran
    pub connected: bool,
    /// Last connected account
    pub address: Option<Address>,
    /// When the marker was written
    pub updated_at: DateTime<Utc>,
}

impl ConnectionMarker {
    pub fn connected(address: Address) -> Self {
        Self {
            connected: true,
            address: Some(address),
            updated_at: Utc::now(),
        }
    }
}

/// Repository for the connection marker.
pub struct ConnectionRepository<'a> {
    storage: &'a LocalStorage,
}

impl<'a> ConnectionRepository<'a> {
    pub fn new(storage: &'a LocalStorage) -> Self {
        Self { storage }
    }

    /// Load the marker, `None` when absent.
    pub fn load(&self) -> StorageResult<Option<ConnectionMarker>> {
        let path = self.storage.paths().connection_marker();
        match self.storage.read_json(path) {
            Ok(marker) => Ok(Some(marker)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, marker: &ConnectionMarker) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().connection_marker(), marker)
    }

    /// Remove the marker. Succeeds when it is already absent.
    pub fn clear(&self) -> StorageResult<()> {
        match self.storage.delete(self.storage.paths().connection_marker()) {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether a silent reconnect should be attempted.
    pub fn was_connected(&self) -> StorageResult<bool> {
        Ok(self.load()?.map(|m| m.connected).unwrap_or(false))
    }
}
