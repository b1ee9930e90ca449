// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Storage Module
//!
//! Durable client-side state, the connector's counterpart of browser local
//! storage. All data lives under one data root (`DATA_DIR`, default
//! `./data`) as small JSON documents.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   session/
//!     connection.json   # "Previously connected" marker + last account
//!   purchases/
//!     {purchase_id}.json
//! ```
//!
//! Writes are atomic (temp file + rename). There is no locking across
//! processes; one connector instance owns a data root.

pub mod local_fs;
pub mod paths;
pub mod repository;

pub use local_fs::{LocalStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    ConnectionMarker, ConnectionRepository, PurchaseRecord, PurchaseRepository, PurchaseStatus,
};
