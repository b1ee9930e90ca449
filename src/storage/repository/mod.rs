// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to local storage.

pub mod connection;
pub mod purchases;

pub use connection::{ConnectionMarker, ConnectionRepository};
pub use purchases::{PurchaseRecord, PurchaseRepository, PurchaseStatus};
