// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Module
//!
//! - `adapter` - Wallet/network adapter owning the connected session
//! - `session` - Session state and transfer records

pub mod adapter;
pub mod session;

pub use adapter::WalletAdapter;
pub use session::{ConnectionState, Session, TransferRecord};
