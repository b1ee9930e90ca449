// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NOVA Presale Wallet - Wallet/Network Connector
//!
//! Bridges the NOVA token presale front end to a single EIP-1193 wallet
//! provider: connection, balance, signing, transfers and network switching,
//! with the session kept in sync with provider events.
//!
//! ## Modules
//!
//! - `blockchain` - Chain registry, unit conversion, ERC-20 calldata
//! - `provider` - Wallet provider port, HTTP JSON-RPC client, event watcher
//! - `wallet` - Wallet/network adapter and session state
//! - `presale` - Purchase calculator and checkout flow
//! - `storage` - Durable local state (connection marker, purchase ledger)
//! - `state` - Context owning the adapter and background tasks

pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod presale;
pub mod provider;
pub mod state;
pub mod storage;
pub mod wallet;

pub use error::WalletError;
pub use state::WalletContext;
pub use wallet::{Session, WalletAdapter};
