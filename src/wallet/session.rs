// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session state cached by the wallet adapter.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::{short_address, AssetKind, ChainDescriptor};

/// Connection lifecycle of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Account, chain and balance of the current wallet connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: ConnectionState,
    /// Connected account. Set while `Connected`; while `Connecting` it still
    /// holds the previous session's account, if any
    pub account: Option<Address>,
    /// Active chain, present only when it is a registry entry
    pub active_chain: Option<ChainDescriptor>,
    /// Native balance on the active chain as a decimal string
    pub native_balance: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            account: None,
            active_chain: None,
            native_balance: "0".to_string(),
        }
    }
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.account.is_some()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.active_chain.as_ref().map(|c| c.chain_id)
    }

    /// Account for display (`0x1234...abcd`), or `"guest"`.
    pub fn display_name(&self) -> String {
        match (&self.state, &self.account) {
            (ConnectionState::Connected, Some(account)) => short_address(&account.to_string()),
            (ConnectionState::Connecting, _) => "connecting...".to_string(),
            _ => "guest".to_string(),
        }
    }
}

/// A submitted transfer. Never updated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Transaction hash
    pub hash: String,
    /// Sending account
    pub from: Address,
    /// Recipient address
    pub destination: Address,
    /// Amount as entered, in whole units of the asset
    pub amount: String,
    /// Native or stable asset
    pub asset: AssetKind,
    /// Chain the wallet was on when submitting, registered or not
    pub chain_id: u64,
    /// When the wallet accepted the transaction
    pub submitted_at: DateTime<Utc>,
}
