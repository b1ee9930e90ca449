// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Provider Port
//!
//! The request surface of an injected (EIP-1193) wallet provider, as consumed
//! by the wallet adapter. The adapter never speaks JSON-RPC itself; it only
//! calls [`WalletProvider`].
//!
//! ## Implementations
//!
//! - [`Eip1193Client`] - wallet reachable over HTTP JSON-RPC (e.g. Frame)
//! - `MockProvider` - scripted in-memory provider for tests
//!
//! Providers cannot push notifications over HTTP, so [`ProviderWatcher`]
//! polls account and chain state and turns changes into [`ProviderEvent`]s.

pub mod eip1193;
#[cfg(test)]
pub mod mock;
pub mod watcher;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::blockchain::AddChainParams;

pub use eip1193::Eip1193Client;
pub use watcher::ProviderWatcher;

/// EIP-1193 code: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;

/// EIP-1193 code: the requested account/method is not authorized.
pub const UNAUTHORIZED: i64 = 4100;

/// EIP-3326 code: the wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// JSON-RPC internal error; some wallets wrap 4902 inside it.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error returned by a wallet provider request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// JSON-RPC / EIP-1193 error code, absent for transport failures
    pub code: Option<i64>,
    /// Message reported by the provider
    pub message: String,
    /// Raw `data` member of the error payload, if any
    pub data: Option<String>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    /// Transport-level failure (no JSON-RPC error payload).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "User rejected the request.")
    }

    pub fn unrecognized_chain(chain_id_hex: &str) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{chain_id_hex}\"."),
        )
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == Some(USER_REJECTED)
    }

    /// Whether the wallet reported the chain as unknown.
    ///
    /// Mobile wallets return `-32603` with the original `4902` nested in
    /// `data.originalError`.
    pub fn is_unrecognized_chain(&self) -> bool {
        match self.code {
            Some(UNRECOGNIZED_CHAIN) => true,
            Some(INTERNAL_ERROR) => self
                .data
                .as_deref()
                .map(|d| d.contains(&UNRECOGNIZED_CHAIN.to_string()))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Notification emitted by the provider outside of any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Authorized accounts changed; empty means the wallet disconnected us.
    AccountsChanged(Vec<Address>),
    /// The wallet's active chain changed.
    ChainChanged(u64),
}

/// Transaction the wallet is asked to sign and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCall {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Option<Bytes>,
}

/// Request surface of an injected wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`: prompts the user for account access.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// `eth_accounts`: currently authorized accounts, no prompt.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// `eth_getBalance` at the latest block, in base units.
    async fn balance(&self, account: Address) -> Result<U256, ProviderError>;

    /// `personal_sign` over UTF-8 text; returns the hex signature.
    async fn sign_message(&self, account: Address, message: &str)
        -> Result<String, ProviderError>;

    /// `eth_sendTransaction`; returns the transaction hash.
    async fn send_transaction(&self, call: TransactionCall) -> Result<B256, ProviderError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError>;
}
