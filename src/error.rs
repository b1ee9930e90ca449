// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use rust_decimal::Decimal;

use crate::blockchain::UnitsError;
use crate::provider::ProviderError;
use crate::storage::StorageError;

/// Errors surfaced by the wallet adapter and the presale checkout.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No wallet provider in the environment. Reported, never retried.
    #[error("No wallet provider found. Please install a wallet such as MetaMask.")]
    ProviderUnavailable,

    #[error("Wallet connection request was rejected.")]
    ConnectionRejected,

    /// The user declined a signing, transfer or network prompt.
    #[error("Request was declined in the wallet.")]
    UserRejected,

    #[error("Wallet not connected.")]
    NotConnected,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Chain {0} is not supported.")]
    UnsupportedChain(String),

    #[error("{asset} payments are not supported on {chain}.")]
    UnsupportedAsset { asset: String, chain: String },

    #[error("Minimum purchase amount is ${0}.")]
    BelowMinimum(Decimal),

    #[error("Maximum purchase amount is ${0}.")]
    AboveMaximum(Decimal),

    /// The active chain is no longer the one the transfer was prepared for.
    #[error("Active chain changed to {actual} before the transfer to {expected} was submitted.")]
    ChainMismatch { expected: String, actual: String },

    /// A disconnect happened while the request was in flight.
    #[error("Request was superseded by a disconnect.")]
    Superseded,

    /// Provider rejected or failed to submit a transfer; carries its message.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Wallet provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<UnitsError> for WalletError {
    fn from(e: UnitsError) -> Self {
        WalletError::InvalidAmount(e.to_string())
    }
}

impl WalletError {
    /// Whether the failure was the user saying no.
    pub fn is_user_declined(&self) -> bool {
        matches!(
            self,
            WalletError::ConnectionRejected | WalletError::UserRejected
        )
    }
}
