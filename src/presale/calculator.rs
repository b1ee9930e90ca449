// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Presale Calculator
//!
//! Converts an entered payment amount into its USD value and the number of
//! presale tokens it buys, and enforces the per-purchase USD limits.
//!
//! All arithmetic uses [`Decimal`]; amounts are never routed through `f64`.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::blockchain::{AssetKind, ChainDescriptor};
use crate::error::WalletError;

/// Presale receiving address for all payments.
pub const RECEIVING_ADDRESS: Address =
    alloy::primitives::address!("eD469Cb8d74467aD1c2F566C2067856341e97528");

/// Pricing and limits of the presale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresaleTerms {
    pub token_symbol: String,
    /// USD price of one presale token
    pub token_price_usd: Decimal,
    pub min_purchase_usd: Decimal,
    pub max_purchase_usd: Decimal,
    /// USD price of one unit of the native asset, per chain ID (mock feed).
    /// Native payments on chains missing here are refused.
    pub native_prices_usd: BTreeMap<u64, Decimal>,
    /// USD price of one unit of the stable asset
    pub stable_price_usd: Decimal,
    /// Where payments are sent
    pub receiving_address: Address,
}

impl Default for PresaleTerms {
    fn default() -> Self {
        Self {
            token_symbol: "NOVA".to_string(),
            token_price_usd: Decimal::new(4, 3),
            min_purchase_usd: Decimal::from(10),
            max_purchase_usd: Decimal::from(50_000),
            native_prices_usd: BTreeMap::from([(1, Decimal::from(2_000))]),
            stable_price_usd: Decimal::ONE,
            receiving_address: RECEIVING_ADDRESS,
        }
    }
}

/// Price of a prospective purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub asset: AssetKind,
    /// Chain the price applies to
    pub chain_id: u64,
    /// Amount of the payment asset
    pub amount: Decimal,
    pub usd_value: Decimal,
    /// Presale tokens bought
    pub tokens: Decimal,
}

impl PresaleTerms {
    /// Set the USD price of `chain_id`'s native asset.
    pub fn with_native_price(mut self, chain_id: u64, price_usd: Decimal) -> Self {
        self.native_prices_usd.insert(chain_id, price_usd);
        self
    }

    /// USD price of one unit of `asset` on `chain`, if the presale prices it.
    pub fn price_of(&self, chain: &ChainDescriptor, asset: AssetKind) -> Option<Decimal> {
        match asset {
            AssetKind::Native => self.native_prices_usd.get(&chain.chain_id).copied(),
            AssetKind::Stable => chain.stable_asset.as_ref().map(|_| self.stable_price_usd),
        }
    }

    /// Price `amount` of `asset` on `chain`. Limits are not checked here; see
    /// [`Self::validate`].
    pub fn quote(
        &self,
        chain: &ChainDescriptor,
        asset: AssetKind,
        amount: &str,
    ) -> Result<Quote, WalletError> {
        let price = self
            .price_of(chain, asset)
            .ok_or_else(|| WalletError::UnsupportedAsset {
                asset: chain
                    .asset_symbol(asset)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{asset:?}")),
                chain: chain.name.to_string(),
            })?;

        let trimmed = amount.trim();
        let amount = Decimal::from_str(trimmed)
            .map_err(|e| WalletError::InvalidAmount(format!("{trimmed}: {e}")))?;
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let usd_value = amount
            .checked_mul(price)
            .ok_or_else(|| WalletError::InvalidAmount(format!("{trimmed}: overflow")))?;
        let tokens = usd_value
            .checked_div(self.token_price_usd)
            .ok_or_else(|| WalletError::InvalidAmount(format!("{trimmed}: overflow")))?;

        Ok(Quote {
            asset,
            chain_id: chain.chain_id,
            amount,
            usd_value: usd_value.normalize(),
            tokens: tokens.normalize(),
        })
    }

    /// Enforce the per-purchase USD limits (inclusive).
    pub fn validate(&self, quote: &Quote) -> Result<(), WalletError> {
        if quote.usd_value < self.min_purchase_usd {
            return Err(WalletError::BelowMinimum(self.min_purchase_usd));
        }
        if quote.usd_value > self.max_purchase_usd {
            return Err(WalletError::AboveMaximum(self.max_purchase_usd));
        }
        Ok(())
    }

    /// Quote and validate in one step.
    pub fn checked_quote(
        &self,
        chain: &ChainDescriptor,
        asset: AssetKind,
        amount: &str,
    ) -> Result<Quote, WalletError> {
        let quote = self.quote(chain, asset, amount)?;
        self.validate(&quote)?;
        Ok(quote)
    }
}
