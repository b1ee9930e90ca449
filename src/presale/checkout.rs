// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Presale Checkout
//!
//! Purchase flow on top of the wallet adapter:
//!
//! 1. Require a connected wallet on a registered chain that accepts the asset.
//! 2. Quote the amount for that chain and enforce the USD limits.
//! 3. Submit the payment to the presale receiving address, refusing it if the
//!    wallet left the quoted chain in the meantime.
//! 4. Record a `Pending` purchase in the ledger and wake the delivery worker.
//!
//! Without a [`DeliveryScheduler`] purchases stay `Pending` until `settle`.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use super::calculator::{PresaleTerms, Quote};
use super::delivery::DeliveryScheduler;
use crate::blockchain::AssetKind;
use crate::error::WalletError;
use crate::storage::{LocalStorage, PurchaseRecord, PurchaseRepository, PurchaseStatus};
use crate::wallet::WalletAdapter;

/// Presale purchase flow for the connected wallet.
pub struct Checkout {
    adapter: Arc<WalletAdapter>,
    storage: Arc<LocalStorage>,
    terms: PresaleTerms,
    delivery: Option<DeliveryScheduler>,
}

impl Checkout {
    pub fn new(adapter: Arc<WalletAdapter>, storage: Arc<LocalStorage>, terms: PresaleTerms) -> Self {
        Self {
            adapter,
            storage,
            terms,
            delivery: None,
        }
    }

    /// Hand recorded purchases to a delivery worker.
    pub fn with_delivery(mut self, delivery: DeliveryScheduler) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn terms(&self) -> &PresaleTerms {
        &self.terms
    }

    /// Preview a purchase on the chain the wallet is on, or on the default
    /// chain while disconnected. Nothing is submitted.
    pub fn preview(&self, asset: AssetKind, amount: &str) -> Result<Quote, WalletError> {
        let chain = self
            .adapter
            .preferred_chain()
            .ok_or_else(|| WalletError::UnsupportedChain("unknown".to_string()))?;
        self.terms.checked_quote(&chain, asset, amount)
    }

    /// Pay `amount` of `asset` and record the purchase.
    pub async fn purchase(
        &self,
        asset: AssetKind,
        amount: &str,
    ) -> Result<PurchaseRecord, WalletError> {
        let session = self.adapter.session();
        let wallet = session.account.ok_or(WalletError::NotConnected)?;
        let chain = session
            .active_chain
            .ok_or_else(|| WalletError::UnsupportedChain("unknown".to_string()))?;
        let currency_symbol = chain
            .asset_symbol(asset)
            .ok_or_else(|| WalletError::UnsupportedAsset {
                asset: format!("{asset:?}"),
                chain: chain.name.to_string(),
            })?;

        let quote = self.terms.checked_quote(&chain, asset, amount)?;
        let destination = self.terms.receiving_address.to_string();

        let transfer = self
            .adapter
            .send_transfer(asset, &destination, amount, Some(chain.chain_id))
            .await?;

        let purchase = PurchaseRecord {
            id: Uuid::new_v4().to_string(),
            created_at: transfer.submitted_at,
            wallet,
            amount: transfer.amount,
            asset,
            currency_symbol: currency_symbol.to_string(),
            usd_value: quote.usd_value,
            tokens: quote.tokens,
            status: PurchaseStatus::Pending,
            explorer_url: Some(chain.tx_url(&transfer.hash)),
            tx_hash: transfer.hash,
            chain_id: transfer.chain_id,
        };

        // The payment is already on its way; a ledger failure must not hide it
        if let Err(e) = PurchaseRepository::new(&self.storage).record(&purchase) {
            error!(
                purchase_id = %purchase.id,
                tx_hash = %purchase.tx_hash,
                error = %e,
                "Failed to record purchase"
            );
        } else {
            info!(
                purchase_id = %purchase.id,
                wallet = %wallet,
                tokens = %purchase.tokens,
                symbol = %self.terms.token_symbol,
                "Purchase submitted"
            );
            if let Some(delivery) = &self.delivery {
                delivery.notify();
            }
        }

        Ok(purchase)
    }

    /// Purchases of the connected wallet, newest first.
    pub fn history(&self) -> Result<Vec<PurchaseRecord>, WalletError> {
        let wallet = self
            .adapter
            .session()
            .account
            .ok_or(WalletError::NotConnected)?;
        Ok(PurchaseRepository::new(&self.storage).list_by_wallet(wallet)?)
    }

    /// Mark a purchase as delivered.
    pub fn settle(&self, purchase_id: &str) -> Result<PurchaseRecord, WalletError> {
        let purchase = PurchaseRepository::new(&self.storage).settle(purchase_id)?;
        info!(purchase_id = %purchase_id, "Purchase settled");
        Ok(purchase)
    }
}
