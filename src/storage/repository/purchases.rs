// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Purchase ledger.
//!
//! One JSON file per presale purchase under `{data}/purchases/`. Records are
//! written as `Pending` when the payment transfer is submitted and moved to
//! `Completed` once tokens are delivered.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::{LocalStorage, StorageError, StorageResult};
use crate::blockchain::AssetKind;

/// Delivery status of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Payment submitted, tokens not yet delivered
    Pending,
    /// Tokens delivered
    Completed,
}

/// A presale purchase stored in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRecord {
    /// Unique purchase identifier (UUID)
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Paying wallet
    pub wallet: Address,
    /// Amount paid, as entered
    pub amount: String,
    pub asset: AssetKind,
    /// Symbol of the paid asset (ETH, BNB, USDT, ...)
    pub currency_symbol: String,
    pub usd_value: Decimal,
    /// Presale tokens bought
    pub tokens: Decimal,
    pub status: PurchaseStatus,
    pub tx_hash: String,
    pub chain_id: u64,
    /// Explorer link for the payment
    pub explorer_url: Option<String>,
}

/// Repository for purchase records.
pub struct PurchaseRepository<'a> {
    storage: &'a LocalStorage,
}

impl<'a> PurchaseRepository<'a> {
    pub fn new(storage: &'a LocalStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, purchase_id: &str) -> bool {
        self.storage.exists(self.storage.paths().purchase(purchase_id))
    }

    pub fn get(&self, purchase_id: &str) -> StorageResult<PurchaseRecord> {
        let path = self.storage.paths().purchase(purchase_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Purchase {purchase_id}")));
        }
        self.storage.read_json(path)
    }

    /// Store a new purchase.
    pub fn record(&self, purchase: &PurchaseRecord) -> StorageResult<()> {
        if self.exists(&purchase.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Purchase {}",
                purchase.id
            )));
        }

        self.storage
            .write_json(self.storage.paths().purchase(&purchase.id), purchase)
    }

    /// Mark a purchase as delivered. Already completed purchases are left as is.
    pub fn settle(&self, purchase_id: &str) -> StorageResult<PurchaseRecord> {
        let mut purchase = self.get(purchase_id)?;
        if purchase.status == PurchaseStatus::Completed {
            return Ok(purchase);
        }

        purchase.status = PurchaseStatus::Completed;
        self.storage
            .write_json(self.storage.paths().purchase(purchase_id), &purchase)?;
        Ok(purchase)
    }

    /// All purchases paid by `wallet`, newest first.
    pub fn list_by_wallet(&self, wallet: Address) -> StorageResult<Vec<PurchaseRecord>> {
        let mut purchases: Vec<PurchaseRecord> = self
            .list_all()?
            .into_iter()
            .filter(|p| p.wallet == wallet)
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(purchases)
    }

    /// Purchases still awaiting delivery, oldest first.
    pub fn list_pending(&self) -> StorageResult<Vec<PurchaseRecord>> {
        let mut purchases: Vec<PurchaseRecord> = self
            .list_all()?
            .into_iter()
            .filter(|p| p.status == PurchaseStatus::Pending)
            .collect();
        purchases.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(purchases)
    }

    fn list_all(&self) -> StorageResult<Vec<PurchaseRecord>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().purchases_dir(), "json")?;

        Ok(ids.iter().filter_map(|id| self.get(id).ok()).collect())
    }
}
