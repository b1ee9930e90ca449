// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Token Delivery
//!
//! Background task that marks purchases delivered once they have been
//! `Pending` for the configured delay (default 30 s).
//!
//! The ledger is the source of truth: each sweep lists pending purchases,
//! settles the ones that are due and sleeps until the next one is. Purchases
//! left pending by a previous run are picked up on the first sweep.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, like the provider watcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{LocalStorage, PurchaseRepository};

/// Wait before retrying after a ledger error.
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Handle that wakes the delivery worker after a purchase is recorded.
#[derive(Debug, Clone)]
pub struct DeliveryScheduler {
    wake: Arc<Notify>,
}

impl DeliveryScheduler {
    /// Ask the worker to re-read the ledger.
    pub fn notify(&self) {
        self.wake.notify_one();
    }
}

/// Settles pending purchases after `delay`.
pub struct DeliveryWorker {
    storage: Arc<LocalStorage>,
    delay: Duration,
    wake: Arc<Notify>,
}

impl DeliveryWorker {
    pub fn new(storage: Arc<LocalStorage>, delay: Duration) -> Self {
        Self {
            storage,
            delay,
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn scheduler(&self) -> DeliveryScheduler {
        DeliveryScheduler {
            wake: self.wake.clone(),
        }
    }

    /// Run until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            delay_ms = self.delay.as_millis() as u64,
            "Token delivery worker starting"
        );

        loop {
            let next = self.sweep();

            let wait = async {
                match next {
                    Some(wait) => tokio::time::sleep(wait).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = wait => {},
                _ = self.wake.notified() => {},
                _ = shutdown.cancelled() => {
                    info!("Token delivery worker shutting down");
                    return;
                }
            }
        }
    }

    /// Settle every due purchase. Returns how long until the next one is due,
    /// or `None` when nothing is pending.
    fn sweep(&self) -> Option<Duration> {
        let repo = PurchaseRepository::new(&self.storage);
        let pending = match repo.list_pending() {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Failed to list pending purchases");
                return Some(RETRY_INTERVAL);
            }
        };

        let now = Utc::now();
        let mut next: Option<Duration> = None;
        for purchase in pending {
            // Timestamps in the future count as just created
            let age = (now - purchase.created_at).to_std().unwrap_or_default();
            let wait = if age >= self.delay {
                match repo.settle(&purchase.id) {
                    Ok(_) => {
                        info!(
                            purchase_id = %purchase.id,
                            tx_hash = %purchase.tx_hash,
                            tokens = %purchase.tokens,
                            "Tokens delivered"
                        );
                        continue;
                    }
                    Err(e) => {
                        warn!(purchase_id = %purchase.id, error = %e, "Failed to settle purchase");
                        RETRY_INTERVAL
                    }
                }
            } else {
                self.delay - age
            };
            next = Some(next.map_or(wait, |n| n.min(wait)));
        }

        if let Some(wait) = next {
            debug!(wait_ms = wait.as_millis() as u64, "Next delivery scheduled");
        }
        next
    }
}
