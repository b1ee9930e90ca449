// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Provider Watcher
//!
//! Background task that turns wallet-side changes into [`ProviderEvent`]s.
//! A browser extension pushes `accountsChanged` / `chainChanged`
//! notifications; a wallet reached over HTTP cannot, so the watcher polls
//! `eth_accounts` and `eth_chainId` instead.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 2 s) the watcher:
//! 1. Reads the authorized accounts and the active chain ID.
//! 2. On the first successful read, records a baseline without emitting.
//! 3. Afterwards emits `AccountsChanged` / `ChainChanged` only when a value
//!    differs from the previous read, in that order.
//!
//! Read failures are logged and skipped; the previous baseline is kept.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, and also stops when the
//! receiving side of the event channel is dropped.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ProviderEvent, WalletProvider};

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Polls a wallet provider and forwards account/chain changes.
pub struct ProviderWatcher {
    provider: Arc<dyn WalletProvider>,
    events: mpsc::Sender<ProviderEvent>,
    poll_interval: Duration,
    last_accounts: Option<Vec<Address>>,
    last_chain: Option<u64>,
}

impl ProviderWatcher {
    /// Create a watcher that forwards events into `events`.
    pub fn new(provider: Arc<dyn WalletProvider>, events: mpsc::Sender<ProviderEvent>) -> Self {
        Self {
            provider,
            events,
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_accounts: None,
            last_chain: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the watcher loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(watcher.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Provider watcher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Provider watcher shutting down");
                return;
            }

            if self.poll_step().await.is_err() {
                info!("Provider watcher: event channel closed, stopping");
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Provider watcher shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one poll. Returns `Err` only when the event receiver is gone.
    async fn poll_step(&mut self) -> Result<(), mpsc::error::SendError<ProviderEvent>> {
        match self.provider.accounts().await {
            Ok(accounts) => {
                let changed = self
                    .last_accounts
                    .as_ref()
                    .map(|prev| prev != &accounts)
                    .unwrap_or(false);
                if changed {
                    debug!(count = accounts.len(), "Provider watcher: accounts changed");
                    self.events
                        .send(ProviderEvent::AccountsChanged(accounts.clone()))
                        .await?;
                }
                self.last_accounts = Some(accounts);
            }
            Err(e) => {
                warn!(error = %e, "Provider watcher: failed to read accounts");
            }
        }

        match self.provider.chain_id().await {
            Ok(chain_id) => {
                let changed = self
                    .last_chain
                    .map(|prev| prev != chain_id)
                    .unwrap_or(false);
                if changed {
                    debug!(chain_id, "Provider watcher: chain changed");
                    self.events
                        .send(ProviderEvent::ChainChanged(chain_id))
                        .await?;
                }
                self.last_chain = Some(chain_id);
            }
            Err(e) => {
                warn!(error = %e, "Provider watcher: failed to read chain id");
            }
        }

        Ok(())
    }
}
