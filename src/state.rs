// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Context
//!
//! The single owned object the host constructs at start-up. It owns the
//! adapter, the local storage and the background tasks:
//!
//! - an event loop feeding provider events into the adapter
//! - a [`ProviderWatcher`] polling the wallet for account/chain changes
//! - a [`DeliveryWorker`] settling pending purchases
//!
//! All of them stop on [`WalletContext::shutdown`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::blockchain::ChainRegistry;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::presale::{Checkout, DeliveryScheduler, DeliveryWorker, PresaleTerms};
use crate::provider::{Eip1193Client, ProviderWatcher, WalletProvider};
use crate::storage::{LocalStorage, StoragePaths};
use crate::wallet::WalletAdapter;

/// Capacity of the provider event channel.
const EVENT_BUFFER: usize = 32;

pub struct WalletContext {
    adapter: Arc<WalletAdapter>,
    storage: Arc<LocalStorage>,
    delivery: DeliveryScheduler,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl WalletContext {
    /// Build the context from configuration, using the default chain
    /// registry.
    pub async fn start(config: &WalletConfig) -> Result<Self, WalletError> {
        let provider: Option<Arc<dyn WalletProvider>> = match &config.provider_url {
            Some(url) => {
                let client = Eip1193Client::new(url)?;
                info!(endpoint = %url, "Using wallet provider");
                Some(Arc::new(client))
            }
            None => {
                warn!("No wallet provider configured");
                None
            }
        };

        Self::with_provider(provider, ChainRegistry::default(), config).await
    }

    /// Build the context around an explicit provider.
    ///
    /// Initializes storage, restores a previous session from the connection
    /// marker, then spawns the background tasks.
    pub async fn with_provider(
        provider: Option<Arc<dyn WalletProvider>>,
        registry: ChainRegistry,
        config: &WalletConfig,
    ) -> Result<Self, WalletError> {
        let mut storage = LocalStorage::new(StoragePaths::new(&config.data_dir));
        storage.initialize()?;
        let storage = Arc::new(storage);

        let adapter = Arc::new(WalletAdapter::new(
            provider.clone(),
            registry,
            storage.clone(),
        ));

        if let Err(e) = adapter.restore().await {
            warn!(error = %e, "Could not restore previous wallet session");
        }

        let shutdown = CancellationToken::new();
        let mut tasks = Vec::new();

        let worker = DeliveryWorker::new(storage.clone(), config.delivery_delay);
        let delivery = worker.scheduler();
        tasks.push(tokio::spawn(worker.run(shutdown.clone())));

        if let Some(provider) = provider {
            let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
            tasks.push(tokio::spawn(
                adapter.clone().run_events(events_rx, shutdown.clone()),
            ));

            let watcher = ProviderWatcher::new(provider, events_tx)
                .with_poll_interval(config.poll_interval);
            tasks.push(tokio::spawn(watcher.run(shutdown.clone())));
        }

        Ok(Self {
            adapter,
            storage,
            delivery,
            shutdown,
            tasks,
        })
    }

    pub fn adapter(&self) -> &Arc<WalletAdapter> {
        &self.adapter
    }

    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    /// Checkout bound to this context's adapter, storage and delivery worker.
    pub fn checkout(&self, terms: PresaleTerms) -> Checkout {
        Checkout::new(self.adapter.clone(), self.storage.clone(), terms)
            .with_delivery(self.delivery.clone())
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Wallet context stopped");
    }
}
