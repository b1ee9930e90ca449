// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet/Network Adapter
//!
//! The single bridge between the presale front end and one injected wallet
//! provider. It owns the [`Session`] and is the only writer of it; consumers
//! read snapshots or subscribe to a `watch` channel.
//!
//! ## Request serialization
//!
//! `connect`, `switch_network`, transfers and provider-event handling share a
//! single in-flight guard. An overlapping request waits until the previous one
//! has finished, so two requests never interleave their session updates.
//!
//! `disconnect` is synchronous and never waits. It bumps a disconnect epoch;
//! a request that started under an older epoch does not write its result
//! back, so a disconnect is never undone by a request that was in flight.
//!
//! ## Failure model
//!
//! The session is written only once an operation's success path completes.
//! Nothing is retried here; retry is the caller's decision.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{ConnectionState, Session, TransferRecord};
use crate::blockchain::{
    chain_id_hex, erc20, format_amount, parse_amount, AssetKind, ChainDescriptor, ChainRegistry,
};
use crate::error::WalletError;
use crate::provider::{ProviderError, ProviderEvent, TransactionCall, WalletProvider};
use crate::storage::{ConnectionMarker, ConnectionRepository, LocalStorage};

/// Decimals assumed for the native asset of a chain outside the registry.
const DEFAULT_NATIVE_DECIMALS: u8 = 18;

/// Map a provider failure on a user-facing prompt.
fn declined_or_provider(err: ProviderError) -> WalletError {
    if err.is_user_rejected() {
        WalletError::UserRejected
    } else {
        WalletError::Provider(err)
    }
}

fn format_native(balance: U256, chain: Option<&ChainDescriptor>) -> String {
    let decimals = chain
        .map(|c| c.native_decimals)
        .unwrap_or(DEFAULT_NATIVE_DECIMALS);
    format_amount(balance, decimals)
}

fn parse_destination(destination: &str) -> Result<Address, WalletError> {
    Address::from_str(destination.trim())
        .map_err(|e| WalletError::InvalidAddress(format!("{destination}: {e}")))
}

/// Wallet/network adapter over a single wallet provider.
pub struct WalletAdapter {
    provider: Option<Arc<dyn WalletProvider>>,
    registry: ChainRegistry,
    storage: Arc<LocalStorage>,
    session: watch::Sender<Session>,
    in_flight: Mutex<()>,
    /// Bumped by every `disconnect`; only changed under the session lock
    epoch: AtomicU64,
}

impl std::fmt::Debug for WalletAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletAdapter")
            .field("has_provider", &self.provider.is_some())
            .field("session", &*self.session.borrow())
            .finish()
    }
}

impl WalletAdapter {
    /// Create an adapter. `provider` is `None` when the environment has no
    /// wallet; every provider-backed operation then fails with
    /// [`WalletError::ProviderUnavailable`].
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        registry: ChainRegistry,
        storage: Arc<LocalStorage>,
    ) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            provider,
            registry,
            storage,
            session,
            in_flight: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Receiver that observes every session update.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Cached native balance of the connected account.
    pub fn balance(&self) -> String {
        self.session.borrow().native_balance.clone()
    }

    /// Chain to present to the user: the active chain, or the registry's
    /// default while nothing is connected. `None` when a connected wallet
    /// sits on an unsupported chain.
    pub fn preferred_chain(&self) -> Option<ChainDescriptor> {
        let session = self.session.borrow();
        match (&session.active_chain, session.account) {
            (Some(chain), _) => Some(chain.clone()),
            (None, None) => self.registry.default_chain().cloned(),
            (None, Some(_)) => None,
        }
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>, WalletError> {
        self.provider.as_ref().ok_or(WalletError::ProviderUnavailable)
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Apply `update` unless a disconnect happened since `epoch` was read.
    fn update_if_current<F>(&self, epoch: u64, update: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        self.session.send_if_modified(|s| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            update(s);
            true
        })
    }

    // ========== Connection ==========

    /// Request account access and populate the session.
    ///
    /// Fails with [`WalletError::Superseded`] if `disconnect` is called while
    /// the request is in flight; the disconnect stands.
    pub async fn connect(&self) -> Result<Session, WalletError> {
        let provider = self.provider()?.clone();
        let _guard = self.in_flight.lock().await;

        let epoch = self.current_epoch();
        let previous = self.session();
        self.update_if_current(epoch, |s| s.state = ConnectionState::Connecting);

        match self.establish(provider.as_ref(), None).await {
            Ok(session) => {
                if self.commit_connected(epoch, session.clone()) {
                    Ok(session)
                } else {
                    info!("Disconnected while connecting, discarding connection");
                    Err(WalletError::Superseded)
                }
            }
            Err(e) => {
                self.update_if_current(epoch, |s| *s = previous);
                warn!(error = %e, "Wallet connection failed");
                Err(e)
            }
        }
    }

    /// Clear the session and the "previously connected" marker. Idempotent.
    pub fn disconnect(&self) {
        let mut was_connected = false;
        // Marker and session change under the session lock so they order
        // with `commit_connected`
        self.session.send_modify(|s| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            was_connected = s.account.is_some();
            *s = Session::default();

            if let Err(e) = ConnectionRepository::new(&self.storage).clear() {
                warn!(error = %e, "Failed to clear connection marker");
            }
        });

        if was_connected {
            info!("Wallet disconnected");
        }
    }

    /// Reconnect silently if the previous run left a connection marker.
    ///
    /// Returns whether a session was restored. A rejected reconnect clears the
    /// marker so the next start does not prompt again.
    pub async fn restore(&self) -> Result<bool, WalletError> {
        if self.provider.is_none() {
            debug!("No wallet provider, skipping session restore");
            return Ok(false);
        }

        let was_connected = match ConnectionRepository::new(&self.storage).was_connected() {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "Unreadable connection marker, ignoring");
                false
            }
        };
        if !was_connected {
            return Ok(false);
        }

        match self.connect().await {
            Ok(session) => {
                info!(account = ?session.account, "Restored previous wallet session");
                Ok(true)
            }
            Err(WalletError::ConnectionRejected) => {
                self.disconnect();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Build a connected session for `account`, or for the account the
    /// wallet grants when `account` is `None`.
    async fn establish(
        &self,
        provider: &dyn WalletProvider,
        account: Option<Address>,
    ) -> Result<Session, WalletError> {
        let account = match account {
            Some(account) => account,
            None => {
                let accounts = provider.request_accounts().await.map_err(|e| {
                    if e.is_user_rejected() {
                        WalletError::ConnectionRejected
                    } else {
                        WalletError::Provider(e)
                    }
                })?;
                accounts
                    .first()
                    .copied()
                    .ok_or(WalletError::ConnectionRejected)?
            }
        };

        let chain_id = provider.chain_id().await?;
        let active_chain = self.registry.get(chain_id).cloned();
        if active_chain.is_none() {
            warn!(chain_id = %chain_id_hex(chain_id), "Wallet is on an unsupported chain");
        }

        let balance = provider.balance(account).await?;

        Ok(Session {
            state: ConnectionState::Connected,
            account: Some(account),
            native_balance: format_native(balance, active_chain.as_ref()),
            active_chain,
        })
    }

    /// Publish a connected session and persist the marker. Returns `false`
    /// without writing anything if a disconnect happened since `epoch`.
    fn commit_connected(&self, epoch: u64, session: Session) -> bool {
        let Some(account) = session.account else {
            return false;
        };

        let committed = self.update_if_current(epoch, |s| {
            *s = session;
            if let Err(e) =
                ConnectionRepository::new(&self.storage).save(&ConnectionMarker::connected(account))
            {
                warn!(error = %e, "Failed to persist connection marker");
            }
        });
        if committed {
            info!(account = %account, "Wallet connected");
        }
        committed
    }

    // ========== Balance ==========

    /// Re-read the native balance of the connected account.
    pub async fn refresh_balance(&self) -> Result<String, WalletError> {
        let epoch = self.current_epoch();
        let account = self.session().account.ok_or(WalletError::NotConnected)?;
        let provider = self.provider()?;

        let balance = provider.balance(account).await?;
        let mut formatted = String::new();
        self.update_if_current(epoch, |s| {
            // Skip if the account changed while the request was in flight
            if s.account == Some(account) {
                formatted = format_native(balance, s.active_chain.as_ref());
                s.native_balance = formatted.clone();
            }
        });
        Ok(formatted)
    }

    async fn refresh_balance_logged(&self) {
        if let Err(e) = self.refresh_balance().await {
            warn!(error = %e, "Failed to refresh wallet balance");
        }
    }

    // ========== Signing & Transfers ==========

    /// Ask the connected account to sign `message` (`personal_sign`).
    pub async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let account = self.session().account.ok_or(WalletError::NotConnected)?;
        let provider = self.provider()?;

        provider
            .sign_message(account, message)
            .await
            .map_err(declined_or_provider)
    }

    /// Submit a native-asset transfer of `amount` (whole units, e.g. `"0.05"`)
    /// to `destination`.
    ///
    /// Business limits (minimum/maximum purchase) are the caller's job; this
    /// only rejects amounts that are not a positive decimal.
    pub async fn send_native_transfer(
        &self,
        destination: &str,
        amount: &str,
    ) -> Result<TransferRecord, WalletError> {
        self.send_transfer(AssetKind::Native, destination, amount, None)
            .await
    }

    /// Submit a stable-asset (ERC-20) transfer on the active chain.
    pub async fn send_stable_transfer(
        &self,
        destination: &str,
        amount: &str,
    ) -> Result<TransferRecord, WalletError> {
        self.send_transfer(AssetKind::Stable, destination, amount, None)
            .await
    }

    /// Submit a transfer of `asset`.
    ///
    /// With `expected_chain` set, the transfer is refused with
    /// [`WalletError::ChainMismatch`] unless that chain is still active once
    /// the request is running, so a price quoted for one chain is never paid
    /// on another.
    pub async fn send_transfer(
        &self,
        asset: AssetKind,
        destination: &str,
        amount: &str,
        expected_chain: Option<u64>,
    ) -> Result<TransferRecord, WalletError> {
        let _guard = self.in_flight.lock().await;
        let session = self.session();
        let from = session.account.ok_or(WalletError::NotConnected)?;

        if let Some(expected) = expected_chain {
            if session.chain_id() != Some(expected) {
                return Err(WalletError::ChainMismatch {
                    expected: chain_id_hex(expected),
                    actual: session
                        .active_chain
                        .as_ref()
                        .map(|c| c.name.to_string())
                        .unwrap_or_else(|| "an unsupported chain".to_string()),
                });
            }
        }

        let to = parse_destination(destination)?;
        let call = match asset {
            AssetKind::Native => {
                let decimals = session
                    .active_chain
                    .as_ref()
                    .map(|c| c.native_decimals)
                    .unwrap_or(DEFAULT_NATIVE_DECIMALS);
                TransactionCall {
                    from,
                    to,
                    value: parse_amount(amount, decimals)?,
                    data: None,
                }
            }
            AssetKind::Stable => {
                let chain = session
                    .active_chain
                    .as_ref()
                    .ok_or_else(|| WalletError::UnsupportedChain("unknown".to_string()))?;
                let stable = chain
                    .stable_asset
                    .as_ref()
                    .ok_or_else(|| WalletError::UnsupportedAsset {
                        asset: "Stable asset".to_string(),
                        chain: chain.name.to_string(),
                    })?;
                let token = Address::from_str(stable.contract_address).map_err(|e| {
                    WalletError::InvalidAddress(format!("{}: {e}", stable.contract_address))
                })?;
                let value = parse_amount(amount, stable.decimals)?;
                TransactionCall {
                    from,
                    to: token,
                    value: U256::ZERO,
                    data: Some(erc20::transfer_calldata(to, value)),
                }
            }
        };

        let provider = self.provider()?;
        let chain_id = match session.chain_id() {
            Some(id) => id,
            None => provider.chain_id().await?,
        };
        self.submit_transfer(provider.as_ref(), call, to, amount, asset, chain_id)
            .await
    }

    async fn submit_transfer(
        &self,
        provider: &dyn WalletProvider,
        call: TransactionCall,
        destination: Address,
        amount: &str,
        asset: AssetKind,
        chain_id: u64,
    ) -> Result<TransferRecord, WalletError> {
        let from = call.from;

        let hash = provider.send_transaction(call).await.map_err(|e| {
            warn!(error = %e, code = ?e.code, "Transfer submission failed");
            if e.is_user_rejected() {
                WalletError::UserRejected
            } else {
                WalletError::TransferFailed(e.message)
            }
        })?;

        let record = TransferRecord {
            hash: hash.to_string(),
            from,
            destination,
            amount: amount.trim().to_string(),
            asset,
            chain_id,
            submitted_at: Utc::now(),
        };
        info!(
            tx_hash = %record.hash,
            to = %destination,
            amount = %record.amount,
            asset = ?asset,
            chain_id = %chain_id_hex(chain_id),
            "Transfer submitted"
        );

        self.refresh_balance_logged().await;
        Ok(record)
    }

    // ========== Networks ==========

    /// Switch the wallet to `chain_id`, adding the chain first if the wallet
    /// does not know it. Returns `false` on any failure so callers can offer a
    /// retry; use [`Self::try_switch_network`] for the reason.
    pub async fn switch_network(&self, chain_id: u64) -> bool {
        match self.try_switch_network(chain_id).await {
            Ok(_) => true,
            Err(e) => {
                warn!(chain_id = %chain_id_hex(chain_id), error = %e, "Network switch failed");
                false
            }
        }
    }

    /// Switch networks, returning the new active chain.
    pub async fn try_switch_network(&self, chain_id: u64) -> Result<ChainDescriptor, WalletError> {
        let descriptor = self
            .registry
            .get(chain_id)
            .cloned()
            .ok_or_else(|| WalletError::UnsupportedChain(chain_id_hex(chain_id)))?;
        let provider = self.provider()?.clone();
        let _guard = self.in_flight.lock().await;
        let epoch = self.current_epoch();

        match provider.switch_chain(chain_id).await {
            Ok(()) => {}
            Err(e) if e.is_unrecognized_chain() => {
                info!(
                    chain_id = %descriptor.chain_id_hex(),
                    chain = descriptor.name,
                    "Wallet does not know chain, requesting add-chain"
                );
                provider
                    .add_chain(&descriptor.add_chain_params())
                    .await
                    .map_err(declined_or_provider)?;
            }
            Err(e) => return Err(declined_or_provider(e)),
        }

        let updated = self.update_if_current(epoch, |s| s.active_chain = Some(descriptor.clone()));
        info!(chain = descriptor.name, "Switched network");

        if updated && self.session.borrow().account.is_some() {
            self.refresh_balance_logged().await;
        }
        Ok(descriptor)
    }

    /// The provider's current chain ID, bypassing the cache.
    pub async fn current_network_id(&self) -> Result<u64, WalletError> {
        Ok(self.provider()?.chain_id().await?)
    }

    // ========== Provider Events ==========

    /// Apply a provider notification to the session.
    pub async fn handle_event(&self, event: ProviderEvent) {
        let _guard = self.in_flight.lock().await;
        let epoch = self.current_epoch();

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    info!("Wallet reported no accounts");
                    self.disconnect();
                }
                Some(account) => {
                    let Ok(provider) = self.provider() else {
                        return;
                    };
                    let provider = provider.clone();
                    match self.establish(provider.as_ref(), Some(account)).await {
                        Ok(session) => {
                            if !self.commit_connected(epoch, session) {
                                debug!(account = %account, "Disconnected during resync");
                            }
                        }
                        Err(e) => {
                            warn!(account = %account, error = %e, "Account resync failed");
                        }
                    }
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                let active_chain = self.registry.get(chain_id).cloned();
                match &active_chain {
                    Some(chain) => info!(chain = chain.name, "Wallet changed network"),
                    None => warn!(
                        chain_id = %chain_id_hex(chain_id),
                        "Wallet switched to an unsupported chain"
                    ),
                }
                self.update_if_current(epoch, |s| s.active_chain = active_chain);

                if self.session.borrow().account.is_some() {
                    self.refresh_balance_logged().await;
                }
            }
        }
    }

    /// Consume provider events in arrival order until cancelled or the
    /// channel closes.
    pub async fn run_events(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ProviderEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        debug!(?event, "Provider event");
                        self.handle_event(event).await;
                    }
                    None => {
                        info!("Provider event channel closed");
                        return;
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("Provider event loop shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BNB_SMART_CHAIN, ETHEREUM_MAINNET};
    use crate::provider::mock::MockProvider;
    use crate::provider::{INTERNAL_ERROR, UNRECOGNIZED_CHAIN};
    use crate::storage::StoragePaths;
    use std::time::Duration;
    use tempfile::TempDir;

    const ONE_ETH: u64 = 1_000_000_000_000_000_000;
    const PRESALE: &str = "0xeD469Cb8d74467aD1c2F566C2067856341e97528";

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn bob() -> Address {
        Address::repeat_byte(0xb0)
    }

    struct Fixture {
        _dir: TempDir,
        storage: Arc<LocalStorage>,
        mock: Arc<MockProvider>,
        adapter: Arc<WalletAdapter>,
    }

    /// Registry [Ethereum, BNB]; wallet on Ethereum knowing only Ethereum,
    /// alice holds 1.5 ETH and 3 BNB.
    fn fixture() -> Fixture {
        let mock = Arc::new(MockProvider::new(vec![alice()], 1, &[]));
        mock.set_balance(1, alice(), U256::from(ONE_ETH) * U256::from(3) / U256::from(2));
        mock.set_balance(0x38, alice(), U256::from(ONE_ETH) * U256::from(3));
        fixture_with(mock)
    }

    fn fixture_with(mock: Arc<MockProvider>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut storage = LocalStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().unwrap();
        let storage = Arc::new(storage);

        let registry = ChainRegistry::new(vec![ETHEREUM_MAINNET, BNB_SMART_CHAIN]);
        let provider: Arc<dyn WalletProvider> = mock.clone();
        let adapter = Arc::new(WalletAdapter::new(
            Some(provider),
            registry,
            storage.clone(),
        ));
        Fixture {
            _dir: dir,
            storage,
            mock,
            adapter,
        }
    }

    fn marker(f: &Fixture) -> Option<ConnectionMarker> {
        ConnectionRepository::new(&f.storage).load().unwrap()
    }

    // ---------- connect / disconnect ----------

    #[tokio::test]
    async fn connect_populates_session() {
        let f = fixture();
        let session = f.adapter.connect().await.unwrap();

        assert_eq!(session.state, ConnectionState::Connected);
        assert_eq!(session.account, Some(alice()));
        assert_eq!(session.active_chain, Some(ETHEREUM_MAINNET));
        assert_eq!(session.native_balance, "1.5");
        assert_eq!(f.adapter.session(), session);
        assert_eq!(f.adapter.balance(), "1.5");

        let marker = marker(&f).unwrap();
        assert!(marker.connected);
        assert_eq!(marker.address, Some(alice()));
    }

    #[tokio::test]
    async fn connect_without_provider_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut storage = LocalStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().unwrap();
        let adapter = WalletAdapter::new(None, ChainRegistry::default(), Arc::new(storage));

        assert!(!adapter.has_provider());
        assert!(matches!(
            adapter.connect().await,
            Err(WalletError::ProviderUnavailable)
        ));
        assert_eq!(adapter.session(), Session::default());
        assert!(!adapter.switch_network(1).await);
        assert!(matches!(
            adapter.current_network_id().await,
            Err(WalletError::ProviderUnavailable)
        ));
    }

    #[tokio::test]
    async fn rejected_connect_leaves_session_empty() {
        let f = fixture();
        f.mock.reject_connect();

        assert!(matches!(
            f.adapter.connect().await,
            Err(WalletError::ConnectionRejected)
        ));
        assert_eq!(f.adapter.session(), Session::default());
        assert!(marker(&f).is_none());
    }

    #[tokio::test]
    async fn connect_with_no_accounts_is_rejected() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![], 1, &[])));
        assert!(matches!(
            f.adapter.connect().await,
            Err(WalletError::ConnectionRejected)
        ));
        assert_eq!(f.adapter.session(), Session::default());
    }

    #[tokio::test]
    async fn failed_balance_keeps_previous_session() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        let before = f.adapter.session();

        f.mock
            .fail_balance_with(ProviderError::new(-32000, "header not found"));
        assert!(matches!(
            f.adapter.connect().await,
            Err(WalletError::Provider(_))
        ));
        assert_eq!(f.adapter.session(), before);
    }

    #[tokio::test]
    async fn connect_then_disconnect_restores_empty_session() {
        let f = fixture();
        for _ in 0..3 {
            f.adapter.connect().await.unwrap();
            f.adapter.disconnect();

            let session = f.adapter.session();
            assert_eq!(session, Session::default());
            assert!(session.account.is_none());
            assert!(session.active_chain.is_none());
            assert_eq!(session.native_balance, "0");
            assert!(marker(&f).is_none());
        }

        // Idempotent
        f.adapter.disconnect();
        assert_eq!(f.adapter.session(), Session::default());
    }

    #[tokio::test]
    async fn connect_on_unregistered_chain_has_no_active_chain() {
        let mock = Arc::new(MockProvider::new(vec![alice()], 0x999, &[]));
        let f = fixture_with(mock);

        let session = f.adapter.connect().await.unwrap();
        assert!(session.is_connected());
        assert!(session.active_chain.is_none());
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let f = fixture();
        let mut rx = f.adapter.subscribe();

        f.adapter.connect().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().account, Some(alice()));
    }

    // ---------- restore ----------

    #[tokio::test]
    async fn restore_without_marker_makes_no_provider_call() {
        let f = fixture();
        assert!(!f.adapter.restore().await.unwrap());
        assert!(f.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn restore_reconnects_from_marker() {
        let f = fixture();
        ConnectionRepository::new(&f.storage)
            .save(&ConnectionMarker::connected(alice()))
            .unwrap();

        assert!(f.adapter.restore().await.unwrap());
        assert_eq!(f.adapter.session().account, Some(alice()));
    }

    #[tokio::test]
    async fn rejected_restore_clears_marker() {
        let f = fixture();
        ConnectionRepository::new(&f.storage)
            .save(&ConnectionMarker::connected(alice()))
            .unwrap();
        f.mock.reject_connect();

        assert!(!f.adapter.restore().await.unwrap());
        assert!(marker(&f).is_none());
    }

    // ---------- switch network ----------

    #[tokio::test]
    async fn direct_switch_to_bnb_refreshes_balance() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 1, &[0x38])));
        f.mock.set_balance(1, alice(), U256::from(ONE_ETH));
        f.mock.set_balance(0x38, alice(), U256::from(ONE_ETH) * U256::from(3));
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();

        assert!(f.adapter.switch_network(0x38).await);

        let session = f.adapter.session();
        assert_eq!(session.active_chain, Some(BNB_SMART_CHAIN));
        assert_eq!(session.native_balance, "3");
        assert_eq!(
            f.mock.calls(),
            vec!["wallet_switchEthereumChain", "eth_getBalance"]
        );
    }

    #[tokio::test]
    async fn unknown_chain_falls_back_to_add_chain() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();

        let chain = f.adapter.try_switch_network(0x38).await.unwrap();
        assert_eq!(chain, BNB_SMART_CHAIN);
        assert_eq!(f.adapter.session().active_chain, Some(BNB_SMART_CHAIN));
        assert_eq!(f.adapter.balance(), "3");
        assert_eq!(
            f.mock.calls(),
            vec![
                "wallet_switchEthereumChain",
                "wallet_addEthereumChain",
                "eth_getBalance"
            ]
        );
        assert_eq!(f.mock.current_chain(), 0x38);
    }

    #[tokio::test]
    async fn wrapped_unrecognized_chain_also_falls_back() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.fail_switch_with(
            ProviderError::new(INTERNAL_ERROR, "Internal JSON-RPC error.")
                .with_data(r#"{"originalError":{"code":4902}}"#),
        );

        assert!(f.adapter.switch_network(0x38).await);
        assert_eq!(f.adapter.session().active_chain, Some(BNB_SMART_CHAIN));
    }

    #[tokio::test]
    async fn unregistered_chain_fails_without_touching_session() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock
            .fail_switch_with(ProviderError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain"));
        f.mock.clear_calls();

        assert!(!f.adapter.switch_network(0x999).await);
        assert_eq!(f.adapter.session().active_chain, Some(ETHEREUM_MAINNET));
        assert!(matches!(
            f.adapter.try_switch_network(0x999).await,
            Err(WalletError::UnsupportedChain(id)) if id == "0x999"
        ));
        assert!(f.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_add_chain_keeps_active_chain() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.fail_add_chain_with(ProviderError::user_rejected());

        assert!(matches!(
            f.adapter.try_switch_network(0x38).await,
            Err(WalletError::UserRejected)
        ));
        assert_eq!(f.adapter.session().active_chain, Some(ETHEREUM_MAINNET));
        assert_eq!(f.adapter.balance(), "1.5");
    }

    #[tokio::test]
    async fn other_switch_errors_do_not_add_chain() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.fail_switch_with(ProviderError::new(
            -32002,
            "Request of type 'wallet_switchEthereumChain' already pending",
        ));
        f.mock.clear_calls();

        assert!(!f.adapter.switch_network(0x38).await);
        assert_eq!(f.adapter.session().active_chain, Some(ETHEREUM_MAINNET));
        assert_eq!(f.mock.calls(), vec!["wallet_switchEthereumChain"]);
    }

    #[tokio::test]
    async fn switch_while_disconnected_skips_balance() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 1, &[0x38])));

        assert!(f.adapter.switch_network(0x38).await);
        let session = f.adapter.session();
        assert_eq!(session.active_chain, Some(BNB_SMART_CHAIN));
        assert!(session.account.is_none());
        assert_eq!(f.mock.calls(), vec!["wallet_switchEthereumChain"]);
    }

    #[tokio::test]
    async fn current_network_id_bypasses_cache() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.set_chain(0x89);

        assert_eq!(f.adapter.current_network_id().await.unwrap(), 0x89);
        assert_eq!(f.adapter.session().chain_id(), Some(1));
    }

    // ---------- events ----------

    #[tokio::test]
    async fn empty_accounts_event_disconnects() {
        let f = fixture();
        f.adapter.connect().await.unwrap();

        f.adapter
            .handle_event(ProviderEvent::AccountsChanged(vec![]))
            .await;
        assert!(f.adapter.session().account.is_none());
        assert_eq!(f.adapter.session(), Session::default());
        assert!(marker(&f).is_none());

        // Also when already disconnected
        f.adapter
            .handle_event(ProviderEvent::AccountsChanged(vec![]))
            .await;
        assert!(f.adapter.session().account.is_none());
    }

    #[tokio::test]
    async fn accounts_event_resyncs_without_prompt() {
        let f = fixture();
        f.mock.set_balance(1, bob(), U256::from(ONE_ETH) * U256::from(2));
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();

        f.adapter
            .handle_event(ProviderEvent::AccountsChanged(vec![bob(), alice()]))
            .await;

        let session = f.adapter.session();
        assert_eq!(session.account, Some(bob()));
        assert_eq!(session.native_balance, "2");
        assert!(!f.mock.calls().contains(&"eth_requestAccounts"));
        assert_eq!(marker(&f).unwrap().address, Some(bob()));
    }

    #[tokio::test]
    async fn chain_event_updates_active_chain_and_balance() {
        let f = fixture();
        f.adapter.connect().await.unwrap();

        f.mock.set_chain(0x38);
        f.adapter.handle_event(ProviderEvent::ChainChanged(0x38)).await;
        let session = f.adapter.session();
        assert_eq!(session.active_chain, Some(BNB_SMART_CHAIN));
        assert_eq!(session.native_balance, "3");

        f.mock.set_chain(0x999);
        f.adapter.handle_event(ProviderEvent::ChainChanged(0x999)).await;
        let session = f.adapter.session();
        assert!(session.active_chain.is_none());
        assert_eq!(session.state, ConnectionState::Connected);
        assert_eq!(session.account, Some(alice()));
        assert_eq!(session.native_balance, "0");
    }

    #[tokio::test]
    async fn event_loop_applies_events_in_order() {
        let f = fixture();
        f.adapter.connect().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(f.adapter.clone().run_events(rx, shutdown.clone()));

        f.mock.set_chain(0x38);
        tx.send(ProviderEvent::ChainChanged(0x38)).await.unwrap();
        tx.send(ProviderEvent::AccountsChanged(vec![])).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("event loop did not stop")
            .unwrap();
        assert_eq!(f.adapter.session(), Session::default());
    }

    #[tokio::test]
    async fn event_loop_stops_on_cancel() {
        let f = fixture();
        let (_tx, rx) = mpsc::channel::<ProviderEvent>(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(f.adapter.clone().run_events(rx, shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("event loop did not stop")
            .unwrap();
    }

    // ---------- signing ----------

    #[tokio::test]
    async fn sign_requires_connection() {
        let f = fixture();
        assert!(matches!(
            f.adapter.sign_message("hello").await,
            Err(WalletError::NotConnected)
        ));
        assert!(f.mock.calls().is_empty());

        f.adapter.connect().await.unwrap();
        let signature = f.adapter.sign_message("hello").await.unwrap();
        assert!(signature.ends_with(":hello"));

        f.mock.reject_sign();
        assert!(matches!(
            f.adapter.sign_message("hello").await,
            Err(WalletError::UserRejected)
        ));
    }

    // ---------- transfers ----------

    #[tokio::test]
    async fn transfer_while_disconnected_makes_no_provider_call() {
        let f = fixture();
        assert!(matches!(
            f.adapter.send_native_transfer(PRESALE, "0.1").await,
            Err(WalletError::NotConnected)
        ));
        assert!(matches!(
            f.adapter.send_stable_transfer(PRESALE, "10").await,
            Err(WalletError::NotConnected)
        ));
        assert!(f.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn native_transfer_submits_and_refreshes() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.set_balance(1, alice(), U256::from(ONE_ETH));

        let record = f.adapter.send_native_transfer(PRESALE, "0.5").await.unwrap();

        let destination = Address::from_str(PRESALE).unwrap();
        assert_eq!(record.from, alice());
        assert_eq!(record.destination, destination);
        assert_eq!(record.amount, "0.5");
        assert_eq!(record.asset, AssetKind::Native);
        assert_eq!(record.chain_id, 1);
        assert!(record.hash.starts_with("0x"));

        let sent = f.mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, destination);
        assert_eq!(sent[0].value, U256::from(ONE_ETH / 2));
        assert!(sent[0].data.is_none());

        assert_eq!(f.adapter.balance(), "1");
    }

    #[tokio::test]
    async fn invalid_transfer_input_makes_no_provider_call() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();

        for amount in ["0", "-1", "abc", "", "0.0000000000000000001"] {
            assert!(
                matches!(
                    f.adapter.send_native_transfer(PRESALE, amount).await,
                    Err(WalletError::InvalidAmount(_))
                ),
                "amount {amount:?} accepted"
            );
        }
        assert!(matches!(
            f.adapter.send_native_transfer("0x1234", "1").await,
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(f.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_transfer_failed() {
        let f = fixture();
        f.adapter.connect().await.unwrap();

        f.mock
            .fail_send_with(ProviderError::new(-32000, "insufficient funds for gas"));
        match f.adapter.send_native_transfer(PRESALE, "0.1").await {
            Err(WalletError::TransferFailed(msg)) => {
                assert_eq!(msg, "insufficient funds for gas")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        f.mock.fail_send_with(ProviderError::user_rejected());
        assert!(matches!(
            f.adapter.send_native_transfer(PRESALE, "0.1").await,
            Err(WalletError::UserRejected)
        ));
        assert_eq!(f.adapter.balance(), "1.5");
    }

    #[tokio::test]
    async fn stable_transfer_calls_token_contract() {
        let f = fixture();
        f.adapter.connect().await.unwrap();

        let record = f.adapter.send_stable_transfer(PRESALE, "25.5").await.unwrap();
        assert_eq!(record.asset, AssetKind::Stable);

        let sent = f.mock.sent();
        let usdt = Address::from_str("0xdAC17F958D2ee523a2206206994597C13D831ec7").unwrap();
        assert_eq!(sent[0].to, usdt);
        assert_eq!(sent[0].value, U256::ZERO);
        assert_eq!(
            sent[0].data,
            Some(erc20::transfer_calldata(
                Address::from_str(PRESALE).unwrap(),
                U256::from(25_500_000u64)
            ))
        );
    }

    #[tokio::test]
    async fn stable_transfer_needs_known_chain() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 0x999, &[])));
        f.adapter.connect().await.unwrap();

        assert!(matches!(
            f.adapter.send_stable_transfer(PRESALE, "10").await,
            Err(WalletError::UnsupportedChain(_))
        ));
    }

    #[tokio::test]
    async fn transfer_on_unregistered_chain_records_wallet_chain() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 0x999, &[])));
        f.mock.set_balance(0x999, alice(), U256::from(ONE_ETH));
        f.adapter.connect().await.unwrap();

        let record = f.adapter.send_native_transfer(PRESALE, "0.1").await.unwrap();
        assert_eq!(record.chain_id, 0x999);
        assert_eq!(f.mock.sent()[0].value, U256::from(ONE_ETH / 10));
    }

    #[tokio::test]
    async fn transfer_for_another_chain_is_refused() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();

        match f
            .adapter
            .send_transfer(AssetKind::Native, PRESALE, "0.1", Some(0x38))
            .await
        {
            Err(WalletError::ChainMismatch { expected, actual }) => {
                assert_eq!(expected, "0x38");
                assert_eq!(actual, ETHEREUM_MAINNET.name);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(f.mock.calls().is_empty());

        let record = f
            .adapter
            .send_transfer(AssetKind::Native, PRESALE, "0.1", Some(1))
            .await
            .unwrap();
        assert_eq!(record.chain_id, 1);
    }

    // ---------- preferred chain ----------

    #[tokio::test]
    async fn preferred_chain_follows_session() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 0x999, &[0x38])));
        assert_eq!(f.adapter.preferred_chain(), Some(ETHEREUM_MAINNET));

        f.adapter.connect().await.unwrap();
        assert_eq!(f.adapter.preferred_chain(), None);

        f.adapter.try_switch_network(0x38).await.unwrap();
        assert_eq!(f.adapter.preferred_chain(), Some(BNB_SMART_CHAIN));

        f.adapter.disconnect();
        assert_eq!(f.adapter.preferred_chain(), Some(ETHEREUM_MAINNET));
    }

    // ---------- overlapping requests ----------

    #[tokio::test]
    async fn disconnect_while_connecting_wins() {
        let f = fixture();
        let gate = f.mock.gate("eth_getBalance");

        let adapter = f.adapter.clone();
        let pending = tokio::spawn(async move { adapter.connect().await });
        gate.entered().await;
        assert_eq!(f.adapter.session().state, ConnectionState::Connecting);

        f.adapter.disconnect();
        gate.release();

        assert!(matches!(
            pending.await.unwrap(),
            Err(WalletError::Superseded)
        ));
        assert_eq!(f.adapter.session(), Session::default());
        assert!(marker(&f).is_none());
    }

    #[tokio::test]
    async fn failed_connect_does_not_undo_disconnect() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        f.mock
            .fail_balance_with(ProviderError::new(-32000, "header not found"));
        let gate = f.mock.gate("eth_getBalance");

        let adapter = f.adapter.clone();
        let pending = tokio::spawn(async move { adapter.connect().await });
        gate.entered().await;
        f.adapter.disconnect();
        gate.release();

        assert!(matches!(
            pending.await.unwrap(),
            Err(WalletError::Provider(_))
        ));
        assert_eq!(f.adapter.session(), Session::default());
        assert!(marker(&f).is_none());
    }

    #[tokio::test]
    async fn disconnect_during_account_resync_wins() {
        let f = fixture();
        f.adapter.connect().await.unwrap();
        let gate = f.mock.gate("eth_getBalance");

        let adapter = f.adapter.clone();
        let event = tokio::spawn(async move {
            adapter
                .handle_event(ProviderEvent::AccountsChanged(vec![bob()]))
                .await
        });
        gate.entered().await;
        f.adapter.disconnect();
        gate.release();
        event.await.unwrap();

        assert_eq!(f.adapter.session(), Session::default());
        assert!(marker(&f).is_none());
    }

    #[tokio::test]
    async fn overlapping_switches_run_one_at_a_time() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 1, &[0x38])));
        f.mock.set_balance(1, alice(), U256::from(ONE_ETH) * U256::from(3) / U256::from(2));
        f.mock.set_balance(0x38, alice(), U256::from(ONE_ETH) * U256::from(3));
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();
        let gate = f.mock.gate("wallet_switchEthereumChain");

        let adapter = f.adapter.clone();
        let first = tokio::spawn(async move { adapter.try_switch_network(0x38).await });
        gate.entered().await;
        let adapter = f.adapter.clone();
        let second = tokio::spawn(async move { adapter.try_switch_network(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Second switch is queued behind the first
        assert_eq!(f.mock.calls(), vec!["wallet_switchEthereumChain"]);

        gate.release();
        assert_eq!(first.await.unwrap().unwrap(), BNB_SMART_CHAIN);
        assert_eq!(second.await.unwrap().unwrap(), ETHEREUM_MAINNET);
        assert_eq!(
            f.mock.calls(),
            vec![
                "wallet_switchEthereumChain",
                "eth_getBalance",
                "wallet_switchEthereumChain",
                "eth_getBalance"
            ]
        );
        assert_eq!(f.adapter.session().active_chain, Some(ETHEREUM_MAINNET));
        assert_eq!(f.adapter.balance(), "1.5");
        assert_eq!(f.mock.current_chain(), 1);
    }

    #[tokio::test]
    async fn transfer_queued_behind_switch_checks_the_new_chain() {
        let f = fixture_with(Arc::new(MockProvider::new(vec![alice()], 1, &[0x38])));
        f.adapter.connect().await.unwrap();
        f.mock.clear_calls();
        let gate = f.mock.gate("wallet_switchEthereumChain");

        let adapter = f.adapter.clone();
        let switch = tokio::spawn(async move { adapter.try_switch_network(0x38).await });
        gate.entered().await;
        let adapter = f.adapter.clone();
        let transfer = tokio::spawn(async move {
            adapter
                .send_transfer(AssetKind::Native, PRESALE, "0.1", Some(1))
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.release();

        switch.await.unwrap().unwrap();
        assert!(matches!(
            transfer.await.unwrap(),
            Err(WalletError::ChainMismatch { .. })
        ));
        assert!(!f.mock.calls().contains(&"eth_sendTransaction"));
        assert!(f.mock.sent().is_empty());
    }
}
