// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted in-memory wallet provider for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tokio::sync::Notify;

use super::{ProviderError, TransactionCall, WalletProvider};
use crate::blockchain::{chain_id_hex, AddChainParams};

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<Address>,
    chain_id: u64,
    /// Chains the wallet knows without an add-chain request
    known_chains: HashSet<u64>,
    /// Native balance per (chain, account)
    balances: HashMap<(u64, Address), U256>,
    reject_connect: bool,
    reject_sign: bool,
    switch_error: Option<ProviderError>,
    add_chain_error: Option<ProviderError>,
    send_error: Option<ProviderError>,
    balance_error: Option<ProviderError>,
    sent: Vec<TransactionCall>,
    calls: Vec<&'static str>,
    next_hash: u8,
    /// One-shot gates, keyed by method name
    gates: HashMap<&'static str, Arc<Gate>>,
}

/// Holds a provider method until the test releases it.
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until the gated method has been called.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated method continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Wallet provider whose responses are scripted by the test.
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    /// Wallet on `chain_id` that knows `known` chains and exposes `accounts`.
    pub fn new(accounts: Vec<Address>, chain_id: u64, known: &[u64]) -> Self {
        let provider = Self::default();
        {
            let mut state = provider.state.lock().unwrap();
            state.accounts = accounts;
            state.chain_id = chain_id;
            state.known_chains = known.iter().copied().collect();
            state.known_chains.insert(chain_id);
        }
        provider
    }

    pub fn set_balance(&self, chain_id: u64, account: Address, wei: U256) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((chain_id, account), wei);
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    pub fn set_chain(&self, chain_id: u64) {
        let mut state = self.state.lock().unwrap();
        state.chain_id = chain_id;
        state.known_chains.insert(chain_id);
    }

    pub fn reject_connect(&self) {
        self.state.lock().unwrap().reject_connect = true;
    }

    pub fn reject_sign(&self) {
        self.state.lock().unwrap().reject_sign = true;
    }

    pub fn fail_switch_with(&self, err: ProviderError) {
        self.state.lock().unwrap().switch_error = Some(err);
    }

    pub fn fail_add_chain_with(&self, err: ProviderError) {
        self.state.lock().unwrap().add_chain_error = Some(err);
    }

    pub fn fail_send_with(&self, err: ProviderError) {
        self.state.lock().unwrap().send_error = Some(err);
    }

    pub fn fail_balance_with(&self, err: ProviderError) {
        self.state.lock().unwrap().balance_error = Some(err);
    }

    pub fn current_chain(&self) -> u64 {
        self.state.lock().unwrap().chain_id
    }

    /// Names of every provider method invoked, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Transactions submitted through `send_transaction`.
    pub fn sent(&self) -> Vec<TransactionCall> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Hold the next call to `method` until [`Gate::release`].
    pub fn gate(&self, method: &'static str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(method, gate.clone());
        gate
    }

    /// Log the call, wait on its gate if one is armed, then lock the state.
    async fn record(&self, call: &'static str) -> std::sync::MutexGuard<'_, MockState> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            state.gates.remove(call)
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let state = self.record("eth_requestAccounts").await;
        if state.reject_connect {
            return Err(ProviderError::user_rejected());
        }
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let state = self.record("eth_accounts").await;
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let state = self.record("eth_chainId").await;
        Ok(state.chain_id)
    }

    async fn balance(&self, account: Address) -> Result<U256, ProviderError> {
        let state = self.record("eth_getBalance").await;
        if let Some(err) = &state.balance_error {
            return Err(err.clone());
        }
        Ok(state
            .balances
            .get(&(state.chain_id, account))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn sign_message(
        &self,
        account: Address,
        message: &str,
    ) -> Result<String, ProviderError> {
        let state = self.record("personal_sign").await;
        if state.reject_sign {
            return Err(ProviderError::user_rejected());
        }
        Ok(format!("0xsig:{account}:{message}"))
    }

    async fn send_transaction(&self, call: TransactionCall) -> Result<B256, ProviderError> {
        let mut state = self.record("eth_sendTransaction").await;
        if let Some(err) = &state.send_error {
            return Err(err.clone());
        }
        state.next_hash = state.next_hash.wrapping_add(1);
        let hash = B256::repeat_byte(state.next_hash);
        state.sent.push(call);
        Ok(hash)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let mut state = self.record("wallet_switchEthereumChain").await;
        if let Some(err) = &state.switch_error {
            return Err(err.clone());
        }
        if !state.known_chains.contains(&chain_id) {
            return Err(ProviderError::unrecognized_chain(&chain_id_hex(chain_id)));
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError> {
        let mut state = self.record("wallet_addEthereumChain").await;
        if let Some(err) = &state.add_chain_error {
            return Err(err.clone());
        }
        let chain_id = crate::blockchain::parse_chain_id(&params.chain_id)
            .map_err(|e| ProviderError::new(-32602, e))?;
        // Wallets switch to a freshly added chain once the user approves it
        state.known_chains.insert(chain_id);
        state.chain_id = chain_id;
        Ok(())
    }
}
