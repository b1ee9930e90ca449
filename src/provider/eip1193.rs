// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-1193 wallet provider reachable over HTTP JSON-RPC.
//!
//! Desktop wallets such as Frame expose the injected-provider request API on
//! a local endpoint; account prompts, signing and chain switching are handled
//! by the wallet exactly as for a browser extension.

use alloy::{
    network::Ethereum,
    primitives::{hex, Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    transports::TransportError,
};
use async_trait::async_trait;
use serde::Serialize;

use super::{ProviderError, TransactionCall, WalletProvider};
use crate::blockchain::{chain_id_hex, AddChainParams};

/// Body of a `wallet_switchEthereumChain` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChainParams {
    chain_id: String,
}

/// Wallet provider speaking EIP-1193 methods over HTTP.
pub struct Eip1193Client {
    provider: DynProvider<Ethereum>,
    endpoint: String,
}

impl std::fmt::Debug for Eip1193Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eip1193Client")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Eip1193Client {
    /// Create a client for the wallet's JSON-RPC endpoint.
    pub fn new(endpoint: &str) -> Result<Self, ProviderError> {
        let url: url::Url = endpoint.parse().map_err(|e: url::ParseError| {
            ProviderError::transport(format!("Invalid provider URL: {e}"))
        })?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            endpoint: endpoint.to_string(),
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map an RPC failure to a provider error, keeping the EIP-1193 code.
fn map_rpc_error(err: TransportError) -> ProviderError {
    if let Some(payload) = err.as_error_resp() {
        let mapped = ProviderError::new(payload.code, payload.message.to_string());
        return match &payload.data {
            Some(data) => mapped.with_data(data.get()),
            None => mapped,
        };
    }
    ProviderError::transport(err.to_string())
}

#[async_trait]
impl WalletProvider for Eip1193Client {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.provider
            .raw_request::<_, Vec<Address>>("eth_requestAccounts".into(), ())
            .await
            .map_err(map_rpc_error)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.provider.get_accounts().await.map_err(map_rpc_error)
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.provider.get_chain_id().await.map_err(map_rpc_error)
    }

    async fn balance(&self, account: Address) -> Result<U256, ProviderError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(map_rpc_error)
    }

    async fn sign_message(
        &self,
        account: Address,
        message: &str,
    ) -> Result<String, ProviderError> {
        let payload = hex::encode_prefixed(message.as_bytes());
        self.provider
            .raw_request::<_, String>("personal_sign".into(), (payload, account))
            .await
            .map_err(map_rpc_error)
    }

    async fn send_transaction(&self, call: TransactionCall) -> Result<B256, ProviderError> {
        let mut tx = TransactionRequest::default()
            .from(call.from)
            .to(call.to)
            .value(call.value);
        if let Some(data) = call.data {
            tx = tx.input(data.into());
        }

        self.provider
            .raw_request::<_, B256>("eth_sendTransaction".into(), (tx,))
            .await
            .map_err(map_rpc_error)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let params = SwitchChainParams {
            chain_id: chain_id_hex(chain_id),
        };
        self.provider
            .raw_request::<_, serde_json::Value>("wallet_switchEthereumChain".into(), (params,))
            .await
            .map(|_| ())
            .map_err(map_rpc_error)
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError> {
        self.provider
            .raw_request::<_, serde_json::Value>(
                "wallet_addEthereumChain".into(),
                (params.clone(),),
            )
            .await
            .map(|_| ())
            .map_err(map_rpc_error)
    }
}
