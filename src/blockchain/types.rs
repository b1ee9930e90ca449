// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain descriptors and the static chain registry.

use serde::{Deserialize, Serialize};

/// Kind of asset a chain can settle a presale payment in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// The chain's native currency (ETH, BNB, POL)
    Native,
    /// The chain's configured USD stable token
    Stable,
}

/// ERC-20 stable token deployed on a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableAsset {
    pub symbol: &'static str,
    pub contract_address: &'static str,
    pub decimals: u8,
}

/// Network configuration for a chain the presale accepts payments on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    /// Chain ID
    pub chain_id: u64,
    /// Network name for display
    pub name: &'static str,
    /// Native currency display name
    pub native_name: &'static str,
    /// Native currency symbol
    pub native_symbol: &'static str,
    /// Native currency decimals
    pub native_decimals: u8,
    /// Public RPC endpoint handed to the wallet on add-chain
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// Stable token accepted on this chain, if any
    pub stable_asset: Option<StableAsset>,
}

impl ChainDescriptor {
    /// Chain ID in the `0x`-prefixed hex form wallets expect.
    pub fn chain_id_hex(&self) -> String {
        chain_id_hex(self.chain_id)
    }

    /// Asset kinds this chain accepts.
    pub fn supported_asset_kinds(&self) -> Vec<AssetKind> {
        let mut kinds = vec![AssetKind::Native];
        if self.stable_asset.is_some() {
            kinds.push(AssetKind::Stable);
        }
        kinds
    }

    pub fn supports(&self, kind: AssetKind) -> bool {
        self.supported_asset_kinds().contains(&kind)
    }

    /// Symbol of the given asset kind on this chain.
    pub fn asset_symbol(&self, kind: AssetKind) -> Option<&'static str> {
        match kind {
            AssetKind::Native => Some(self.native_symbol),
            AssetKind::Stable => self.stable_asset.as_ref().map(|a| a.symbol),
        }
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    /// Explorer link for an address.
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }

    /// Parameters for `wallet_addEthereumChain` (EIP-3085).
    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.chain_id_hex(),
            chain_name: self.name.to_string(),
            native_currency: NativeCurrency {
                name: self.native_name.to_string(),
                symbol: self.native_symbol.to_string(),
                decimals: self.native_decimals,
            },
            rpc_urls: vec![self.rpc_url.to_string()],
            block_explorer_urls: vec![self.explorer_url.to_string()],
        }
    }
}

/// Native currency block of an add-chain request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Body of a `wallet_addEthereumChain` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Ethereum Mainnet configuration.
pub const ETHEREUM_MAINNET: ChainDescriptor = ChainDescriptor {
    chain_id: 0x1,
    name: "Ethereum Mainnet",
    native_name: "Ether",
    native_symbol: "ETH",
    native_decimals: 18,
    rpc_url: "https://ethereum-rpc.publicnode.com",
    explorer_url: "https://etherscan.io",
    stable_asset: Some(StableAsset {
        symbol: "USDT",
        contract_address: "0xdAC17F958D2ee523a2206206994597C13D831ec7",
        decimals: 6,
    }),
};

/// BNB Smart Chain configuration.
pub const BNB_SMART_CHAIN: ChainDescriptor = ChainDescriptor {
    chain_id: 0x38,
    name: "BNB Smart Chain",
    native_name: "BNB",
    native_symbol: "BNB",
    native_decimals: 18,
    rpc_url: "https://bsc-dataseed.bnbchain.org",
    explorer_url: "https://bscscan.com",
    // Binance-Peg USDT uses 18 decimals on BSC
    stable_asset: Some(StableAsset {
        symbol: "USDT",
        contract_address: "0x55d398326f99059fF775485246999027B3197955",
        decimals: 18,
    }),
};

/// Polygon PoS configuration.
pub const POLYGON_MAINNET: ChainDescriptor = ChainDescriptor {
    chain_id: 0x89,
    name: "Polygon",
    native_name: "POL",
    native_symbol: "POL",
    native_decimals: 18,
    rpc_url: "https://polygon-rpc.com",
    explorer_url: "https://polygonscan.com",
    stable_asset: Some(StableAsset {
        symbol: "USDT",
        contract_address: "0xc2132D05D31c914a87C6611C10748AEb04B58e8F",
        decimals: 6,
    }),
};

/// Ordered, immutable set of chains the connector recognizes.
///
/// The first entry is the default chain shown before any wallet connects.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(vec![ETHEREUM_MAINNET, BNB_SMART_CHAIN, POLYGON_MAINNET])
    }
}

impl ChainRegistry {
    /// Build a registry from an ordered list. Later duplicates of a chain ID
    /// are dropped.
    pub fn new(chains: Vec<ChainDescriptor>) -> Self {
        let mut unique: Vec<ChainDescriptor> = Vec::with_capacity(chains.len());
        for chain in chains {
            if !unique.iter().any(|c| c.chain_id == chain.chain_id) {
                unique.push(chain);
            }
        }
        Self { chains: unique }
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.get(chain_id).is_some()
    }

    /// Default chain (first registry entry).
    pub fn default_chain(&self) -> Option<&ChainDescriptor> {
        self.chains.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Format a chain ID as `0x`-prefixed lowercase hex.
pub fn chain_id_hex(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

/// Parse a chain ID given as `0x` hex or plain decimal.
pub fn parse_chain_id(raw: &str) -> Result<u64, String> {
    let value = raw.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("Invalid chain id `{value}`: {e}"))
}

/// Shorten an address for display (`0x1234...abcd`).
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
