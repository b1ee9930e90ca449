// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-level building blocks for the wallet connector.
//!
//! This module provides:
//! - The static chain registry (Ethereum, BNB Smart Chain, Polygon)
//! - Decimal/base-unit amount conversion
//! - ERC-20 calldata for stable-asset payments

pub mod erc20;
pub mod types;
pub mod units;

pub use types::*;
pub use units::{format_amount, parse_amount, UnitsError};
