// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between human-readable decimal amounts and base units.

use alloy::primitives::U256;

/// Errors from amount parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("Too many decimal places (max {0})")]
    TooPrecise(u8),

    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Amount overflow")]
    Overflow,
}

/// Parse a positive decimal amount (e.g. `"1.5"`) into base units.
///
/// # Arguments
/// * `amount` - Amount as a string, no sign, no exponent
/// * `decimals` - Number of decimals of the asset (18 for ETH, 6 for USDT)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitsError::InvalidFormat(amount.to_string()));
    }
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(UnitsError::InvalidFormat(amount.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise(decimals));
    }

    let whole_units = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| UnitsError::Overflow)?
    };

    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction_units = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| UnitsError::Overflow)?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    let total = whole_units
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or(UnitsError::Overflow)?;

    if total.is_zero() {
        return Err(UnitsError::NotPositive);
    }
    Ok(total)
}

/// Format base units as a trimmed decimal string, full precision.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction.is_zero() {
        return whole.to_string();
    }

    // Left-pad to `decimals` digits, then drop trailing zeros
    let digits = fraction.to_string();
    let mut fraction = "0".repeat(decimals as usize - digits.len());
    fraction.push_str(digits.trim_end_matches('0'));
    format!("{whole}.{fraction}")
}
