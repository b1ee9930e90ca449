// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Presale purchase math, checkout flow and token delivery.

pub mod calculator;
pub mod checkout;
pub mod delivery;

pub use calculator::{PresaleTerms, Quote, RECEIVING_ADDRESS};
pub use checkout::Checkout;
pub use delivery::{DeliveryScheduler, DeliveryWorker};
