// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use nova_presale_wallet::blockchain::chain_id_hex;
use nova_presale_wallet::config::WalletConfig;
use nova_presale_wallet::{logging, WalletContext};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match WalletConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(config.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        data_dir = %config.data_dir.display(),
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Starting NOVA presale wallet connector"
    );

    let context = match WalletContext::start(&config).await {
        Ok(context) => context,
        Err(e) => {
            error!(error = %e, "Failed to start wallet context");
            return ExitCode::FAILURE;
        }
    };

    let adapter = context.adapter().clone();
    if let Some(chain_id) = config.presale_chain_id {
        if !adapter.switch_network(chain_id).await {
            warn!(chain_id = %chain_id_hex(chain_id), "Could not switch to presale chain");
        }
    }

    match adapter.preferred_chain() {
        Some(chain) => info!(
            chain = chain.name,
            assets = ?chain.supported_asset_kinds(),
            "Presale network"
        ),
        None => warn!("Wallet is on an unsupported network"),
    }

    let mut sessions = adapter.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = sessions.borrow_and_update().clone();
                info!(
                    state = ?session.state,
                    account = %session.display_name(),
                    chain = session.active_chain.as_ref().map(|c| c.name).unwrap_or("unsupported"),
                    balance = %session.native_balance,
                    "Session updated"
                );
            }
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    context.shutdown().await;
    ExitCode::SUCCESS
}
