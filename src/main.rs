// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! Headless claim runner.
//!
//! Connects the locally held wallet key to the presale backend, waits for
//! the staged eligibility outcome, claims if eligible, and prints the
//! receipt. Ctrl-C tears the workflow down at any point.

use std::env;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use presale_engine::{
    ConnectivityStatus, EngineConfig, LocalKeyProvider, WorkflowEngine, WorkflowPhase,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = EngineConfig::from_env().expect("invalid configuration");
    let key = env::var("PRESALE_WALLET_KEY").expect("PRESALE_WALLET_KEY must be set");
    let address = env::var("PRESALE_WALLET_ADDRESS").expect("PRESALE_WALLET_ADDRESS must be set");

    let provider =
        Arc::new(LocalKeyProvider::from_hex(&key, address).expect("invalid PRESALE_WALLET_KEY"));
    let engine =
        WorkflowEngine::new(config, provider).expect("failed to build workflow engine");

    if engine.check_backend().await != ConnectivityStatus::Connected {
        error!("backend is unreachable; check PRESALE_API_BASE_URL");
        std::process::exit(1);
    }

    if let Err(e) = engine.handle_connect().await {
        error!(error = %e, "eligibility scan failed");
        std::process::exit(1);
    }

    let mut phases = engine.subscribe_phase();
    loop {
        let phase = *phases.borrow_and_update();
        match phase {
            WorkflowPhase::Eligible => {
                let scan = engine.scan_result().expect("eligible without a scan result");
                info!(
                    amount = scan.amount(),
                    value_usd = scan.value_usd(),
                    "wallet is eligible, submitting claim"
                );
                if let Err(e) = engine.claim().await {
                    error!(error = %e, "claim failed");
                    engine.shutdown();
                    std::process::exit(1);
                }
            }
            WorkflowPhase::NotEligible => {
                info!("wallet is not eligible for an allocation");
                engine.shutdown();
                return;
            }
            WorkflowPhase::Claimed => {
                let receipt = engine.receipt().expect("claimed without a receipt");
                info!(
                    claim_id = receipt.claim_id.as_deref().unwrap_or("-"),
                    amount = receipt.claim_amount,
                    "claim complete"
                );
                engine.shutdown();
                return;
            }
            _ => {}
        }

        tokio::select! {
            changed = phases.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                engine.shutdown();
                return;
            }
        }
    }
}
