// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! # Claim Workflow
//!
//! Turns an eligible scan result into a claim receipt through strictly
//! sequential steps: local guards, attestation message, wallet signature,
//! backend submission, receipt storage, then the `Claiming -> Claimed`
//! settle transition plus a fire-and-forget completion notification.
//!
//! The attestation is advisory text, not a transaction; it must not
//! authorize fund movement. Once a receipt exists for this (session,
//! address) pair, another claim fails locally with `AlreadyClaimed` and
//! never reaches the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::error::WorkflowError;
use crate::models::{ClaimReceipt, ClaimRequest, ScanResult};
use crate::sequencer::{Sequencer, WorkflowPhase};
use crate::session::Session;
use crate::wallet::WalletProvider;

/// Completion side effect invoked after a successful claim. Runs detached;
/// its failure never fails the claim.
pub type ClaimedHook = Arc<dyn Fn(&ClaimReceipt) + Send + Sync>;

/// Deterministic human-readable attestation embedding address, allocation,
/// and timestamp.
pub fn attestation_message(
    address: &str,
    amount: f64,
    value_usd: f64,
    timestamp: DateTime<Utc>,
) -> String {
    format!(
        "I confirm ownership of wallet {address} and claim my presale allocation \
         of {amount} tokens (${value_usd} USD).\nTimestamp: {}",
        timestamp.to_rfc3339()
    )
}

pub struct ClaimWorkflow {
    backend: Arc<BackendClient>,
    sequencer: Arc<Sequencer>,
    claim_settle: Duration,
    email: String,
    receipts: Mutex<HashMap<String, ClaimReceipt>>,
    on_claimed: Option<ClaimedHook>,
}

impl ClaimWorkflow {
    pub fn new(
        backend: Arc<BackendClient>,
        sequencer: Arc<Sequencer>,
        claim_settle: Duration,
        email: Option<String>,
    ) -> Self {
        Self {
            backend,
            sequencer,
            claim_settle,
            email: email.unwrap_or_default(),
            receipts: Mutex::new(HashMap::new()),
            on_claimed: None,
        }
    }

    /// Install a completion hook fired (detached) after each successful claim.
    pub fn with_claimed_hook(mut self, hook: ClaimedHook) -> Self {
        self.on_claimed = Some(hook);
        self
    }

    /// Stored receipt for `address`, if one exists this session.
    pub fn receipt_for(&self, address: &str) -> Option<ClaimReceipt> {
        self.receipts
            .lock()
            .expect("receipt lock poisoned")
            .get(address)
            .cloned()
    }

    /// Sign the attestation and submit the claim.
    ///
    /// Preconditions checked locally, in order: no existing receipt
    /// (`AlreadyClaimed`), phase is `Eligible` (`PhaseGuard`), and the scan
    /// marked the wallet eligible (`NotEligible`). Signature or backend
    /// failures leave the phase at `Eligible` so the claim stays retriable.
    pub async fn claim(
        &self,
        provider: &dyn WalletProvider,
        address: &str,
        scan: &ScanResult,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<ClaimReceipt, WorkflowError> {
        if self
            .receipts
            .lock()
            .expect("receipt lock poisoned")
            .contains_key(address)
        {
            return Err(WorkflowError::AlreadyClaimed);
        }

        let phase = self.sequencer.phase();
        if phase != WorkflowPhase::Eligible {
            return Err(WorkflowError::PhaseGuard(phase));
        }
        if !scan.is_eligible {
            return Err(WorkflowError::NotEligible);
        }

        let epoch = self.sequencer.current_epoch();
        let amount = scan.amount();
        let value_usd = scan.value_usd();
        let message = attestation_message(address, amount, value_usd, Utc::now());

        let signature = provider.sign_message(&message).await.map_err(|e| {
            info!(%address, error = %e, "attestation signature denied");
            WorkflowError::SignatureDenied(e.to_string())
        })?;

        let request = ClaimRequest {
            wallet_address: address.to_string(),
            signature,
            message,
            claim_amount: amount,
            claim_value: value_usd,
            session_id: session.id().to_string(),
            email: self.email.clone(),
        };

        let receipt = self.backend.claim(&request).await.map_err(|e| {
            warn!(%address, error = %e, "claim submission rejected");
            WorkflowError::ClaimRejected(e.to_string())
        })?;

        self.receipts
            .lock()
            .expect("receipt lock poisoned")
            .insert(address.to_string(), receipt.clone());

        self.sequencer.set_phase(epoch, WorkflowPhase::Claiming);
        self.sequencer.schedule_phase(
            epoch,
            self.claim_settle,
            WorkflowPhase::Claimed,
            cancel.child_token(),
        );

        // Completion notification: detached, never awaited by the claim path.
        let hook = self.on_claimed.clone();
        let confirmed = receipt.clone();
        tokio::spawn(async move {
            info!(
                address = %confirmed.wallet_address,
                amount = confirmed.claim_amount,
                "claim confirmed"
            );
            if let Some(hook) = hook {
                hook(&confirmed);
            }
        });

        Ok(receipt)
    }
}
