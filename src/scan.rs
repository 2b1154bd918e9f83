// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! # Scan Orchestrator
//!
//! Decides eligibility for a connected wallet and stages the two-step
//! reveal: a fixed "scanning" settle delay, then the eligible/not-eligible
//! outcome, then the visible notification. The delays are a pacing contract
//! carried over from the original UX - they fire even when the backend
//! answers instantly, and they are cancellable on disconnect or shutdown.
//!
//! Rules enforced here:
//! - a scan needs a non-empty address and a `Connected` backend;
//! - at most one scan per address is in flight; a concurrent call for the
//!   same address is ignored without touching the network;
//! - a scan runs at most once per (address, Connected) pairing; the stored
//!   result is tagged with its epoch and superseded by any disconnect,
//!   reconnect, or teardown;
//! - a failed scan reverts the phase to `Idle` so the scanning indicator
//!   never hangs;
//! - a scan resolving after the epoch moved on applies nothing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::error::WorkflowError;
use crate::health::{ConnectivityStatus, HealthMonitor};
use crate::models::{ScanRequest, ScanResult};
use crate::sequencer::{Sequencer, WorkflowPhase};
use crate::session::Session;

/// Scan result pinned to the address and epoch it was produced under.
#[derive(Debug, Clone)]
struct ScannedAllocation {
    address: String,
    epoch: u64,
    result: ScanResult,
}

pub struct ScanOrchestrator {
    backend: Arc<BackendClient>,
    monitor: Arc<HealthMonitor>,
    sequencer: Arc<Sequencer>,
    scan_settle: Duration,
    reveal_delay: Duration,
    user_agent: String,
    email: String,
    in_flight: Mutex<Option<String>>,
    last: Mutex<Option<ScannedAllocation>>,
}

impl ScanOrchestrator {
    pub fn new(
        backend: Arc<BackendClient>,
        monitor: Arc<HealthMonitor>,
        sequencer: Arc<Sequencer>,
        scan_settle: Duration,
        reveal_delay: Duration,
        user_agent: String,
        email: Option<String>,
    ) -> Self {
        Self {
            backend,
            monitor,
            sequencer,
            scan_settle,
            reveal_delay,
            user_agent,
            email: email.unwrap_or_default(),
            in_flight: Mutex::new(None),
            last: Mutex::new(None),
        }
    }

    /// Whether a scan is currently in flight for `address`.
    pub fn in_flight_for(&self, address: &str) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .as_deref()
            == Some(address)
    }

    /// The stored result for `address`, if this pairing was already scanned.
    ///
    /// An entry from a superseded epoch is never returned: `reset` runs
    /// outside the sequencer's epoch lock, so a resolving scan can store its
    /// result after a disconnect already reset this orchestrator. The epoch
    /// tag makes such an entry unreachable instead of relying on ordering.
    pub fn result_for(&self, address: &str) -> Option<ScanResult> {
        let current = self.sequencer.current_epoch();
        self.last
            .lock()
            .expect("scan result lock poisoned")
            .as_ref()
            .filter(|scanned| scanned.address == address && scanned.epoch == current)
            .map(|scanned| scanned.result.clone())
    }

    /// Forget in-flight state and the stored result. Called on disconnect
    /// so a reconnect produces a fresh scan.
    pub fn reset(&self) {
        self.in_flight.lock().expect("in-flight lock poisoned").take();
        self.last.lock().expect("scan result lock poisoned").take();
    }

    /// Request an eligibility decision and stage the reveal.
    ///
    /// On success the phase is already `Scanning` when this returns; the
    /// outcome phase and the notification arrive via scheduled transitions.
    pub async fn trigger_scan(
        &self,
        address: &str,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, WorkflowError> {
        if address.is_empty() {
            return Err(WorkflowError::EmptyAddress);
        }
        if self.monitor.status() != ConnectivityStatus::Connected {
            return Err(WorkflowError::NotConnected);
        }

        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if in_flight.as_deref() == Some(address) {
                debug!(%address, "scan already in flight, ignoring");
                return Err(WorkflowError::ScanInFlight);
            }
            *in_flight = Some(address.to_string());
        }

        let epoch = self.sequencer.current_epoch();
        self.sequencer.set_phase(epoch, WorkflowPhase::Scanning);

        let request = ScanRequest {
            wallet_address: address.to_string(),
            user_agent: self.user_agent.clone(),
            email: self.email.clone(),
            session_id: session.id().to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };

        info!(%address, "requesting eligibility scan");
        let outcome = self.backend.scan(&request).await;
        {
            // Only clear our own marker; a reset may have handed the slot
            // to a newer address while we were in flight.
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if in_flight.as_deref() == Some(address) {
                in_flight.take();
            }
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(%address, error = %e, "eligibility scan failed");
                // The scanning indicator must not hang on failure.
                self.sequencer.set_phase(epoch, WorkflowPhase::Idle);
                return Err(WorkflowError::ScanFailed(e.to_string()));
            }
        };

        if self.sequencer.current_epoch() != epoch {
            debug!(%address, "scan superseded by reconnect, discarding result");
            return Err(WorkflowError::ScanFailed(
                "scan superseded by reconnect".to_string(),
            ));
        }

        info!(
            %address,
            eligible = result.is_eligible,
            amount = result.amount(),
            "eligibility scan complete"
        );

        *self.last.lock().expect("scan result lock poisoned") = Some(ScannedAllocation {
            address: address.to_string(),
            epoch,
            result: result.clone(),
        });

        let outcome_phase = if result.is_eligible {
            WorkflowPhase::Eligible
        } else {
            WorkflowPhase::NotEligible
        };
        self.sequencer
            .schedule_phase(epoch, self.scan_settle, outcome_phase, cancel.child_token());
        self.sequencer.schedule_reveal(
            epoch,
            self.scan_settle + self.reveal_delay,
            cancel.child_token(),
        );

        Ok(result)
    }
}
