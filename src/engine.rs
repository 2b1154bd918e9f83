// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! # Workflow Engine
//!
//! Top-level coordinator wiring the session, health monitor, scan
//! orchestrator, claim workflow, and sequencer together. Connectivity
//! events (`handle_connect` / `handle_disconnect`) drive the state machine;
//! presentation observes it through the read-only watch channels.
//!
//! Each connect for a new address starts a fresh workflow instance: the
//! epoch advances, pending timers from the previous instance are cancelled,
//! and any in-flight future from the old instance is discarded when it
//! resolves. `shutdown` tears everything down the same way.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{BackendClient, BackendError};
use crate::claim::{ClaimWorkflow, ClaimedHook};
use crate::config::EngineConfig;
use crate::error::WorkflowError;
use crate::health::{ConnectivityStatus, HealthMonitor};
use crate::models::{ClaimReceipt, ScanResult};
use crate::scan::ScanOrchestrator;
use crate::sequencer::{Sequencer, WorkflowPhase};
use crate::session::{Session, VisitTracker};
use crate::wallet::WalletProvider;

pub struct WorkflowEngine {
    config: EngineConfig,
    session: Session,
    backend: Arc<BackendClient>,
    monitor: Arc<HealthMonitor>,
    sequencer: Arc<Sequencer>,
    scanner: ScanOrchestrator,
    claims: ClaimWorkflow,
    visits: VisitTracker,
    provider: Arc<dyn WalletProvider>,
    root: CancellationToken,
    // Per-workflow-instance token, regenerated on each connect.
    flow: Mutex<CancellationToken>,
}

impl WorkflowEngine {
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn WalletProvider>,
    ) -> Result<Self, BackendError> {
        Self::with_claimed_hook(config, provider, None)
    }

    /// Build an engine with an optional claim-completion hook.
    pub fn with_claimed_hook(
        config: EngineConfig,
        provider: Arc<dyn WalletProvider>,
        on_claimed: Option<ClaimedHook>,
    ) -> Result<Self, BackendError> {
        let backend = Arc::new(BackendClient::new(&config)?);
        let monitor = Arc::new(HealthMonitor::new(Arc::clone(&backend)));
        let sequencer = Arc::new(Sequencer::new());
        let session = Session::generate();
        info!(session = session.id(), "presale engine starting");

        let scanner = ScanOrchestrator::new(
            Arc::clone(&backend),
            Arc::clone(&monitor),
            Arc::clone(&sequencer),
            config.scan_settle,
            config.reveal_delay,
            config.user_agent.clone(),
            config.email.clone(),
        );
        let mut claims = ClaimWorkflow::new(
            Arc::clone(&backend),
            Arc::clone(&sequencer),
            config.claim_settle,
            config.email.clone(),
        );
        if let Some(hook) = on_claimed {
            claims = claims.with_claimed_hook(hook);
        }

        let root = CancellationToken::new();
        let flow = Mutex::new(root.child_token());

        Ok(Self {
            config,
            session,
            backend,
            monitor,
            sequencer,
            scanner,
            claims,
            visits: VisitTracker::new(),
            provider,
            root,
            flow,
        })
    }

    /// Probe the backend and record the visit for this session.
    pub async fn check_backend(&self) -> ConnectivityStatus {
        let status = self.monitor.check().await;
        if status == ConnectivityStatus::Connected {
            self.visits
                .track_once(&self.backend, &self.session, &self.config.user_agent);
        }
        status
    }

    /// React to the wallet reporting a connected address.
    ///
    /// Starts a new workflow instance unless a scan for this address is
    /// already in flight (ignored) or already resolved (returns the stored
    /// result without touching the network).
    pub async fn handle_connect(&self) -> Result<ScanResult, WorkflowError> {
        let state = self.provider.connection();
        let address = state
            .active_address()
            .ok_or(WorkflowError::WalletDisconnected)?
            .to_string();

        if self.scanner.in_flight_for(&address) {
            return Err(WorkflowError::ScanInFlight);
        }
        if let Some(existing) = self.scanner.result_for(&address) {
            debug!(%address, "address already scanned this pairing");
            return Ok(existing);
        }

        // New address (or first connect): fresh instance.
        self.sequencer.advance_epoch();
        self.scanner.reset();
        let token = self.renew_flow_token();

        if self.monitor.status() != ConnectivityStatus::Connected {
            self.monitor.check().await;
        }
        if self.monitor.status() == ConnectivityStatus::Connected {
            self.visits
                .track_once(&self.backend, &self.session, &self.config.user_agent);
        }

        self.scanner
            .trigger_scan(&address, &self.session, &token)
            .await
    }

    /// React to the wallet disconnecting: cancel pending timers, mark the
    /// epoch stale, and return to `Idle`.
    pub fn handle_disconnect(&self) {
        info!("wallet disconnected");
        self.flow.lock().expect("flow token lock poisoned").cancel();
        self.sequencer.advance_epoch();
        self.scanner.reset();
    }

    /// Run the claim workflow for the currently connected address using the
    /// stored scan result.
    pub async fn claim(&self) -> Result<ClaimReceipt, WorkflowError> {
        let state = self.provider.connection();
        let address = state
            .active_address()
            .ok_or(WorkflowError::WalletDisconnected)?
            .to_string();

        let scan = self
            .scanner
            .result_for(&address)
            .ok_or_else(|| WorkflowError::PhaseGuard(self.sequencer.phase()))?;

        let token = self.flow.lock().expect("flow token lock poisoned").clone();
        self.claims
            .claim(self.provider.as_ref(), &address, &scan, &self.session, &token)
            .await
    }

    /// Tear down: cancel every pending timer and mark the epoch stale so
    /// in-flight futures resolve into no-ops.
    pub fn shutdown(&self) {
        info!("presale engine shutting down");
        self.root.cancel();
        self.sequencer.advance_epoch();
    }

    fn renew_flow_token(&self) -> CancellationToken {
        let mut flow = self.flow.lock().expect("flow token lock poisoned");
        flow.cancel();
        *flow = self.root.child_token();
        flow.clone()
    }

    // -------------------------------------------------------------------------
    // Read-only accessors for presentation
    // -------------------------------------------------------------------------

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.sequencer.phase()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<WorkflowPhase> {
        self.sequencer.subscribe()
    }

    pub fn connectivity(&self) -> ConnectivityStatus {
        self.monitor.status()
    }

    pub fn subscribe_connectivity(&self) -> watch::Receiver<ConnectivityStatus> {
        self.monitor.subscribe()
    }

    pub fn reveal_visible(&self) -> bool {
        self.sequencer.reveal_visible()
    }

    pub fn subscribe_reveal(&self) -> watch::Receiver<bool> {
        self.sequencer.subscribe_reveal()
    }

    /// Stored scan result for the currently connected address.
    pub fn scan_result(&self) -> Option<ScanResult> {
        let address = self.provider.connection().active_address()?.to_string();
        self.scanner.result_for(&address)
    }

    /// Stored claim receipt for the currently connected address.
    pub fn receipt(&self) -> Option<ClaimReceipt> {
        let address = self.provider.connection().active_address()?.to_string();
        self.claims.receipt_for(&address)
    }
}
