// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! Workflow error taxonomy.
//!
//! Every variant is recoverable: errors are surfaced as observable
//! phase/status values for a consumer to render, and the workflow always has
//! a path back to a stable, user-actionable state. Nothing here terminates
//! the process.

use crate::sequencer::WorkflowPhase;

/// Errors produced by the scan and claim workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Backend unreachable or health probe failed. User-retriable.
    #[error("backend unreachable: {0}")]
    Connectivity(String),

    /// Scan request failed; the phase reverts to `Idle`. Auto-retried only
    /// on the next qualifying reconnect.
    #[error("eligibility scan failed: {0}")]
    ScanFailed(String),

    /// The wallet declined to sign the attestation. The phase stays
    /// `Eligible`, so the claim can be retried.
    #[error("signature request denied: {0}")]
    SignatureDenied(String),

    /// The backend rejected the claim submission. The phase stays `Eligible`.
    #[error("claim rejected by backend: {0}")]
    ClaimRejected(String),

    /// A receipt already exists for this (session, address) pair. Rejected
    /// locally; never reaches the network.
    #[error("allocation already claimed for this address")]
    AlreadyClaimed,

    /// Local guard: the backend has not passed a health check.
    #[error("backend is not connected; health check required")]
    NotConnected,

    /// Local guard: the wallet provider reports no connected address.
    #[error("wallet is not connected")]
    WalletDisconnected,

    /// Local guard: the wallet address is empty.
    #[error("wallet address is empty")]
    EmptyAddress,

    /// Local guard: a scan is already in flight for this address; the new
    /// request is ignored and no network call is made.
    #[error("a scan is already in flight for this address")]
    ScanInFlight,

    /// Local guard: the scan result marks this wallet as not eligible.
    #[error("wallet is not eligible for an allocation")]
    NotEligible,

    /// Local guard: claiming requires the `Eligible` phase.
    #[error("claim requires the Eligible phase, current phase is {0:?}")]
    PhaseGuard(WorkflowPhase),
}
