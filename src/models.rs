// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! # Wire and Domain Models
//!
//! Request and response data structures exchanged with the presale backend.
//! The backend is a JavaScript service, so every field is camelCase on the
//! wire; the serde renames below keep the Rust side idiomatic.
//!
//! ## Model Categories
//!
//! - **Envelope**: the `{success, data}` wrapper every POST endpoint returns
//! - **Scan**: eligibility decision and token allocation for a wallet
//! - **Claim**: signed attestation submission and its receipt
//! - **Visit**: best-effort visit tracking payload

use serde::{Deserialize, Serialize};

// =============================================================================
// Response Envelope
// =============================================================================

/// Standard response wrapper used by the presale backend.
///
/// A well-formed success response carries `success: true` and a `data`
/// payload. Anything else (missing data, `success: false`) is treated as a
/// rejection by [`crate::backend::BackendClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Health
// =============================================================================

/// Body of `GET /health`. Extra fields are ignored; only `status` matters.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    /// Whether the probe reports a usable backend.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

// =============================================================================
// Visit Tracking
// =============================================================================

/// Body of `POST /track/visit`. Best-effort telemetry; the response is ignored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPayload {
    pub user_agent: String,
    pub referrer: String,
    pub screen_resolution: String,
    pub session_id: String,
}

// =============================================================================
// Eligibility Scan
// =============================================================================

/// Body of `POST /presale/connect`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub wallet_address: String,
    pub user_agent: String,
    pub email: String,
    pub session_id: String,
    /// Unix millis at the moment the scan was requested.
    pub timestamp: i64,
}

/// Token allocation attached to an eligible scan result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAllocation {
    pub amount: f64,
    #[serde(rename = "valueUSD")]
    pub value_usd: f64,
}

/// Eligibility decision for one wallet address.
///
/// Created once per successful scan call and immutable afterwards; a new
/// result is produced only when the wallet disconnects and reconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub is_eligible: bool,
    #[serde(default)]
    pub token_allocation: Option<TokenAllocation>,
}

impl ScanResult {
    /// Allocation amount, zero when the wallet is not eligible.
    pub fn amount(&self) -> f64 {
        self.token_allocation.as_ref().map_or(0.0, |a| a.amount)
    }

    /// Allocation USD value, zero when the wallet is not eligible.
    pub fn value_usd(&self) -> f64 {
        self.token_allocation.as_ref().map_or(0.0, |a| a.value_usd)
    }
}

// =============================================================================
// Claim
// =============================================================================

/// Body of `POST /presale/claim`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub wallet_address: String,
    pub signature: String,
    pub message: String,
    pub claim_amount: f64,
    pub claim_value: f64,
    pub session_id: String,
    pub email: String,
}

/// Confirmation data returned by a successful claim submission.
///
/// At most one receipt exists per (session, address) pair; a second claim
/// attempt is rejected locally before any network traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    #[serde(default)]
    pub claim_id: Option<String>,
    pub wallet_address: String,
    pub claim_amount: f64,
    pub claim_value: f64,
    #[serde(default)]
    pub confirmed_at: Option<String>,
}
