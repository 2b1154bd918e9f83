// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! Presale Engine - Headless Eligibility & Claim Workflow
//!
//! This crate qualifies a connected wallet for a token-allocation offer and
//! drives it through a signed claim: wallet-connectivity events, backend
//! health checks, a paced "scanning" phase, eligibility branching, message
//! signing, and claim submission, all under asynchronous and possibly
//! failing external calls. Presentation is out of scope; consumers observe
//! the workflow through read-only watch channels.
//!
//! ## Modules
//!
//! - `engine` - top-level workflow coordinator
//! - `scan` / `claim` - eligibility scan and claim orchestration
//! - `sequencer` - phase state machine with epoch-guarded writes
//! - `health` - backend connectivity monitor
//! - `session` - session identity and visit tracking
//! - `backend` - HTTP client for the presale backend API
//! - `wallet` - wallet-connectivity provider seam

pub mod backend;
pub mod claim;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod scan;
pub mod sequencer;
pub mod session;
pub mod wallet;

pub use backend::{BackendClient, BackendError};
pub use claim::{attestation_message, ClaimWorkflow, ClaimedHook};
pub use config::{ConfigError, EngineConfig};
pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use health::{ConnectivityStatus, HealthMonitor};
pub use models::{ClaimReceipt, ScanResult, TokenAllocation};
pub use scan::ScanOrchestrator;
pub use sequencer::{Sequencer, WorkflowPhase};
pub use session::{Session, VisitTracker};
pub use wallet::{ConnectionState, LocalKeyProvider, SignerError, WalletProvider};
