// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! Connectivity health monitor.
//!
//! Owns the tri-state [`ConnectivityStatus`] and is the only component that
//! mutates it. One probe per [`HealthMonitor::check`] call; there is no
//! automatic retry loop. A retry is simply a fresh `check()`, triggered
//! manually or by a reconnect event. Failure is reported, never fatal.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::{BackendClient, BackendError};
use crate::models::HealthStatus;

/// Reachability of the presale backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    /// A probe is in flight (also the initial state).
    Checking,
    /// The last probe returned a well-formed success.
    Connected,
    /// The last probe failed: network error, timeout, non-2xx, or a
    /// malformed or degraded body.
    Error,
}

pub struct HealthMonitor {
    backend: Arc<BackendClient>,
    status: watch::Sender<ConnectivityStatus>,
}

impl HealthMonitor {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let (status, _) = watch::channel(ConnectivityStatus::Checking);
        Self { backend, status }
    }

    /// Current status snapshot.
    pub fn status(&self) -> ConnectivityStatus {
        *self.status.borrow()
    }

    /// Read-only subscription for presentation.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.status.subscribe()
    }

    /// Issue one health probe and update the status.
    pub async fn check(&self) -> ConnectivityStatus {
        self.status.send_replace(ConnectivityStatus::Checking);
        let next = status_from_probe(self.backend.health().await);
        match next {
            ConnectivityStatus::Connected => info!("backend health probe succeeded"),
            _ => warn!("backend health probe failed"),
        }
        self.status.send_replace(next);
        next
    }
}

/// Map a probe outcome to a connectivity status.
fn status_from_probe(outcome: Result<HealthStatus, BackendError>) -> ConnectivityStatus {
    match outcome {
        Ok(health) if health.is_ok() => ConnectivityStatus::Connected,
        Ok(health) => {
            warn!(status = %health.status, "backend reported non-ok health");
            ConnectivityStatus::Error
        }
        Err(e) => {
            warn!(error = %e, "health probe error");
            ConnectivityStatus::Error
        }
    }
}
