// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! Session identity and once-per-session visit tracking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::models::VisitPayload;

/// Opaque process-lifetime identifier correlating a user's actions across
/// backend calls. Generated once at startup, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
}

impl Session {
    /// Generate a fresh session id.
    ///
    /// Uniqueness only needs low collision probability; millisecond
    /// timestamp plus a random suffix is sufficient.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("session-{}-{}", Utc::now().timestamp_millis(), &suffix[..12]),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Fires one best-effort "visit observed" event per session.
///
/// The POST runs as a detached task; failure is logged and swallowed so
/// visit tracking can never block or fail the rest of the workflow.
#[derive(Debug, Default)]
pub struct VisitTracker {
    sent: AtomicBool,
}

impl VisitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch the visit event if it has not been sent yet.
    ///
    /// Returns `true` when a request was dispatched, `false` when this call
    /// was a no-op. At most one network call is ever issued regardless of
    /// how often this is invoked.
    pub fn track_once(&self, backend: &Arc<BackendClient>, session: &Session, user_agent: &str) -> bool {
        if self.sent.swap(true, Ordering::SeqCst) {
            debug!("visit already tracked for this session");
            return false;
        }

        let payload = VisitPayload {
            user_agent: user_agent.to_string(),
            referrer: String::new(),
            screen_resolution: "headless".to_string(),
            session_id: session.id().to_string(),
        };

        let backend = Arc::clone(backend);
        tokio::spawn(async move {
            if let Err(e) = backend.track_visit(&payload).await {
                warn!(error = %e, "visit tracking failed");
            }
        });
        true
    }
}
