// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! # Phase Sequencer
//!
//! Single source of truth for [`WorkflowPhase`]. All phase writes funnel
//! through [`Sequencer::set_phase`], which discards any write tagged with a
//! stale epoch. The epoch is a monotonically increasing counter advanced on
//! every reconnect, disconnect, or teardown, so completion callbacks from a
//! superseded workflow instance become no-ops on resolution.
//!
//! Delayed transitions (the settle and reveal delays) are scheduled through
//! [`Sequencer::schedule_phase`] / [`Sequencer::schedule_reveal`]: a tokio
//! sleep raced against a `CancellationToken`, the same shutdown idiom the
//! backend pollers use. No timer fires after teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The engine's own workflow state. Exactly one phase is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Scanning,
    Eligible,
    NotEligible,
    Claiming,
    Claimed,
}

pub struct Sequencer {
    phase: watch::Sender<WorkflowPhase>,
    reveal: watch::Sender<bool>,
    // Guards epoch reads and phase writes together so a stale write can
    // never land between an epoch bump and the phase reset.
    epoch: Mutex<u64>,
}

impl Sequencer {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(WorkflowPhase::Idle);
        let (reveal, _) = watch::channel(false);
        Self {
            phase,
            reveal,
            epoch: Mutex::new(0),
        }
    }

    /// Current phase snapshot.
    pub fn phase(&self) -> WorkflowPhase {
        *self.phase.borrow()
    }

    /// Read-only phase subscription for presentation.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowPhase> {
        self.phase.subscribe()
    }

    /// Whether the outcome notification is currently visible.
    pub fn reveal_visible(&self) -> bool {
        *self.reveal.borrow()
    }

    /// Read-only reveal subscription for presentation.
    pub fn subscribe_reveal(&self) -> watch::Receiver<bool> {
        self.reveal.subscribe()
    }

    pub fn current_epoch(&self) -> u64 {
        *self.epoch.lock().expect("epoch lock poisoned")
    }

    /// Start a new workflow instance: bump the epoch, reset the phase to
    /// `Idle`, and hide any visible notification. Everything scheduled under
    /// the previous epoch is discarded when it resolves.
    pub fn advance_epoch(&self) -> u64 {
        let mut epoch = self.epoch.lock().expect("epoch lock poisoned");
        *epoch += 1;
        self.phase.send_replace(WorkflowPhase::Idle);
        self.reveal.send_replace(false);
        *epoch
    }

    /// Apply a phase transition if `epoch` is still current.
    ///
    /// Returns `false` when the write was discarded as stale.
    pub fn set_phase(&self, epoch: u64, phase: WorkflowPhase) -> bool {
        let current = self.epoch.lock().expect("epoch lock poisoned");
        if *current != epoch {
            debug!(?phase, stale = epoch, current = *current, "discarding stale phase write");
            return false;
        }
        self.phase.send_replace(phase);
        true
    }

    /// Make the outcome notification visible if `epoch` is still current.
    pub fn set_reveal(&self, epoch: u64, visible: bool) -> bool {
        let current = self.epoch.lock().expect("epoch lock poisoned");
        if *current != epoch {
            debug!(stale = epoch, current = *current, "discarding stale reveal write");
            return false;
        }
        self.reveal.send_replace(visible);
        true
    }

    /// Schedule a phase transition after `delay`, cancellable via `token`
    /// and discarded if the epoch moves on before the timer fires.
    pub fn schedule_phase(
        self: &Arc<Self>,
        epoch: u64,
        delay: Duration,
        phase: WorkflowPhase,
        token: CancellationToken,
    ) {
        let sequencer = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    sequencer.set_phase(epoch, phase);
                }
                () = token.cancelled() => {
                    debug!(?phase, "scheduled phase transition cancelled");
                }
            }
        });
    }

    /// Schedule the reveal flag after `delay`, with the same cancellation
    /// and staleness rules as [`Sequencer::schedule_phase`].
    pub fn schedule_reveal(self: &Arc<Self>, epoch: u64, delay: Duration, token: CancellationToken) {
        let sequencer = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    sequencer.set_reveal(epoch, true);
                }
                () = token.cancelled() => {
                    debug!("scheduled reveal cancelled");
                }
            }
        });
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
