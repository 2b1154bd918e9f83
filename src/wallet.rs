// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! Wallet-connectivity provider seam.
//!
//! The engine consumes an opaque external capability: connection state, a
//! disconnect action, and a message-signing action. Connection state is
//! externally owned and must never be assumed stable across ticks - it can
//! flip to disconnected at any time.
//!
//! [`LocalKeyProvider`] is the concrete provider used by the headless
//! binary: a k256 ECDSA key held in memory, signing the attestation text
//! over a SHA-256 digest.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use k256::ecdsa::{signature::Signer, Signature, SigningKey};

/// Errors from the signing provider.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The signer (or its user) declined the request.
    #[error("signing rejected: {0}")]
    Rejected(String),

    /// The provider itself failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// The supplied key material could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Snapshot of the wallet connection at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub address: Option<String>,
}

impl ConnectionState {
    /// The connected, non-empty address if there is one.
    pub fn active_address(&self) -> Option<&str> {
        if !self.connected {
            return None;
        }
        self.address.as_deref().filter(|a| !a.is_empty())
    }
}

/// External wallet-connectivity capability consumed by the engine.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Current connection snapshot.
    fn connection(&self) -> ConnectionState;

    /// Sign an advisory attestation message. The message is plain text, not
    /// a transaction; it must not authorize fund movement.
    async fn sign_message(&self, message: &str) -> Result<String, SignerError>;

    /// Drop the connection.
    fn disconnect(&self);
}

/// Wallet provider backed by a locally held secp256k1 key.
pub struct LocalKeyProvider {
    key: SigningKey,
    address: String,
    connected: AtomicBool,
}

impl LocalKeyProvider {
    /// Build a provider from a hex-encoded 32-byte private key and the
    /// wallet address it controls.
    pub fn from_hex(key_hex: &str, address: impl Into<String>) -> Result<Self, SignerError> {
        let raw = hex::decode(key_hex.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidKey(format!("not hex: {e}")))?;
        let key = SigningKey::from_slice(&raw)
            .map_err(|e| SignerError::InvalidKey(format!("not a valid secp256k1 key: {e}")))?;
        Ok(Self {
            key,
            address: address.into(),
            connected: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl WalletProvider for LocalKeyProvider {
    fn connection(&self) -> ConnectionState {
        let connected = self.connected.load(Ordering::SeqCst);
        ConnectionState {
            connected,
            address: connected.then(|| self.address.clone()),
        }
    }

    async fn sign_message(&self, message: &str) -> Result<String, SignerError> {
        // RFC 6979 deterministic ECDSA over the SHA-256 digest of the text.
        let signature: Signature = self
            .key
            .try_sign(message.as_bytes())
            .map_err(|e| SignerError::Provider(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.to_bytes())))
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}
