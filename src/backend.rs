// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! HTTP client for the presale backend API.
//!
//! Four endpoints under the configured base path: health probe, visit
//! tracking, eligibility scan, and claim submission. Every call is bounded
//! by the configured request timeout; expiry surfaces as a normal
//! [`BackendError::Request`]. POST responses are parsed into the
//! `{success, data}` envelope and validated before use, so a duck-typed or
//! truncated body becomes a typed error rather than an unchecked fault.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::models::{ApiEnvelope, ClaimReceipt, ClaimRequest, HealthStatus, ScanRequest, ScanResult, VisitPayload};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("response was invalid: {0}")]
    InvalidResponse(String),

    #[error("backend reported failure: {0}")]
    Rejected(String),
}

/// Thin reqwest wrapper over the presale backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    pub fn new(config: &EngineConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BackendError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// One GET to the health endpoint. No retry loop here; retries are
    /// driven externally (manual or reconnect-triggered).
    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        let path = "/health";
        let response = self
            .http
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|e| BackendError::Request(format!("GET {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(BackendError::Request(format!(
                "GET {path} returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("GET {path} invalid JSON: {e}")))
    }

    /// Best-effort visit tracking. The response body is ignored; only the
    /// status code matters. Callers swallow the error.
    pub async fn track_visit(&self, payload: &VisitPayload) -> Result<(), BackendError> {
        let path = "/track/visit";
        let response = self
            .http
            .post(self.endpoint(path))
            .json(payload)
            .send()
            .await
            .map_err(|e| BackendError::Request(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(BackendError::Request(format!(
                "POST {path} returned {status}"
            )));
        }

        Ok(())
    }

    /// Eligibility scan for a connected wallet.
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, BackendError> {
        self.post_envelope("/presale/connect", request).await
    }

    /// Claim submission with the signed attestation.
    pub async fn claim(&self, request: &ClaimRequest) -> Result<ClaimReceipt, BackendError> {
        self.post_envelope("/presale/claim", request).await
    }

    async fn post_envelope<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Request(format!(
                "POST {path} returned {status}: {body}"
            )));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("POST {path} invalid JSON: {e}")))?;

        unwrap_envelope(envelope)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Validate the `{success, data}` envelope and extract the payload.
fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, BackendError> {
    if !envelope.success {
        return Err(BackendError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "backend returned success=false".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| BackendError::InvalidResponse("missing data in response".to_string()))
}
