// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Presale Engine Developers

//! End-to-end workflow tests against a mocked backend.
//!
//! Delays are shortened through the config so the staged reveal can be
//! observed without multi-second sleeps; checkpoints leave generous margins
//! around each timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use presale_engine::{
    ConnectionState, ConnectivityStatus, EngineConfig, SignerError, WalletProvider,
    WorkflowEngine, WorkflowError, WorkflowPhase,
};

const ADDRESS: &str = "0xaaa0000000000000000000000000000000000001";
const OTHER_ADDRESS: &str = "0xbbb0000000000000000000000000000000000002";

/// Settle delay used by every test config.
const SETTLE: Duration = Duration::from_millis(200);

/// Wallet double with a switchable address and an optional signing veto.
struct TestWallet {
    address: Mutex<Option<String>>,
    deny_signing: AtomicBool,
}

impl TestWallet {
    fn connected(address: &str) -> Arc<Self> {
        Arc::new(Self {
            address: Mutex::new(Some(address.to_string())),
            deny_signing: AtomicBool::new(false),
        })
    }

    fn set_address(&self, address: &str) {
        *self.address.lock().unwrap() = Some(address.to_string());
    }

    fn set_deny_signing(&self, deny: bool) {
        self.deny_signing.store(deny, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletProvider for TestWallet {
    fn connection(&self) -> ConnectionState {
        let address = self.address.lock().unwrap().clone();
        ConnectionState {
            connected: address.is_some(),
            address,
        }
    }

    async fn sign_message(&self, _message: &str) -> Result<String, SignerError> {
        if self.deny_signing.load(Ordering::SeqCst) {
            return Err(SignerError::Rejected("user declined".into()));
        }
        Ok("0xtest-signature".to_string())
    }

    fn disconnect(&self) {
        self.address.lock().unwrap().take();
    }
}

fn test_config(server: &MockServer) -> EngineConfig {
    EngineConfig {
        base_url: format!("{}/api", server.uri()),
        request_timeout: Duration::from_secs(5),
        scan_settle: SETTLE,
        reveal_delay: SETTLE,
        claim_settle: SETTLE,
        email: None,
        user_agent: "presale-engine-tests".to_string(),
    }
}

async fn mount_health_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(server)
        .await;
}

async fn mount_visit_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/track/visit"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn eligible_scan_body() -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "isEligible": true,
            "tokenAllocation": { "amount": 1000.0, "valueUSD": 500.0 }
        }
    })
}

fn not_eligible_scan_body() -> serde_json::Value {
    json!({ "success": true, "data": { "isEligible": false } })
}

fn receipt_body(address: &str) -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "claimId": "claim-1",
            "walletAddress": address,
            "claimAmount": 1000.0,
            "claimValue": 500.0,
            "confirmedAt": "2026-08-30T12:00:00Z"
        }
    })
}

#[tokio::test]
async fn visit_is_tracked_at_most_once() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/track/visit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(eligible_scan_body()))
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    assert_eq!(engine.check_backend().await, ConnectivityStatus::Connected);
    assert_eq!(engine.check_backend().await, ConnectivityStatus::Connected);
    engine.handle_connect().await.unwrap();
    // Second connect for the same address reuses the stored result.
    engine.handle_connect().await.unwrap();

    // Let the detached visit task finish before the server verifies.
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn eligible_scan_stages_the_reveal() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(eligible_scan_body()))
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    let result = engine.handle_connect().await.unwrap();
    assert!(result.is_eligible);
    assert_eq!(result.amount(), 1000.0);
    assert_eq!(result.value_usd(), 500.0);

    // The outcome must not be observable before the settle delay.
    assert_eq!(engine.phase(), WorkflowPhase::Scanning);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Scanning);
    assert!(!engine.reveal_visible());

    // Past the settle delay: Eligible, notification still hidden.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Eligible);
    assert!(!engine.reveal_visible());

    // Past the reveal delay: notification visible.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Eligible);
    assert!(engine.reveal_visible());
}

#[tokio::test]
async fn not_eligible_scan_blocks_claiming() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(not_eligible_scan_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/presale/claim"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    let result = engine.handle_connect().await.unwrap();
    assert!(!result.is_eligible);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.phase(), WorkflowPhase::NotEligible);

    let err = engine.claim().await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::PhaseGuard(WorkflowPhase::NotEligible)
    ));
}

#[tokio::test]
async fn claim_produces_exactly_one_receipt() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(eligible_scan_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/presale/claim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(receipt_body(ADDRESS)))
        .expect(1)
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    engine.handle_connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Eligible);

    let receipt = engine.claim().await.unwrap();
    assert_eq!(receipt.claim_id.as_deref(), Some("claim-1"));
    assert_eq!(engine.phase(), WorkflowPhase::Claiming);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Claimed);

    // Second attempt is rejected locally; expect(1) above proves no second
    // request reached the network.
    let err = engine.claim().await.unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyClaimed));
    assert!(engine.receipt().is_some());
}

#[tokio::test]
async fn failed_scan_reverts_to_idle() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    let err = engine.handle_connect().await.unwrap_err();
    assert!(matches!(err, WorkflowError::ScanFailed(_)));
    assert_eq!(engine.phase(), WorkflowPhase::Idle);

    // No eligibility transition may ever occur.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Idle);
    assert!(!engine.reveal_visible());
}

#[tokio::test]
async fn scan_is_refused_without_a_connected_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    // A failed probe must suppress the best-effort visit as well.
    Mock::given(method("POST"))
        .and(path("/api/track/visit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    assert_eq!(engine.check_backend().await, ConnectivityStatus::Error);
    let err = engine.handle_connect().await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotConnected));
    assert_eq!(engine.phase(), WorkflowPhase::Idle);

    // Give a stray detached visit task the chance to land before the server
    // verifies its expectations.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn stale_scan_never_applies_to_a_new_address() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    // First address answers slowly and eligible; the second answers
    // immediately and not eligible.
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .and(body_partial_json(json!({ "walletAddress": ADDRESS })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(eligible_scan_body())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .and(body_partial_json(json!({ "walletAddress": OTHER_ADDRESS })))
        .respond_with(ResponseTemplate::new(200).set_body_json(not_eligible_scan_body()))
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = Arc::new(
        WorkflowEngine::new(test_config(&server), Arc::clone(&wallet) as Arc<dyn WalletProvider>).unwrap(),
    );
    engine.check_backend().await;

    let slow_scan = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.handle_connect().await }
    });

    // Address changes while the first scan is still in flight.
    tokio::time::sleep(Duration::from_millis(100)).await;
    wallet.set_address(OTHER_ADDRESS);
    let result = engine.handle_connect().await.unwrap();
    assert!(!result.is_eligible);

    // The first scan resolves after the epoch moved on: its result must be
    // discarded rather than applied to the new address.
    let stale = slow_scan.await.unwrap();
    assert!(stale.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.phase(), WorkflowPhase::NotEligible);
}

#[tokio::test]
async fn concurrent_scan_for_the_same_address_is_ignored() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    // The slow response keeps the first scan in flight while the second
    // call arrives; expect(1) proves the second call never hit the network.
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(eligible_scan_body())
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = Arc::new(WorkflowEngine::new(test_config(&server), wallet).unwrap());
    engine.check_backend().await;

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.handle_connect().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let err = engine.handle_connect().await.unwrap_err();
    assert!(matches!(err, WorkflowError::ScanInFlight));

    // The original scan is unaffected by the ignored call.
    let result = first.await.unwrap().unwrap();
    assert!(result.is_eligible);
}

#[tokio::test]
async fn teardown_invalidates_the_stored_scan_result() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(eligible_scan_body()))
        .expect(2)
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine = WorkflowEngine::new(test_config(&server), wallet).unwrap();

    engine.handle_connect().await.unwrap();
    assert!(engine.scan_result().is_some());

    // Teardown advances the epoch without touching the orchestrator's
    // storage, so the entry must become unreachable instead of being served
    // to a later connect for the same address.
    engine.shutdown();
    assert!(engine.scan_result().is_none());

    // expect(2) above proves the reconnect went back to the network.
    let fresh = engine.handle_connect().await.unwrap();
    assert!(fresh.is_eligible);
}

#[tokio::test]
async fn denied_signature_keeps_the_claim_retriable() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(eligible_scan_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/presale/claim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(receipt_body(ADDRESS)))
        .expect(1)
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    wallet.set_deny_signing(true);
    let engine =
        WorkflowEngine::new(test_config(&server), Arc::clone(&wallet) as Arc<dyn WalletProvider>).unwrap();

    engine.handle_connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Eligible);

    let err = engine.claim().await.unwrap_err();
    assert!(matches!(err, WorkflowError::SignatureDenied(_)));
    // Recoverable: still Eligible, so the user can retry.
    assert_eq!(engine.phase(), WorkflowPhase::Eligible);

    wallet.set_deny_signing(false);
    engine.claim().await.unwrap();
    assert_eq!(engine.phase(), WorkflowPhase::Claiming);
}

#[tokio::test]
async fn disconnect_cancels_the_pending_reveal() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;
    mount_visit_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/presale/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(eligible_scan_body()))
        .mount(&server)
        .await;

    let wallet = TestWallet::connected(ADDRESS);
    let engine =
        WorkflowEngine::new(test_config(&server), Arc::clone(&wallet) as Arc<dyn WalletProvider>).unwrap();

    engine.handle_connect().await.unwrap();
    assert_eq!(engine.phase(), WorkflowPhase::Scanning);

    wallet.disconnect();
    engine.handle_disconnect();
    assert_eq!(engine.phase(), WorkflowPhase::Idle);

    // No dangling timer may fire after teardown.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.phase(), WorkflowPhase::Idle);
    assert!(!engine.reveal_visible());
}
