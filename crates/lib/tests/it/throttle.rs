//! Per-source throttling: the guard that runs before anything else.

use std::time::Duration;

use crate::helpers::{SOURCE, open_vault};

#[tokio::test]
async fn ten_failures_throttle_the_source_for_everyone() {
    let t = open_vault().await;
    t.register("alice").await;

    // Probes against names that do not exist consume slots like any other
    // failure.
    for i in 0..10 {
        let err = t
            .login_from(&format!("ghost{i}"), SOURCE)
            .await
            .unwrap_err();
        assert!(err.is_invalid_credentials());
    }

    let err = t.login_from("alice", SOURCE).await.unwrap_err();
    assert!(err.is_rate_limited());

    // The throttled attempt was turned away before anything was recorded:
    // no new ledger row, no lockout progress for alice.
    let recent = t
        .vault
        .attempts()
        .count_recent_failures(SOURCE, t.vault.policy().throttle_window)
        .await
        .unwrap();
    assert_eq!(recent, 10);
    let record = t
        .vault
        .users()
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.failed_login_attempts, 0);
}

#[tokio::test]
async fn throttle_is_per_source() {
    let t = open_vault().await;
    t.register("alice").await;
    for i in 0..10 {
        let _ = t.login_from(&format!("ghost{i}"), SOURCE).await;
    }

    assert!(
        t.login_from("alice", SOURCE)
            .await
            .unwrap_err()
            .is_rate_limited()
    );
    t.login_from("alice", "10.99.0.2").await.unwrap();
}

#[tokio::test]
async fn throttle_clears_when_the_window_slides_past() {
    let t = open_vault().await;
    t.register("alice").await;
    for i in 0..10 {
        let _ = t.login_from(&format!("ghost{i}"), SOURCE).await;
    }
    assert!(
        t.login_from("alice", SOURCE)
            .await
            .unwrap_err()
            .is_rate_limited()
    );

    t.advance(Duration::from_secs(16 * 60));
    t.login_from("alice", SOURCE).await.unwrap();
}

#[tokio::test]
async fn every_attempt_consumes_a_throttle_slot() {
    // A login lands in the ledger as a failure before its outcome is known,
    // and a success does not take that row back. Ten logins inside one
    // window therefore throttle even a well-behaved client.
    let t = open_vault().await;
    t.register("alice").await;

    for _ in 0..10 {
        t.login_from("alice", SOURCE).await.unwrap();
    }

    let err = t.login_from("alice", SOURCE).await.unwrap_err();
    assert!(err.is_rate_limited());
}
