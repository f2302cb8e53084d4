//! The background sweep and the liveness probe.

use std::time::Duration;

use portcullis::{Maintenance, Policy, Vault, VaultConfig};

use crate::helpers::{CLIENT, PASSWORD, SOURCE, open_vault};

#[tokio::test]
async fn requested_sweep_clears_expired_state() {
    let t = open_vault().await;
    t.register("alice").await;
    let outcome = t.login("alice").await;
    let maintenance = Maintenance::start(&t.vault);

    // One day past the session, one more hour past ledger retention.
    t.advance(Duration::from_secs(25 * 60 * 60));

    let report = maintenance.sweep_now().await.unwrap();
    assert_eq!(report.sessions_removed, 1);
    // The login left two rows: the optimistic failure and the success.
    assert_eq!(report.attempts_purged, 2);

    let err = t.vault.validate_session(&outcome.token).await.unwrap_err();
    assert!(err.is_unauthenticated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timer_sweep_runs_without_being_asked() {
    let dir = tempfile::tempdir().unwrap();
    let policy = Policy {
        session_ttl: Duration::from_millis(200),
        sweep_period: Duration::from_millis(50),
        ..Policy::default()
    };
    // Wall-clock vault: the session genuinely expires while we sleep.
    let vault = Vault::open(VaultConfig::in_dir(dir.path()).with_policy(policy))
        .await
        .unwrap();
    let maintenance = Maintenance::start(&vault);

    vault
        .register("alice", PASSWORD, "pk-alice-key-0001")
        .await
        .unwrap();
    vault.login("alice", PASSWORD, SOURCE, CLIENT).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;

    // The timer got there first; a manual sweep finds nothing left.
    let report = maintenance.sweep_now().await.unwrap();
    assert_eq!(report.sessions_removed, 0);
    vault.close().await;
}

#[tokio::test]
async fn liveness_probe_tracks_the_store() {
    let t = open_vault().await;
    assert!(t.vault.liveness_probe().await);

    t.vault.close().await;
    assert!(!t.vault.liveness_probe().await);
}
