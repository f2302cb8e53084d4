//! Per-account lockout: counting, expiry, and independence from sources.

use std::time::Duration;

use crate::helpers::{SOURCE, open_vault};

#[tokio::test]
async fn five_failures_lock_until_the_window_passes() {
    let t = open_vault().await;
    t.register("alice").await;

    for _ in 0..5 {
        let err = t.failed_login("alice").await.unwrap_err();
        assert!(err.is_invalid_credentials());
    }

    // The correct password is refused while the lock holds.
    let err = t.login_from("alice", SOURCE).await.unwrap_err();
    assert!(err.is_account_locked());

    // 31 minutes later the lock has expired and the correct password works.
    t.advance(Duration::from_secs(31 * 60));
    let outcome = t.login_from("alice", SOURCE).await.unwrap();
    assert_eq!(outcome.username, "alice");

    // The success reset the counter and the lock.
    let record = t
        .vault
        .users()
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.failed_login_attempts, 0);
    assert_eq!(record.locked_until, None);
}

#[tokio::test]
async fn attempts_while_locked_do_not_feed_the_counter() {
    let t = open_vault().await;
    t.register("alice").await;
    for _ in 0..5 {
        let _ = t.failed_login("alice").await;
    }

    // The lock is checked before the password, so a locked attempt neither
    // verifies nor counts.
    let err = t.failed_login("alice").await.unwrap_err();
    assert!(err.is_account_locked());

    let record = t
        .vault
        .users()
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.failed_login_attempts, 5);
}

#[tokio::test]
async fn wrong_password_after_expiry_relocks_at_once() {
    let t = open_vault().await;
    t.register("alice").await;
    for _ in 0..5 {
        let _ = t.failed_login("alice").await;
    }

    t.advance(Duration::from_secs(31 * 60));

    // Only a success resets the counter. The first failure after the lock
    // expires pushes it past the threshold again and re-locks on the spot.
    let err = t.failed_login("alice").await.unwrap_err();
    assert!(err.is_invalid_credentials());

    let err = t.login_from("alice", SOURCE).await.unwrap_err();
    assert!(err.is_account_locked());
}

#[tokio::test]
async fn lockout_follows_the_account_across_sources() {
    let t = open_vault().await;
    t.register("alice").await;
    t.register("bob").await;

    for _ in 0..5 {
        let _ = t.failed_login_from("alice", "10.0.0.1").await;
    }

    // Locked for alice from everywhere; no effect on bob anywhere.
    let err = t.login_from("alice", "192.168.7.7").await.unwrap_err();
    assert!(err.is_account_locked());
    t.login_from("bob", "10.0.0.1").await.unwrap();
}
