//! The login path: what success returns and how refusals look.

use std::time::Duration;

use crate::helpers::{self, TestVault, open_vault};

#[tokio::test]
async fn login_returns_session_and_unsealed_api_key() {
    let t = open_vault().await;
    let id = t.register("alice").await;

    let outcome = t.login("alice").await;
    assert_eq!(outcome.user_id, id);
    assert_eq!(outcome.username, "alice");
    assert_eq!(outcome.api_key, TestVault::api_key("alice"));
    assert_eq!(outcome.token.len(), 43);

    let session = t.vault.validate_session(&outcome.token).await.unwrap();
    assert_eq!(session.user_id, id);
    assert_eq!(session.username, "alice");
    assert_eq!(session.api_key, TestVault::api_key("alice"));
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_indistinguishable() {
    let t = open_vault().await;
    t.register("alice").await;

    let wrong = t.failed_login("alice").await.unwrap_err();
    let unknown = t.login_from("mallory", helpers::SOURCE).await.unwrap_err();

    assert!(wrong.is_invalid_credentials());
    assert!(unknown.is_invalid_credentials());
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn last_login_is_stamped_on_success() {
    let t = open_vault().await;
    t.register("alice").await;

    t.advance(Duration::from_secs(60 * 60));
    t.login("alice").await;

    let listed = t.vault.list_users().await.unwrap();
    assert_eq!(listed[0].last_login, Some(t.clock.get()));
}

#[tokio::test]
async fn every_attempt_lands_in_the_ledger() {
    let t = open_vault().await;
    t.register("alice").await;

    t.login("alice").await;
    let _ = t.failed_login("alice").await;
    let _ = t.login_from("mallory", helpers::SOURCE).await;

    // Three attempts, three optimistic failure rows. The success appended
    // its own row on top but that one does not count here.
    let recent = t
        .vault
        .attempts()
        .count_recent_failures(helpers::SOURCE, t.vault.policy().throttle_window)
        .await
        .unwrap();
    assert_eq!(recent, 3);
}
