//! Account creation: validation, duplicates, deletion, persistence.

use crate::helpers::{self, TestVault, open_vault};

#[tokio::test]
async fn register_creates_listable_accounts() {
    let t = open_vault().await;
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;
    assert_ne!(alice, bob);

    let listed = t.vault.list_users().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].username, "alice");
    assert_eq!(listed[1].username, "bob");
    assert!(listed.iter().all(|u| u.created_at == t.clock.get()));
    assert!(listed.iter().all(|u| u.last_login.is_none()));
}

#[tokio::test]
async fn rejected_inputs_never_reach_the_store() {
    let t = open_vault().await;

    let bad = [
        ("ab", helpers::PASSWORD, "pk-valid-key-0001"),
        ("alice!", helpers::PASSWORD, "pk-valid-key-0001"),
        ("alice", "alllowercase1", "pk-valid-key-0001"),
        ("alice", "Short1", "pk-valid-key-0001"),
        ("alice", helpers::PASSWORD, "pk_underscored"),
        ("alice", helpers::PASSWORD, "pk-short"),
    ];
    for (name, password, key) in bad {
        let err = t.vault.register(name, password, key).await.unwrap_err();
        assert!(err.is_validation_error(), "accepted {name}/{password}/{key}");
    }

    assert!(t.vault.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let t = open_vault().await;
    t.register("alice").await;

    let err = t
        .vault
        .register("alice", "OtherSecret2", "pk-other-key-0001")
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // The existing account is untouched by the failed re-registration.
    let outcome = t.login("alice").await;
    assert_eq!(outcome.api_key, TestVault::api_key("alice"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_duplicate_registration_keeps_exactly_one() {
    let t = open_vault().await;
    let a = t.vault.clone();
    let b = t.vault.clone();

    let first = tokio::spawn(async move {
        a.register("alice", helpers::PASSWORD, "pk-first-key-0001")
            .await
    });
    let second = tokio::spawn(async move {
        b.register("alice", helpers::PASSWORD, "pk-second-key-0001")
            .await
    });
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    // The storage uniqueness constraint decides the race: one row, one
    // conflict, regardless of interleaving.
    assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);
    let conflict = if first.is_err() {
        first.unwrap_err()
    } else {
        second.unwrap_err()
    };
    assert!(conflict.is_conflict());
    assert_eq!(t.vault.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn accounts_survive_reopen() {
    let t = open_vault().await;
    t.register("alice").await;

    let t = t.reopen().await;
    let outcome = t.login("alice").await;
    assert_eq!(outcome.username, "alice");
    // The sealed API key decrypts with the reloaded key file.
    assert_eq!(outcome.api_key, TestVault::api_key("alice"));
}

#[tokio::test]
async fn delete_user_reports_and_cascades() {
    let t = open_vault().await;
    t.register("alice").await;
    let session = t.login("alice").await;

    assert!(t.vault.delete_user("alice").await.unwrap());
    assert!(!t.vault.delete_user("alice").await.unwrap());

    let err = t.vault.validate_session(&session.token).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(t.vault.list_users().await.unwrap().is_empty());
}
