/// In-memory store tests
///
/// Transaction isolation of the reference store: no-wait row claims,
/// compare-and-swap on the version column, atomic commit, rollback on drop.
/// Run with: cargo test --test memory_store_tests
mod common;

use common::{POST, seeded_store};
use liketoggle::{
    ActorId, AggregateCounter, CounterDelta, LikeStore, LikeTransaction, MembershipKey,
    MembershipStore, StoreError,
};

fn key(actor: &str) -> MembershipKey {
    MembershipKey::new(POST, ActorId::from(actor))
}

#[tokio::test]
async fn test_staged_writes_are_invisible_until_commit() {
    let store = seeded_store(1);
    let alice = key("alice");

    let mut tx = store.begin().await.unwrap();
    tx.insert(&alice).await.unwrap();
    let staged = tx
        .conditional_write(POST, 0, CounterDelta::Increment)
        .await
        .unwrap();
    assert_eq!((staged.count, staged.version), (1, 1));

    // Own writes are visible inside the transaction.
    assert!(tx.exists(&alice).await.unwrap());
    assert_eq!(tx.read_with_version(POST).await.unwrap(), staged);

    let mut reader = store.begin().await.unwrap();
    assert!(!reader.exists(&alice).await.unwrap());
    assert_eq!(reader.read_with_version(POST).await.unwrap().count, 0);
    assert_eq!(store.membership_count(POST).unwrap(), 0);

    tx.commit().await.unwrap();
    assert!(reader.exists(&alice).await.unwrap());
    assert_eq!(store.committed_counter(POST).unwrap(), staged);
    reader.rollback().await.unwrap();
    assert_eq!(store.pending_claims().unwrap(), 0);
}

#[tokio::test]
async fn test_claimed_rows_fail_fast_for_other_transactions() {
    let store = seeded_store(1);
    let alice = key("alice");

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();

    first.insert(&alice).await.unwrap();
    assert_eq!(
        second.insert(&alice).await.unwrap_err(),
        StoreError::AlreadyExists(alice.clone())
    );

    first
        .conditional_write(POST, 0, CounterDelta::Increment)
        .await
        .unwrap();
    assert!(matches!(
        second
            .conditional_write(POST, 0, CounterDelta::Increment)
            .await
            .unwrap_err(),
        StoreError::VersionConflict { expected: 0, .. }
    ));

    first.commit().await.unwrap();
    second.rollback().await.unwrap();

    // Unliking a committed like is claimed the same way.
    let mut third = store.begin().await.unwrap();
    let mut fourth = store.begin().await.unwrap();
    third.delete(&alice).await.unwrap();
    assert_eq!(
        fourth.delete(&alice).await.unwrap_err(),
        StoreError::MembershipNotFound(alice.clone())
    );
    drop(third);
    drop(fourth);
    assert_eq!(store.membership_count(POST).unwrap(), 1);
    assert_eq!(store.pending_claims().unwrap(), 0);
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let store = seeded_store(1);

    let mut stale = store.begin().await.unwrap();
    let seen = stale.read_with_version(POST).await.unwrap();

    let mut winner = store.begin().await.unwrap();
    winner.insert(&key("bob")).await.unwrap();
    winner
        .conditional_write(POST, seen.version, CounterDelta::Increment)
        .await
        .unwrap();
    winner.commit().await.unwrap();

    let err = stale
        .conditional_write(POST, seen.version, CounterDelta::Increment)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::VersionConflict {
            resource: POST,
            expected: 0
        }
    );
}

#[tokio::test]
async fn test_counter_never_goes_negative() {
    let store = seeded_store(1);
    let mut tx = store.begin().await.unwrap();
    let err = tx
        .conditional_write(POST, 0, CounterDelta::Decrement)
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::CounterUnderflow(POST));
}

#[tokio::test]
async fn test_duplicate_and_missing_membership() {
    let store = seeded_store(1);
    let alice = key("alice");

    let mut tx = store.begin().await.unwrap();
    assert_eq!(
        tx.delete(&alice).await.unwrap_err(),
        StoreError::MembershipNotFound(alice.clone())
    );
    tx.insert(&alice).await.unwrap();
    assert_eq!(
        tx.insert(&alice).await.unwrap_err(),
        StoreError::AlreadyExists(alice.clone())
    );
    tx.delete(&alice).await.unwrap();
    assert!(!tx.exists(&alice).await.unwrap());
}

#[tokio::test]
async fn test_closed_transaction_rejects_further_work() {
    let store = seeded_store(1);
    let mut tx = store.begin().await.unwrap();
    tx.commit().await.unwrap();

    let id = tx.id();
    assert_eq!(tx.commit().await.unwrap_err(), StoreError::TransactionClosed(id));
    assert_eq!(
        tx.exists(&key("alice")).await.unwrap_err(),
        StoreError::TransactionClosed(id)
    );
}

#[tokio::test]
async fn test_commit_fails_when_resource_removed_underneath() {
    let store = seeded_store(1);
    let mut tx = store.begin().await.unwrap();
    tx.insert(&key("alice")).await.unwrap();
    tx.conditional_write(POST, 0, CounterDelta::Increment)
        .await
        .unwrap();

    assert!(store.remove_resource(POST).unwrap());
    assert_eq!(
        tx.commit().await.unwrap_err(),
        StoreError::ResourceNotFound(POST)
    );
    assert_eq!(store.pending_claims().unwrap(), 0);
    assert_eq!(store.membership_count(POST).unwrap(), 0);
}

#[tokio::test]
async fn test_insert_validates_actor_and_resource() {
    let store = seeded_store(1);
    let mut tx = store.begin().await.unwrap();

    let blank = MembershipKey::new(POST, ActorId::from(" "));
    assert!(matches!(
        tx.insert(&blank).await.unwrap_err(),
        StoreError::InvalidActor(_)
    ));

    let orphan = MembershipKey::new(liketoggle::ResourceId(2), ActorId::from("alice"));
    assert_eq!(
        tx.insert(&orphan).await.unwrap_err(),
        StoreError::ResourceNotFound(liketoggle::ResourceId(2))
    );
}

#[test]
fn test_duplicate_resource_is_rejected() {
    let store = seeded_store(1);
    assert!(matches!(
        store.create_resource(POST).unwrap_err(),
        StoreError::ExecutionError(_)
    ));
}
