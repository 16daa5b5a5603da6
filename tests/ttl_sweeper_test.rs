//! TTL expiration: only expired rows are swept, and sweeping is idempotent.

mod helpers;

use engram::memory::types::AddMemoryParams;
use engram::sweeper;
use helpers::*;

#[tokio::test]
async fn expired_memories_are_swept() {
    let Some(db) = test_db("sweeper_expired").await else {
        return;
    };

    let expired = db
        .add_memory(AddMemoryParams {
            kind: "note".into(),
            text: "temp".into(),
            importance: 0.5,
            ttl_days: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    backdate_memory(&db, expired, 2).await;

    let keeper = db
        .add_memory(AddMemoryParams {
            kind: "note".into(),
            text: "keeper".into(),
            importance: 0.5,
            ttl_days: None,
            ..Default::default()
        })
        .await
        .unwrap();

    let deleted = sweeper::delete_expired(&db).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(db.get_memory(expired).await.unwrap().is_none());
    assert!(db.get_memory(keeper).await.unwrap().is_some());
}

#[tokio::test]
async fn unexpired_ttl_rows_survive() {
    let Some(db) = test_db("sweeper_unexpired").await else {
        return;
    };

    let id = db
        .add_memory(AddMemoryParams {
            kind: "note".into(),
            text: "still fresh".into(),
            importance: 0.5,
            ttl_days: Some(30),
            ..Default::default()
        })
        .await
        .unwrap();
    backdate_memory(&db, id, 2).await;

    let deleted = sweeper::delete_expired(&db).await.unwrap();
    assert_eq!(deleted, 0);
    assert!(db.get_memory(id).await.unwrap().is_some());
}

#[tokio::test]
async fn sweeping_twice_is_idempotent() {
    let Some(db) = test_db("sweeper_idempotent").await else {
        return;
    };

    let expired = db
        .add_memory(AddMemoryParams {
            kind: "note".into(),
            text: "short lived".into(),
            importance: 0.5,
            ttl_days: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    backdate_memory(&db, expired, 3).await;

    assert_eq!(sweeper::delete_expired(&db).await.unwrap(), 1);
    assert_eq!(sweeper::delete_expired(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn sweep_cascades_embeddings() {
    let Some(db) = test_db("sweeper_cascade").await else {
        return;
    };

    let expired = db
        .add_memory(AddMemoryParams {
            kind: "note".into(),
            text: "with vector".into(),
            importance: 0.5,
            ttl_days: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    db.upsert_embedding(expired, "m", &spike_vector(0, 8)).await.unwrap();
    backdate_memory(&db, expired, 2).await;

    sweeper::delete_expired(&db).await.unwrap();
    assert_eq!(embedding_count(&db, expired).await, 0);
}
