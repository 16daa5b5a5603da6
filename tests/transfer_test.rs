//! Transfer codec: export → wipe → import is the identity on the memory
//! set, with byte-identical vectors when embeddings travel along.

mod helpers;

use engram::db::Db;
use engram::memory::service::{AddArgs, ExportArgs, ImportArgs, MemoryService};
use helpers::*;
use std::sync::Arc;

const DIMS: usize = 8;

fn stub_service(db: Arc<Db>) -> MemoryService {
    let stub = Arc::new(StubEmbedder::new("stub-model", DIMS));
    MemoryService::new(db, stub.clone(), stub_gateway(stub))
}

async fn seed(service: &MemoryService, texts: &[&str]) -> Vec<i64> {
    let mut ids = Vec::new();
    for text in texts {
        ids.push(
            service
                .add(AddArgs {
                    text: text.to_string(),
                    tags: vec!["seeded".into()],
                    ..Default::default()
                })
                .await
                .unwrap(),
        );
    }
    ids
}

#[tokio::test]
async fn export_import_round_trip_preserves_memories_and_vectors() {
    let Some(db) = test_db("transfer_roundtrip").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    let ids = seed(&service, &["first memory", "second memory", "third memory"]).await;
    let originals: Vec<_> = {
        let mut v = Vec::new();
        for id in &ids {
            v.push(db.get_memory(*id).await.unwrap().unwrap());
        }
        v
    };
    let original_vectors: Vec<_> = {
        let mut v = Vec::new();
        for id in &ids {
            v.push(db.get_embeddings(*id).await.unwrap());
        }
        v
    };

    let output = service
        .export(ExportArgs {
            include_embeddings: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(output.exported, 3);
    assert_eq!(output.errors, 0);
    assert_eq!(output.data.lines().count(), 3);

    // Records are ordered by id ascending.
    let exported_ids: Vec<i64> = output
        .data
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["id"].as_i64().unwrap())
        .collect();
    let mut sorted = exported_ids.clone();
    sorted.sort_unstable();
    assert_eq!(exported_ids, sorted);

    wipe_partition(&db).await;
    assert_eq!(db.count_memories().await.unwrap(), 0);

    let stats = service
        .import(ImportArgs {
            data: output.data,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.imported, 3);
    assert_eq!(stats.errors, 0);

    for (original, vectors) in originals.iter().zip(&original_vectors) {
        let restored = db.get_memory(original.id).await.unwrap().expect("id preserved");
        assert_eq!(restored.text, original.text);
        assert_eq!(restored.kind, original.kind);
        assert_eq!(restored.tags, original.tags);
        assert_eq!(restored.created_at, original.created_at);
        assert_eq!(restored.updated_at, original.updated_at);

        let restored_vectors = db.get_embeddings(original.id).await.unwrap();
        assert_eq!(restored_vectors.len(), 1);
        assert_eq!(restored_vectors[0].vector, vectors[0].vector);
        assert_eq!(restored_vectors[0].model, vectors[0].model);
    }
}

#[tokio::test]
async fn import_after_export_does_not_break_id_assignment() {
    let Some(db) = test_db("transfer_sequence").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    seed(&service, &["a", "b"]).await;
    let output = service.export(ExportArgs::default()).await.unwrap();

    wipe_partition(&db).await;
    service
        .import(ImportArgs {
            data: output.data,
            ..Default::default()
        })
        .await
        .unwrap();

    // A fresh add must receive an id beyond the imported ones.
    let new_id = seed(&service, &["c"]).await[0];
    let max_imported: i64 =
        sqlx::query_scalar("SELECT MAX(id) FROM memories WHERE tenant_id = $1 AND workspace_id = $2 AND text != 'c'")
            .bind(db.tenant_id())
            .bind(db.workspace_id())
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert!(new_id > max_imported);
}

#[tokio::test]
async fn malformed_lines_are_counted_and_skipped() {
    let Some(db) = test_db("transfer_malformed").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    seed(&service, &["good record"]).await;
    let good = service.export(ExportArgs::default()).await.unwrap().data;
    wipe_partition(&db).await;

    let data = format!("not json at all\n{good}{{\"id\": \"also broken\"}}\n");
    let stats = service
        .import(ImportArgs {
            data,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.imported, 1);
    assert_eq!(stats.errors, 2);
    assert_eq!(db.count_memories().await.unwrap(), 1);
}

#[tokio::test]
async fn dry_run_parses_but_writes_nothing() {
    let Some(db) = test_db("transfer_dry_run").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    seed(&service, &["ephemeral"]).await;
    let output = service.export(ExportArgs::default()).await.unwrap();
    wipe_partition(&db).await;

    let stats = service
        .import(ImportArgs {
            data: output.data,
            dry_run: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.imported, 1);
    assert_eq!(db.count_memories().await.unwrap(), 0);
}

#[tokio::test]
async fn skip_existing_counts_duplicates_as_skipped() {
    let Some(db) = test_db("transfer_skip_existing").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    seed(&service, &["kept as is"]).await;
    let output = service.export(ExportArgs::default()).await.unwrap();

    let stats = service
        .import(ImportArgs {
            data: output.data,
            skip_existing: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.imported, 0);
    assert_eq!(stats.skipped, 1);
}

#[tokio::test]
async fn overwrite_import_updates_mutable_fields() {
    let Some(db) = test_db("transfer_overwrite").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    let id = seed(&service, &["before edit"]).await[0];
    let mut output = service.export(ExportArgs::default()).await.unwrap().data;
    output = output.replace("before edit", "after edit");

    let stats = service
        .import(ImportArgs {
            data: output,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stats.imported, 1);

    let restored = db.get_memory(id).await.unwrap().unwrap();
    assert_eq!(restored.text, "after edit");
}

#[tokio::test]
async fn dims_mismatch_is_a_per_line_error() {
    let Some(db) = test_db("transfer_dims_mismatch").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    seed(&service, &["vector carrier"]).await;
    let line = service
        .export(ExportArgs {
            include_embeddings: true,
            ..Default::default()
        })
        .await
        .unwrap()
        .data;
    wipe_partition(&db).await;

    // Corrupt the declared dimension count.
    let broken = line.replace("\"dims\":8", "\"dims\":4");
    assert_ne!(line, broken);

    let stats = service
        .import(ImportArgs {
            data: broken,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.errors, 1);
    assert_eq!(stats.imported, 0);
    assert_eq!(db.count_memories().await.unwrap(), 0);
}

#[tokio::test]
async fn import_from_file_written_by_export(
) {
    let Some(db) = test_db("transfer_file").await else {
        return;
    };
    let service = stub_service(Arc::clone(&db));

    seed(&service, &["file bound"]).await;
    let output = service.export(ExportArgs::default()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memories.jsonl");
    std::fs::write(&path, &output.data).unwrap();
    wipe_partition(&db).await;

    let data = std::fs::read_to_string(&path).unwrap();
    let stats = service
        .import(ImportArgs {
            data,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stats.imported, 1);
    assert_eq!(db.count_memories().await.unwrap(), 1);
}
