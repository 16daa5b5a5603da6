//! Entity subsystem: upsert merging, memory links, relations, and the
//! shared-entity related-memories score.

mod helpers;

use engram::db::Db;
use engram::memory::types::{AddEntityParams, AddMemoryParams, EntityType};
use helpers::*;

fn entity(name: &str, entity_type: EntityType) -> AddEntityParams {
    AddEntityParams {
        name: name.into(),
        entity_type,
        aliases: vec![],
        description: None,
        meta: None,
    }
}

async fn add_memory(db: &Db, text: &str) -> i64 {
    db.add_memory(AddMemoryParams {
        kind: "note".into(),
        text: text.into(),
        importance: 0.5,
        ..Default::default()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn duplicate_entity_upsert_merges_aliases() {
    let Some(db) = test_db("entity_upsert").await else {
        return;
    };

    let first = db
        .add_entity(AddEntityParams {
            aliases: vec!["PG".into()],
            description: Some("relational database".into()),
            ..entity("PostgreSQL", EntityType::Technology)
        })
        .await
        .unwrap();

    let second = db
        .add_entity(AddEntityParams {
            aliases: vec!["Postgres".into()],
            ..entity("PostgreSQL", EntityType::Technology)
        })
        .await
        .unwrap();

    assert_eq!(first, second);
    let merged = db.get_entity(first).await.unwrap().unwrap();
    assert!(merged.aliases.contains(&"PG".to_string()));
    assert!(merged.aliases.contains(&"Postgres".to_string()));
    // null description does not clobber the stored one
    assert_eq!(merged.description.as_deref(), Some("relational database"));
}

#[tokio::test]
async fn same_name_different_type_is_a_different_entity() {
    let Some(db) = test_db("entity_type_split").await else {
        return;
    };

    let org = db.add_entity(entity("Mercury", EntityType::Organization)).await.unwrap();
    let project = db.add_entity(entity("Mercury", EntityType::Project)).await.unwrap();
    assert_ne!(org, project);
}

#[tokio::test]
async fn memory_entity_links_round_trip() {
    let Some(db) = test_db("entity_links").await else {
        return;
    };

    let memory = add_memory(&db, "Ada works on the compiler").await;
    let person = db.add_entity(entity("Ada", EntityType::Person)).await.unwrap();
    let tech = db.add_entity(entity("compiler", EntityType::Technology)).await.unwrap();

    db.link_memory_entity(memory, person, Some("subject"), 0.9).await.unwrap();
    db.link_memory_entity(memory, tech, None, 0.6).await.unwrap();

    let entities = db.get_memory_entities(memory).await.unwrap();
    assert_eq!(entities.len(), 2);
    // strongest link first
    assert_eq!(entities[0].name, "Ada");
    assert_eq!(entities[1].name, "compiler");
}

#[tokio::test]
async fn deleting_memory_leaves_entities_behind() {
    let Some(db) = test_db("entity_survival").await else {
        return;
    };

    let memory = add_memory(&db, "uses Tokio").await;
    let tech = db.add_entity(entity("Tokio", EntityType::Technology)).await.unwrap();
    db.link_memory_entity(memory, tech, None, 1.0).await.unwrap();

    db.delete_memory(memory).await.unwrap();

    // Link cascades away, entity persists.
    assert!(db.get_entity(tech).await.unwrap().is_some());
    let links: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM memory_entities WHERE entity_id = $1")
            .bind(tech)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(links, 0);
}

#[tokio::test]
async fn relation_insert_is_idempotent() {
    let Some(db) = test_db("entity_relations").await else {
        return;
    };

    let ada = db.add_entity(entity("Ada", EntityType::Person)).await.unwrap();
    let acme = db.add_entity(entity("Acme", EntityType::Organization)).await.unwrap();

    db.add_entity_relation(ada, acme, "works_at").await.unwrap();
    db.add_entity_relation(ada, acme, "works_at").await.unwrap();

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM entity_relations WHERE source_id = $1 AND target_id = $2",
    )
    .bind(ada)
    .bind(acme)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn related_memories_score_is_shared_over_source_count() {
    let Some(db) = test_db("entity_related").await else {
        return;
    };

    let source = add_memory(&db, "source memory").await;
    let full_overlap = add_memory(&db, "full overlap").await;
    let half_overlap = add_memory(&db, "half overlap").await;
    let unrelated = add_memory(&db, "unrelated").await;

    let e1 = db.add_entity(entity("alpha", EntityType::Concept)).await.unwrap();
    let e2 = db.add_entity(entity("beta", EntityType::Concept)).await.unwrap();
    let e3 = db.add_entity(entity("gamma", EntityType::Concept)).await.unwrap();

    // source links alpha + beta
    db.link_memory_entity(source, e1, None, 1.0).await.unwrap();
    db.link_memory_entity(source, e2, None, 1.0).await.unwrap();
    // full_overlap shares both
    db.link_memory_entity(full_overlap, e1, None, 1.0).await.unwrap();
    db.link_memory_entity(full_overlap, e2, None, 1.0).await.unwrap();
    // half_overlap shares one
    db.link_memory_entity(half_overlap, e1, None, 1.0).await.unwrap();
    // unrelated shares none
    db.link_memory_entity(unrelated, e3, None, 1.0).await.unwrap();

    let related = db.related_memories(source, 10).await.unwrap();

    assert_eq!(related.len(), 2);
    assert_eq!(related[0].memory.id, full_overlap);
    assert!((related[0].score - 1.0).abs() < 1e-6);
    assert_eq!(related[1].memory.id, half_overlap);
    assert!((related[1].score - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn related_memories_breaks_ties_by_id_ascending() {
    let Some(db) = test_db("entity_related_ties").await else {
        return;
    };

    let source = add_memory(&db, "tie source").await;
    let tied_a = add_memory(&db, "tied a").await;
    let tied_b = add_memory(&db, "tied b").await;

    let e = db.add_entity(entity("shared", EntityType::Concept)).await.unwrap();
    for m in [source, tied_a, tied_b] {
        db.link_memory_entity(m, e, None, 1.0).await.unwrap();
    }

    let related = db.related_memories(source, 10).await.unwrap();
    assert_eq!(related.len(), 2);
    assert_eq!(related[0].memory.id, tied_a.min(tied_b));
    assert_eq!(related[1].memory.id, tied_a.max(tied_b));
}

#[tokio::test]
async fn entity_name_search_uses_trigram_similarity() {
    let Some(db) = test_db("entity_search").await else {
        return;
    };

    db.add_entity(entity("PostgreSQL", EntityType::Technology)).await.unwrap();
    db.add_entity(entity("Kubernetes", EntityType::Technology)).await.unwrap();

    let results = db.search_entities("postgres", 10).await.unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].name, "PostgreSQL");
    assert!(results.iter().all(|e| e.name != "Kubernetes"));
}
