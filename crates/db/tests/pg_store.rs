//! PostgreSQL backend tests.
//!
//! Each test gets a fresh database with the crate's migrations applied.
//! They need a reachable server in `DATABASE_URL` and are skipped by a
//! plain `cargo test`; run them with `cargo test -- --ignored`.

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use entistore_core::entity::{EntityRecord, ScalarValue};
use entistore_core::schema::Schema;
use entistore_core::types::DbId;
use entistore_db::repositories::{EntityStore, PgEntityStore, PgSchemaRepo, SchemaRepository};
use entistore_db::StoreError;
use serde_json::json;
use sqlx::PgPool;

fn schema(id: &str) -> Schema {
    serde_json::from_value(json!({
        "id": id,
        "display": "People",
        "attributes": [
            {"type": "STRING", "name": "name", "required": true, "maxLength": 20},
            {"type": "NUMERIC", "name": "age", "min": 0, "max": 150.5, "integer": true},
            {"type": "BOOLEAN", "name": "active"},
            {"type": "RELATIONSHIP", "name": "friends", "cardinality": "MANY_TO_MANY", "targetId": id}
        ]
    }))
    .unwrap()
}

fn record(id: &str, schema_id: &str) -> EntityRecord {
    EntityRecord {
        id: id.into(),
        schema_id: schema_id.into(),
        attributes: BTreeMap::new(),
    }
}

fn ids(values: &[&str]) -> Vec<DbId> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Stores schema `s` and entities `t`, `a`, `b` and `c` under it.
async fn seed(pool: &PgPool) -> (PgSchemaRepo, PgEntityStore) {
    let schemas = PgSchemaRepo::new(pool.clone());
    let store = PgEntityStore::new(pool.clone());
    schemas.create(schema("s")).await.unwrap();
    for id in ["t", "a", "b", "c"] {
        store.insert(record(id, "s"), &[]).await.unwrap();
    }
    (schemas, store)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn replace_touches_only_the_difference(pool: PgPool) {
    let (_, store) = seed(&pool).await;

    store.replace_targets("t", "friends", &ids(&["a", "b"])).await.unwrap();
    let diff = store
        .replace_targets("t", "friends", &ids(&["b", "c"]))
        .await
        .unwrap();

    assert_eq!(diff.created, ids(&["c"]));
    assert_eq!(diff.deleted, ids(&["a"]));
    assert_eq!(diff.unchanged, ids(&["b"]));
    assert_eq!(store.list_targets("t", "friends").await.unwrap(), ids(&["b", "c"]));

    let edge_rows: i64 = sqlx::query_scalar("SELECT count(*) FROM relationships WHERE tail_id = 't'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(edge_rows, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn new_edges_keep_the_requested_order(pool: PgPool) {
    let (_, store) = seed(&pool).await;

    store
        .replace_targets("t", "friends", &ids(&["c", "a", "b", "a"]))
        .await
        .unwrap();

    assert_eq!(
        store.list_targets("t", "friends").await.unwrap(),
        ids(&["c", "a", "b"])
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn unchanged_set_writes_nothing(pool: PgPool) {
    let (_, store) = seed(&pool).await;
    store.replace_targets("t", "friends", &ids(&["a", "b"])).await.unwrap();

    let diff = store
        .replace_targets("t", "friends", &ids(&["b", "a"]))
        .await
        .unwrap();

    assert!(diff.is_noop());
    assert_eq!(store.list_targets("t", "friends").await.unwrap(), ids(&["a", "b"]));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn deleting_an_entity_drops_its_edges(pool: PgPool) {
    let (_, store) = seed(&pool).await;
    store.replace_targets("t", "friends", &ids(&["a", "b"])).await.unwrap();
    store.replace_targets("b", "friends", &ids(&["t"])).await.unwrap();

    assert!(EntityStore::delete_by_id(&store, "b").await.unwrap());

    assert_eq!(store.list_targets("t", "friends").await.unwrap(), ids(&["a"]));
    assert!(store.list_targets("b", "friends").await.unwrap().is_empty());
    assert!(!EntityStore::delete_by_id(&store, "b").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn deleting_a_schema_cascades_to_entities_and_edges(pool: PgPool) {
    let (schemas, store) = seed(&pool).await;
    schemas.create(schema("other")).await.unwrap();
    store.insert(record("x", "other"), &[]).await.unwrap();
    store.replace_targets("x", "owner", &ids(&["a"])).await.unwrap();

    assert!(SchemaRepository::delete_by_id(&schemas, "s").await.unwrap());

    assert!(store.list_by_schema("s").await.unwrap().is_empty());
    assert!(EntityStore::find_by_id(&store, "x").await.unwrap().is_some());
    assert!(store.list_targets("x", "owner").await.unwrap().is_empty());
    assert!(!SchemaRepository::delete_by_id(&schemas, "s").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn schema_attributes_round_trip(pool: PgPool) {
    let schemas = PgSchemaRepo::new(pool.clone());
    let original = schema("s");

    schemas.create(original.clone()).await.unwrap();
    let stored = SchemaRepository::find_by_id(&schemas, "s").await.unwrap().unwrap();

    assert_eq!(stored, original);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn scalar_attributes_round_trip(pool: PgPool) {
    let (_, store) = seed(&pool).await;
    let mut ada = record("ada", "s");
    ada.attributes = BTreeMap::from([
        ("name".to_string(), ScalarValue::String("Ada".into())),
        ("age".to_string(), ScalarValue::Number(36.into())),
        (
            "height".to_string(),
            ScalarValue::from_json(&json!(1.65)).unwrap(),
        ),
        ("active".to_string(), ScalarValue::Boolean(true)),
    ]);

    store.insert(ada.clone(), &[]).await.unwrap();
    let stored = EntityStore::find_by_id(&store, "ada").await.unwrap().unwrap();

    assert_eq!(stored, ada);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn insert_with_a_missing_head_rolls_back(pool: PgPool) {
    let (_, store) = seed(&pool).await;

    let edges = [
        ("friends".to_string(), ids(&["a"])),
        ("enemies".to_string(), ids(&["ghost"])),
    ];
    let result = store.insert(record("ada", "s"), &edges).await;

    assert_matches!(result, Err(StoreError::Database(_)));
    assert!(EntityStore::find_by_id(&store, "ada").await.unwrap().is_none());
    assert!(store.list_targets("ada", "friends").await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn update_with_a_missing_head_rolls_back(pool: PgPool) {
    let (_, store) = seed(&pool).await;
    store.replace_targets("t", "friends", &ids(&["a"])).await.unwrap();

    let mut changed = record("t", "s");
    changed
        .attributes
        .insert("name".into(), ScalarValue::String("Changed".into()));
    let edges = [
        ("friends".to_string(), ids(&["b"])),
        ("enemies".to_string(), ids(&["ghost"])),
    ];
    let result = EntityStore::update(&store, changed, &edges).await;

    assert_matches!(result, Err(StoreError::Database(_)));
    let stored = EntityStore::find_by_id(&store, "t").await.unwrap().unwrap();
    assert!(stored.attributes.is_empty());
    assert_eq!(store.list_targets("t", "friends").await.unwrap(), ids(&["a"]));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn update_of_a_missing_record_writes_nothing(pool: PgPool) {
    let (_, store) = seed(&pool).await;

    let edges = [("friends".to_string(), ids(&["a"]))];
    let result = EntityStore::update(&store, record("ghost", "s"), &edges)
        .await
        .unwrap();

    assert!(result.is_none());
    let edge_rows: i64 = sqlx::query_scalar("SELECT count(*) FROM relationships")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(edge_rows, 0);
}
