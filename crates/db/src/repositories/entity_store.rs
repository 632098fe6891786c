//! PostgreSQL store for the `entities` and `relationships` tables.

use std::collections::BTreeMap;

use async_trait::async_trait;
use entistore_core::entity::{EntityRecord, ScalarValue};
use entistore_core::relationship::EdgeDiff;
use entistore_core::types::DbId;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};

use super::{EdgeSet, EntityStore};
use crate::error::StoreError;
use crate::DbPool;

/// Column list for `entities` queries.
const COLUMNS: &str = "id, schema_id, attributes";

/// A row from the `entities` table. Scalar attributes live in one JSONB object.
#[derive(Debug, FromRow)]
struct EntityRow {
    id: String,
    schema_id: String,
    attributes: Json<BTreeMap<String, ScalarValue>>,
}

impl From<EntityRow> for EntityRecord {
    fn from(row: EntityRow) -> Self {
        EntityRecord {
            id: row.id,
            schema_id: row.schema_id,
            attributes: row.attributes.0,
        }
    }
}

/// Entity records and relationship edges in PostgreSQL.
pub struct PgEntityStore {
    pool: DbPool,
}

impl PgEntityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    /// The record and its edge sets share one transaction; a failed edge
    /// write rolls the new record back with it.
    async fn insert(
        &self,
        record: EntityRecord,
        edges: &[EdgeSet],
    ) -> Result<EntityRecord, StoreError> {
        tracing::trace!(entity_id = %record.id, schema_id = %record.schema_id, "Creating entity");

        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO entities (id, schema_id, attributes) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&record.id)
            .bind(&record.schema_id)
            .bind(Json(&record.attributes))
            .fetch_one(&mut *tx)
            .await?;

        write_edge_sets(&mut tx, &row.id, edges).await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list_by_schema(&self, schema_id: &str) -> Result<Vec<EntityRecord>, StoreError> {
        tracing::trace!(schema_id = %schema_id, "Searching for entities of schema");

        let query = format!(
            "SELECT {COLUMNS} FROM entities WHERE schema_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, EntityRow>(&query)
            .bind(schema_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(EntityRecord::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EntityRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM entities WHERE id = $1");
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EntityRecord::from))
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<EntityRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {COLUMNS} FROM entities WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, EntityRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(EntityRecord::from).collect())
    }

    async fn update(
        &self,
        record: EntityRecord,
        edges: &[EdgeSet],
    ) -> Result<Option<EntityRecord>, StoreError> {
        tracing::trace!(entity_id = %record.id, "Updating entity");

        let mut tx = self.pool.begin().await?;

        let query = format!(
            "UPDATE entities SET attributes = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&record.id)
            .bind(Json(&record.attributes))
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        write_edge_sets(&mut tx, &row.id, edges).await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    /// Edges touching the entity go with it through `ON DELETE CASCADE`.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        tracing::trace!(entity_id = %id, "Deleting entity");

        let result = sqlx::query("DELETE FROM entities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_targets(&self, tail: &str, name: &str) -> Result<Vec<DbId>, StoreError> {
        let heads = sqlx::query_scalar::<_, String>(
            "SELECT head_id FROM relationships \
             WHERE tail_id = $1 AND name = $2 \
             ORDER BY id",
        )
        .bind(tail)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(heads)
    }

    /// Runs in one transaction. Locking the tail row serializes concurrent
    /// replaces of the same entity's edges; the transaction rolls back when
    /// dropped on any early return.
    async fn replace_targets(
        &self,
        tail: &str,
        name: &str,
        heads: &[DbId],
    ) -> Result<EdgeDiff, StoreError> {
        tracing::trace!(entity_id = %tail, relationship = %name, "Setting relationship targets");

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM entities WHERE id = $1 FOR UPDATE")
            .bind(tail)
            .fetch_optional(&mut *tx)
            .await?;

        let diff = replace_edges(&mut tx, tail, name, heads).await?;

        tx.commit().await?;
        Ok(diff)
    }
}

async fn write_edge_sets(
    conn: &mut PgConnection,
    tail: &str,
    edges: &[EdgeSet],
) -> Result<(), StoreError> {
    for (name, heads) in edges {
        let diff = replace_edges(conn, tail, name, heads).await?;
        tracing::debug!(
            entity_id = %tail,
            relationship = %name,
            created = diff.created.len(),
            deleted = diff.deleted.len(),
            unchanged = diff.unchanged.len(),
            "Relationship edges replaced"
        );
    }
    Ok(())
}

/// Apply the set difference between the stored `(tail, name)` heads and
/// `heads` on an open transaction.
async fn replace_edges(
    conn: &mut PgConnection,
    tail: &str,
    name: &str,
    heads: &[DbId],
) -> Result<EdgeDiff, StoreError> {
    let current = sqlx::query_scalar::<_, String>(
        "SELECT head_id FROM relationships \
         WHERE tail_id = $1 AND name = $2 \
         ORDER BY id",
    )
    .bind(tail)
    .bind(name)
    .fetch_all(&mut *conn)
    .await?;

    let diff = EdgeDiff::plan(&current, heads);
    if diff.is_noop() {
        return Ok(diff);
    }

    if !diff.deleted.is_empty() {
        sqlx::query(
            "DELETE FROM relationships \
             WHERE tail_id = $1 AND name = $2 AND head_id = ANY($3)",
        )
        .bind(tail)
        .bind(name)
        .bind(&diff.deleted)
        .execute(&mut *conn)
        .await?;
    }

    if !diff.created.is_empty() {
        sqlx::query(
            "INSERT INTO relationships (name, tail_id, head_id) \
             SELECT $1, $2, t.head_id \
             FROM UNNEST($3::text[]) WITH ORDINALITY AS t(head_id, ord) \
             ORDER BY t.ord",
        )
        .bind(name)
        .bind(tail)
        .bind(&diff.created)
        .execute(&mut *conn)
        .await?;
    }

    Ok(diff)
}
