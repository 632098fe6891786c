//! PostgreSQL repository for the `schemas` table.

use async_trait::async_trait;
use entistore_core::schema::{Attribute, Schema};
use sqlx::types::Json;
use sqlx::FromRow;

use super::SchemaRepository;
use crate::error::StoreError;
use crate::DbPool;

/// Column list for `schemas` queries.
const COLUMNS: &str = "id, display, description, attributes";

/// A row from the `schemas` table. Attributes are stored as one JSONB array.
#[derive(Debug, FromRow)]
struct SchemaRow {
    id: String,
    display: String,
    description: String,
    attributes: Json<Vec<Attribute>>,
}

impl From<SchemaRow> for Schema {
    fn from(row: SchemaRow) -> Self {
        Schema {
            id: row.id,
            display: row.display,
            description: row.description,
            attributes: row.attributes.0,
        }
    }
}

/// Schema CRUD against PostgreSQL.
pub struct PgSchemaRepo {
    pool: DbPool,
}

impl PgSchemaRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaRepository for PgSchemaRepo {
    async fn create(&self, schema: Schema) -> Result<Schema, StoreError> {
        tracing::trace!(schema_id = %schema.id, "Creating schema");

        let query = format!(
            "INSERT INTO schemas (id, display, description, attributes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, SchemaRow>(&query)
            .bind(&schema.id)
            .bind(&schema.display)
            .bind(&schema.description)
            .bind(Json(&schema.attributes))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn find_all(&self) -> Result<Vec<Schema>, StoreError> {
        tracing::trace!("Retrieving all schemas");

        let query = format!("SELECT {COLUMNS} FROM schemas ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, SchemaRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Schema::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Schema>, StoreError> {
        tracing::trace!(schema_id = %id, "Searching for schema");

        let query = format!("SELECT {COLUMNS} FROM schemas WHERE id = $1");
        let row = sqlx::query_as::<_, SchemaRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Schema::from))
    }

    async fn update(&self, schema: Schema) -> Result<Option<Schema>, StoreError> {
        tracing::trace!(schema_id = %schema.id, "Updating schema");

        let query = format!(
            "UPDATE schemas SET \
                 display = $2, \
                 description = $3, \
                 attributes = $4, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, SchemaRow>(&query)
            .bind(&schema.id)
            .bind(&schema.display)
            .bind(&schema.description)
            .bind(Json(&schema.attributes))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Schema::from))
    }

    /// Entities and edges go with it through `ON DELETE CASCADE`.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        tracing::trace!(schema_id = %id, "Deleting schema");

        let result = sqlx::query("DELETE FROM schemas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
