//! Repository layer.
//!
//! [`SchemaRepository`] and [`EntityStore`] are the seams each backend
//! implements. [`EntityRepository`] sits on top of an `EntityStore` and
//! applies the relationship resolution rules for one schema.

pub mod entity_repo;
pub mod entity_store;
pub mod schema_repo;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use entistore_core::entity::EntityRecord;
use entistore_core::relationship::EdgeDiff;
use entistore_core::schema::Schema;
use entistore_core::types::DbId;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::DbPool;

pub use entity_repo::EntityRepository;
pub use entity_store::PgEntityStore;
pub use schema_repo::PgSchemaRepo;

/// CRUD over stored schemas.
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// Store a new schema. The caller assigns the id.
    async fn create(&self, schema: Schema) -> Result<Schema, StoreError>;

    async fn find_all(&self) -> Result<Vec<Schema>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Schema>, StoreError>;

    /// Replace a stored schema. Returns `None` if no schema has that id.
    async fn update(&self, schema: Schema) -> Result<Option<Schema>, StoreError>;

    /// Delete a schema together with its entities and their edges.
    ///
    /// Returns `true` if a schema was deleted.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;
}

/// One relationship attribute's full edge set: `(name, heads)`.
pub type EdgeSet = (String, Vec<DbId>);

/// Raw entity records and relationship edges, without schema awareness.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Store a new record and replace each of the given edge sets on it.
    ///
    /// Either the record and every edge set become visible or none of them
    /// do.
    async fn insert(
        &self,
        record: EntityRecord,
        edges: &[EdgeSet],
    ) -> Result<EntityRecord, StoreError>;

    async fn list_by_schema(&self, schema_id: &str) -> Result<Vec<EntityRecord>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<EntityRecord>, StoreError>;

    /// Fetch the records that exist among `ids`, in no particular order.
    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<EntityRecord>, StoreError>;

    /// Replace a record's scalar attributes and the given edge sets as one
    /// write. Returns `None`, writing nothing, if the record does not exist.
    async fn update(
        &self,
        record: EntityRecord,
        edges: &[EdgeSet],
    ) -> Result<Option<EntityRecord>, StoreError>;

    /// Delete a record and every edge it is the tail or head of.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;

    /// Heads of the `(tail, name)` edge set, in creation order.
    async fn list_targets(&self, tail: &str, name: &str) -> Result<Vec<DbId>, StoreError>;

    /// Atomically replace the `(tail, name)` edge set with `heads`.
    ///
    /// Edges only in the old set are deleted, edges only in the new set are
    /// created, shared edges are left alone. Either the whole replace becomes
    /// visible or none of it does.
    async fn replace_targets(
        &self,
        tail: &str,
        name: &str,
        heads: &[DbId],
    ) -> Result<EdgeDiff, StoreError>;
}

/// Repository context built once at startup and shared by every handler.
#[derive(Clone)]
pub struct Repositories {
    pub schemas: Arc<dyn SchemaRepository>,
    pub entities: Arc<dyn EntityStore>,
    pool: Option<DbPool>,
}

impl Repositories {
    /// PostgreSQL-backed repositories over an existing pool.
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            schemas: Arc::new(PgSchemaRepo::new(pool.clone())),
            entities: Arc::new(PgEntityStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        let store = MemoryStore::new();
        Self {
            schemas: Arc::new(store.clone()),
            entities: Arc::new(store),
            pool: None,
        }
    }

    /// An [`EntityRepository`] scoped to `schema`.
    pub fn entities_for<'a>(&'a self, schema: &'a Schema) -> EntityRepository<'a> {
        EntityRepository::new(self.schemas.as_ref(), self.entities.as_ref(), schema)
    }

    /// Confirm the backend is reachable. Always succeeds in memory.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        match &self.pool {
            Some(pool) => crate::health_check(pool).await.map_err(StoreError::from),
            None => Ok(()),
        }
    }

    pub fn backend(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}

impl fmt::Debug for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repositories")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}
