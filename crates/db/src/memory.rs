//! In-memory backend.
//!
//! Schemas, entity records and edges live behind one async `RwLock`, so
//! every operation, including an edge-set replace, is atomic with respect
//! to every other. Intended for development and tests; nothing survives a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use entistore_core::entity::EntityRecord;
use entistore_core::relationship::EdgeDiff;
use entistore_core::schema::Schema;
use entistore_core::types::DbId;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::repositories::{EdgeSet, EntityStore, SchemaRepository};

#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion-ordered so listings are stable.
    schemas: IndexMap<DbId, Schema>,
    entities: IndexMap<DbId, EntityRecord>,
    /// `(tail, name)` -> heads in creation order.
    edges: HashMap<(DbId, String), Vec<DbId>>,
}

impl MemoryState {
    /// Fail unless every head names a stored entity or `tail` itself.
    fn check_heads(&self, tail: &str, edges: &[EdgeSet]) -> Result<(), StoreError> {
        for (name, heads) in edges {
            let missing = heads
                .iter()
                .find(|head| head.as_str() != tail && !self.entities.contains_key(*head));
            if let Some(head) = missing {
                return Err(StoreError::DanglingEdge {
                    tail: tail.to_string(),
                    name: name.clone(),
                    head: head.clone(),
                });
            }
        }
        Ok(())
    }

    fn replace_edges(&mut self, tail: &str, name: &str, heads: &[DbId]) -> EdgeDiff {
        let key = (tail.to_string(), name.to_string());
        let current = self.edges.get(&key).cloned().unwrap_or_default();
        let diff = EdgeDiff::plan(&current, heads);
        if diff.is_noop() {
            return diff;
        }

        let resulting = diff.resulting_heads();
        if resulting.is_empty() {
            self.edges.remove(&key);
        } else {
            self.edges.insert(key, resulting);
        }
        diff
    }

    fn write_edge_sets(&mut self, tail: &str, edges: &[EdgeSet]) {
        for (name, heads) in edges {
            let diff = self.replace_edges(tail, name, heads);
            tracing::debug!(
                entity_id = %tail,
                relationship = %name,
                created = diff.created.len(),
                deleted = diff.deleted.len(),
                unchanged = diff.unchanged.len(),
                "Relationship edges replaced"
            );
        }
    }

    /// Remove the given entities and every edge touching them.
    fn purge_entities(&mut self, ids: &[DbId]) {
        for id in ids {
            self.entities.shift_remove(id);
        }
        self.edges.retain(|(tail, _), _| !ids.contains(tail));
        for heads in self.edges.values_mut() {
            heads.retain(|head| !ids.contains(head));
        }
        self.edges.retain(|_, heads| !heads.is_empty());
    }
}

/// Thread-safe in-memory store implementing both repository traits.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaRepository for MemoryStore {
    async fn create(&self, schema: Schema) -> Result<Schema, StoreError> {
        tracing::trace!(schema_id = %schema.id, "Creating schema");
        let mut state = self.state.write().await;
        state.schemas.insert(schema.id.clone(), schema.clone());
        Ok(schema)
    }

    async fn find_all(&self) -> Result<Vec<Schema>, StoreError> {
        let state = self.state.read().await;
        Ok(state.schemas.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Schema>, StoreError> {
        let state = self.state.read().await;
        Ok(state.schemas.get(id).cloned())
    }

    async fn update(&self, schema: Schema) -> Result<Option<Schema>, StoreError> {
        tracing::trace!(schema_id = %schema.id, "Updating schema");
        let mut state = self.state.write().await;
        match state.schemas.get_mut(&schema.id) {
            Some(stored) => {
                *stored = schema.clone();
                Ok(Some(schema))
            }
            None => Ok(None),
        }
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        tracing::trace!(schema_id = %id, "Deleting schema");
        let mut state = self.state.write().await;
        if state.schemas.shift_remove(id).is_none() {
            return Ok(false);
        }

        let owned: Vec<DbId> = state
            .entities
            .values()
            .filter(|e| e.schema_id == id)
            .map(|e| e.id.clone())
            .collect();
        state.purge_entities(&owned);
        Ok(true)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert(
        &self,
        record: EntityRecord,
        edges: &[EdgeSet],
    ) -> Result<EntityRecord, StoreError> {
        tracing::trace!(entity_id = %record.id, schema_id = %record.schema_id, "Creating entity");
        let mut state = self.state.write().await;
        state.check_heads(&record.id, edges)?;

        state.entities.insert(record.id.clone(), record.clone());
        state.write_edge_sets(&record.id, edges);
        Ok(record)
    }

    async fn list_by_schema(&self, schema_id: &str) -> Result<Vec<EntityRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entities
            .values()
            .filter(|e| e.schema_id == schema_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EntityRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.entities.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<EntityRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.entities.get(id).cloned())
            .collect())
    }

    async fn update(
        &self,
        record: EntityRecord,
        edges: &[EdgeSet],
    ) -> Result<Option<EntityRecord>, StoreError> {
        tracing::trace!(entity_id = %record.id, "Updating entity");
        let mut state = self.state.write().await;
        if !state.entities.contains_key(&record.id) {
            return Ok(None);
        }
        state.check_heads(&record.id, edges)?;

        let Some(stored) = state.entities.get_mut(&record.id) else {
            return Ok(None);
        };
        stored.attributes = record.attributes;
        let updated = stored.clone();
        state.write_edge_sets(&updated.id, edges);
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        tracing::trace!(entity_id = %id, "Deleting entity");
        let mut state = self.state.write().await;
        if !state.entities.contains_key(id) {
            return Ok(false);
        }
        state.purge_entities(&[id.to_string()]);
        Ok(true)
    }

    async fn list_targets(&self, tail: &str, name: &str) -> Result<Vec<DbId>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .get(&(tail.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_targets(
        &self,
        tail: &str,
        name: &str,
        heads: &[DbId],
    ) -> Result<EdgeDiff, StoreError> {
        tracing::trace!(entity_id = %tail, relationship = %name, "Setting relationship targets");
        let mut state = self.state.write().await;
        let edges = [(name.to_string(), heads.to_vec())];
        state.check_heads(tail, &edges)?;
        Ok(state.replace_edges(tail, name, heads))
    }
}
