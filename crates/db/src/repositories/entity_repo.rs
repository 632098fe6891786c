//! Entity repository scoped to a single schema.
//!
//! Splits writes into scalar attributes and relationship edge sets, and
//! resolves relationships one level deep on every read.

use std::collections::HashMap;

use entistore_core::entity::{
    Entity, EntityRecord, EntityWrite, ResolvedEntity, ResolvedRelationship,
};
use entistore_core::error::{CoreError, Details};
use entistore_core::relationship::RelationshipValue;
use entistore_core::schema::{Attribute, Schema};
use entistore_core::types::{new_id, DbId};
use serde_json::Value;

use super::{EdgeSet, EntityStore, SchemaRepository};
use crate::error::StoreError;

/// Entity CRUD for the entities of one schema.
///
/// Ids that exist under another schema are treated as absent.
pub struct EntityRepository<'a> {
    schemas: &'a dyn SchemaRepository,
    store: &'a dyn EntityStore,
    schema: &'a Schema,
}

impl<'a> EntityRepository<'a> {
    pub fn new(
        schemas: &'a dyn SchemaRepository,
        store: &'a dyn EntityStore,
        schema: &'a Schema,
    ) -> Self {
        Self {
            schemas,
            store,
            schema,
        }
    }

    /// Persist a new entity under a freshly generated id.
    ///
    /// The payload is expected to have passed validation already.
    pub async fn create(&self, entity: &Entity) -> Result<ResolvedEntity, StoreError> {
        let write = EntityWrite::partition(self.schema, &entity.fields)?;
        self.check_targets(&write.relationships).await?;

        let record = EntityRecord {
            id: new_id(),
            schema_id: self.schema.id.clone(),
            attributes: write.scalars,
        };
        let record = self
            .store
            .insert(record, &edge_sets(&write.relationships))
            .await?;

        tracing::debug!(entity_id = %record.id, schema_id = %self.schema.id, "Entity created");
        let targets = self.target_schemas().await?;
        self.resolve(record, &targets).await
    }

    pub async fn find_all(&self) -> Result<Vec<ResolvedEntity>, StoreError> {
        let records = self.store.list_by_schema(&self.schema.id).await?;
        let targets = self.target_schemas().await?;

        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            resolved.push(self.resolve(record, &targets).await?);
        }
        Ok(resolved)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<ResolvedEntity>, StoreError> {
        let Some(record) = self.find_record(id).await? else {
            return Ok(None);
        };
        let targets = self.target_schemas().await?;
        Ok(Some(self.resolve(record, &targets).await?))
    }

    /// Replace the entity's scalar attributes and every relationship
    /// attribute present in the payload. Relationships the payload leaves
    /// out keep their edges.
    pub async fn update(
        &self,
        id: &str,
        entity: &Entity,
    ) -> Result<Option<ResolvedEntity>, StoreError> {
        let Some(existing) = self.find_record(id).await? else {
            return Ok(None);
        };

        let write = EntityWrite::partition(self.schema, &entity.fields)?;
        self.check_targets(&write.relationships).await?;

        let record = EntityRecord {
            attributes: write.scalars,
            ..existing
        };
        let Some(record) = self
            .store
            .update(record, &edge_sets(&write.relationships))
            .await?
        else {
            return Ok(None);
        };

        tracing::debug!(entity_id = %record.id, "Entity updated");
        let targets = self.target_schemas().await?;
        Ok(Some(self.resolve(record, &targets).await?))
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        if self.find_record(id).await?.is_none() {
            return Ok(false);
        }
        self.store.delete_by_id(id).await
    }

    /// Read one relationship attribute of an entity.
    pub async fn get_relationship(
        &self,
        id: &str,
        attribute: &str,
    ) -> Result<ResolvedRelationship, StoreError> {
        let record = self.require_record(id).await?;
        let attribute = self.relationship_attribute(attribute)?;
        let target = self.target_schema(attribute).await?;

        Ok(self.load_targets(&record.id, attribute, &target).await?)
    }

    /// Replace one relationship attribute of an entity with `value`, which
    /// must match the attribute's cardinality shape.
    pub async fn set_relationship(
        &self,
        id: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<ResolvedRelationship, StoreError> {
        let record = self.require_record(id).await?;
        let attribute = self.relationship_attribute(attribute)?;
        let target = self.target_schema(attribute).await?;

        let (cardinality, _) = attribute
            .relationship()
            .ok_or_else(|| CoreError::Internal("relationship attribute lost its kind".into()))?;
        let parsed = RelationshipValue::parse(&attribute.name, cardinality, value)?;

        let heads = parsed.target_ids();
        self.check_targets(&[(attribute.name.clone(), parsed)])
            .await?;
        let diff = self
            .store
            .replace_targets(&record.id, &attribute.name, &heads)
            .await?;
        tracing::debug!(
            entity_id = %record.id,
            relationship = %attribute.name,
            created = diff.created.len(),
            deleted = diff.deleted.len(),
            unchanged = diff.unchanged.len(),
            "Relationship edges replaced"
        );

        Ok(self.load_targets(&record.id, attribute, &target).await?)
    }

    async fn find_record(&self, id: &str) -> Result<Option<EntityRecord>, StoreError> {
        let record = self.store.find_by_id(id).await?;
        Ok(record.filter(|r| r.schema_id == self.schema.id))
    }

    async fn require_record(&self, id: &str) -> Result<EntityRecord, StoreError> {
        self.find_record(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Entity", id).into())
    }

    fn relationship_attribute(&self, name: &str) -> Result<&'a Attribute, CoreError> {
        let attribute = self
            .schema
            .attribute(name)
            .ok_or_else(|| CoreError::not_found("Attribute", name))?;
        if !attribute.is_relationship() {
            return Err(CoreError::Validation(
                "Target attribute is not a relationship.".to_string(),
            ));
        }
        Ok(attribute)
    }

    async fn target_schema(&self, attribute: &Attribute) -> Result<Schema, StoreError> {
        let target_id = attribute
            .relationship()
            .map(|(_, target)| target.clone())
            .unwrap_or_default();
        self.schemas
            .find_by_id(&target_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Schema", target_id).into())
    }

    /// Reject the write unless every referenced entity exists and belongs
    /// to the attribute's target schema.
    async fn check_targets(
        &self,
        relationships: &[(String, RelationshipValue)],
    ) -> Result<(), StoreError> {
        let mut details = Details::new();

        for (name, value) in relationships {
            let ids = value.target_ids();
            if ids.is_empty() {
                continue;
            }

            let target_id = self
                .schema
                .attribute(name)
                .and_then(Attribute::relationship)
                .map(|(_, target)| target.as_str())
                .unwrap_or_default();

            let found: HashMap<DbId, EntityRecord> = self
                .store
                .find_by_ids(&ids)
                .await?
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect();

            for id in &ids {
                let problem = match found.get(id) {
                    None => format!("Referenced entity {id} does not exist."),
                    Some(r) if r.schema_id != target_id => {
                        format!("Referenced entity {id} is not part of schema {target_id}.")
                    }
                    Some(_) => continue,
                };
                details.entry(name.clone()).or_insert(problem);
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidFields {
                message: "Relationship targets are invalid".to_string(),
                details,
            }
            .into())
        }
    }

    /// Look up the target schema of every relationship attribute once.
    ///
    /// Attributes whose target schema is gone are logged here and left out
    /// of the map, so reads skip them.
    async fn target_schemas(&self) -> Result<HashMap<DbId, Schema>, StoreError> {
        let mut targets = HashMap::new();
        for attribute in self.schema.relationship_attributes() {
            let Some((_, target_id)) = attribute.relationship() else {
                continue;
            };
            if targets.contains_key(target_id) {
                continue;
            }
            match self.schemas.find_by_id(target_id).await? {
                Some(target) => {
                    targets.insert(target_id.clone(), target);
                }
                None => tracing::warn!(
                    schema_id = %self.schema.id,
                    attribute = %attribute.name,
                    target_id = %target_id,
                    "Relationship target schema not found, skipping attribute"
                ),
            }
        }
        Ok(targets)
    }

    /// Attach every relationship attribute of the schema whose target is in
    /// `targets` to `record`.
    async fn resolve(
        &self,
        record: EntityRecord,
        targets: &HashMap<DbId, Schema>,
    ) -> Result<ResolvedEntity, StoreError> {
        let mut resolved = ResolvedEntity {
            record,
            relationships: Default::default(),
        };

        for attribute in self.schema.relationship_attributes() {
            let Some(target) = attribute
                .relationship()
                .and_then(|(_, target_id)| targets.get(target_id))
            else {
                continue;
            };

            let value = self
                .load_targets(&resolved.record.id, attribute, target)
                .await?;
            resolved
                .relationships
                .insert(attribute.name.clone(), value);
        }

        Ok(resolved)
    }

    async fn load_targets(
        &self,
        tail: &str,
        attribute: &Attribute,
        target: &Schema,
    ) -> Result<ResolvedRelationship, StoreError> {
        let heads = self.store.list_targets(tail, &attribute.name).await?;
        let mut found: HashMap<DbId, EntityRecord> = self
            .store
            .find_by_ids(&heads)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mut records = Vec::with_capacity(heads.len());
        for head in &heads {
            match found.remove(head) {
                Some(record) => records.push(record),
                None => tracing::warn!(
                    entity_id = %tail,
                    attribute = %attribute.name,
                    target_schema = %target.id,
                    head_id = %head,
                    "Relationship target entity not found, skipping edge"
                ),
            }
        }

        let plural = attribute
            .relationship()
            .is_some_and(|(cardinality, _)| cardinality.is_plural());
        if plural {
            Ok(ResolvedRelationship::Many(records))
        } else {
            Ok(ResolvedRelationship::One(records.into_iter().next()))
        }
    }
}

fn edge_sets(relationships: &[(String, RelationshipValue)]) -> Vec<EdgeSet> {
    relationships
        .iter()
        .map(|(name, value)| (name.clone(), value.target_ids()))
        .collect()
}
