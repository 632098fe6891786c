//! Entity payloads, stored records and the resolved read representation.
//!
//! Three shapes:
//! - [`Entity`]: whatever the client sent, as an open JSON map.
//! - [`EntityRecord`]: what a store persists, scalar attributes only.
//! - [`ResolvedEntity`]: a record plus its relationships, built on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::CoreError;
use crate::relationship::RelationshipValue;
use crate::schema::{AttributeKind, Schema};
use crate::types::DbId;

/// An inbound entity payload: `id`, `schemaId` and any other keys.
///
/// The reserved keys hold raw JSON so a payload with a non-string
/// `schemaId` still reaches the validator and fails as a mismatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "schemaId", default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    /// `schemaId` when the client sent it as a string.
    pub fn schema_id_str(&self) -> Option<&str> {
        self.schema_id.as_ref().and_then(Value::as_str)
    }
}

/// A scalar attribute value as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Boolean(bool),
    Number(Number),
    String(String),
}

impl ScalarValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ScalarValue::Boolean(*b)),
            Value::Number(n) => Some(ScalarValue::Number(n.clone())),
            Value::String(s) => Some(ScalarValue::String(s.clone())),
            _ => None,
        }
    }
}

/// The persisted form of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: DbId,
    #[serde(rename = "schemaId")]
    pub schema_id: DbId,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, ScalarValue>,
}

/// A relationship attribute as it appears on a read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedRelationship {
    One(Option<EntityRecord>),
    Many(Vec<EntityRecord>),
}

/// An entity with its relationship attributes resolved one level deep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntity {
    #[serde(flatten)]
    pub record: EntityRecord,
    #[serde(flatten)]
    pub relationships: BTreeMap<String, ResolvedRelationship>,
}

/// A validated write, split into what goes on the record and what goes
/// into the relationship store.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWrite {
    pub scalars: BTreeMap<String, ScalarValue>,
    pub relationships: Vec<(String, RelationshipValue)>,
}

impl EntityWrite {
    /// Partition the payload's non-reserved keys by attribute type.
    ///
    /// Expects a payload that already passed validation. Null scalar values
    /// are left off the record; relationship values are shape-checked
    /// against their attribute's cardinality.
    pub fn partition(schema: &Schema, fields: &Map<String, Value>) -> Result<Self, CoreError> {
        let mut scalars = BTreeMap::new();
        let mut relationships = Vec::new();

        for (key, value) in fields {
            let Some(attribute) = schema.attribute(key) else {
                return Err(CoreError::Validation(format!(
                    "{key} is not defined for this schema."
                )));
            };

            match &attribute.kind {
                AttributeKind::Relationship { cardinality, .. } => {
                    let parsed = RelationshipValue::parse(key, *cardinality, value)?;
                    relationships.push((key.clone(), parsed));
                }
                _ => {
                    if let Some(scalar) = ScalarValue::from_json(value) {
                        scalars.insert(key.clone(), scalar);
                    }
                }
            }
        }

        Ok(EntityWrite {
            scalars,
            relationships,
        })
    }
}
