//! Relationship edges, cardinality shapes and edge-set replacement planning.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::DbId;

/// Declared on a RELATIONSHIP attribute; decides whether the attribute
/// reads and writes a single entity or an array of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// `true` for cardinalities whose values are arrays.
    pub fn is_plural(self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "ONE_TO_ONE",
            Cardinality::OneToMany => "ONE_TO_MANY",
            Cardinality::ManyToOne => "MANY_TO_ONE",
            Cardinality::ManyToMany => "MANY_TO_MANY",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, named edge from `tail` (the owning entity) to `head`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Name of the RELATIONSHIP attribute on the tail entity's schema.
    pub name: String,
    pub head: DbId,
    pub tail: DbId,
}

/// The value written to a relationship attribute, already checked against
/// the attribute's cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipValue {
    /// Singular cardinality. `None` clears the relationship.
    One(Option<DbId>),
    /// Plural cardinality, deduplicated, first occurrence wins.
    Many(Vec<DbId>),
}

impl RelationshipValue {
    /// Parse a JSON payload for the attribute `name` with the given cardinality.
    ///
    /// Plural cardinalities require an array and singular ones reject it.
    /// Each reference is either an id string or an object with a string `id`.
    pub fn parse(name: &str, cardinality: Cardinality, value: &Value) -> Result<Self, CoreError> {
        if cardinality.is_plural() {
            let Value::Array(items) = value else {
                return Err(CoreError::Validation(format!(
                    "{name} has cardinality {cardinality} which can only be updated with an array."
                )));
            };

            let mut seen = HashSet::new();
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                let id = reference_id(name, item)?;
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            Ok(RelationshipValue::Many(ids))
        } else {
            match value {
                Value::Array(_) => Err(CoreError::Validation(format!(
                    "{name} has cardinality {cardinality} which can only be updated with an entity."
                ))),
                Value::Null => Ok(RelationshipValue::One(None)),
                other => Ok(RelationshipValue::One(Some(reference_id(name, other)?))),
            }
        }
    }

    /// Target ids in write order.
    pub fn target_ids(&self) -> Vec<DbId> {
        match self {
            RelationshipValue::One(id) => id.iter().cloned().collect(),
            RelationshipValue::Many(ids) => ids.clone(),
        }
    }
}

fn reference_id(name: &str, value: &Value) -> Result<DbId, CoreError> {
    let id = match value {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map.get("id").and_then(Value::as_str),
        _ => None,
    };

    match id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(CoreError::Validation(format!(
            "{name} references must be entity ids or entities with an id."
        ))),
    }
}

/// Outcome of replacing an edge set: which heads gain, lose, or keep an edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeDiff {
    pub created: Vec<DbId>,
    pub deleted: Vec<DbId>,
    pub unchanged: Vec<DbId>,
}

impl EdgeDiff {
    /// Plan the set-difference update from `current` heads to `desired` heads.
    ///
    /// `created` follows `desired` order; `deleted` and `unchanged` follow
    /// `current` order.
    pub fn plan(current: &[DbId], desired: &[DbId]) -> Self {
        let current_set: HashSet<&DbId> = current.iter().collect();
        let desired_set: HashSet<&DbId> = desired.iter().collect();

        let mut diff = EdgeDiff::default();
        for id in current {
            if desired_set.contains(id) {
                diff.unchanged.push(id.clone());
            } else {
                diff.deleted.push(id.clone());
            }
        }

        let mut queued = HashSet::new();
        for id in desired {
            if !current_set.contains(id) && queued.insert(id) {
                diff.created.push(id.clone());
            }
        }
        diff
    }

    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }

    /// Heads after the replace, in stored order: kept edges first, then new ones.
    pub fn resulting_heads(&self) -> Vec<DbId> {
        self.unchanged
            .iter()
            .chain(self.created.iter())
            .cloned()
            .collect()
    }
}
