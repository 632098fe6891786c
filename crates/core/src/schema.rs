//! Schema and attribute definitions.
//!
//! An [`Attribute`] carries the fields every attribute shares and a tagged
//! [`AttributeKind`] holding the type-specific options, so dispatching on the
//! attribute type is a plain `match`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Details};
use crate::relationship::Cardinality;
use crate::types::DbId;

/// Keys every entity carries that are not attributes.
pub const RESERVED_KEYS: [&str; 2] = ["id", "schemaId"];

/// A stored schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: DbId,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A typed field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// The `type` discriminant and the options that only make sense for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeKind {
    String {
        #[serde(
            rename = "maxLength",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_length: Option<u64>,
    },
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default)]
        integer: bool,
    },
    Boolean,
    Relationship {
        cardinality: Cardinality,
        #[serde(rename = "targetId")]
        target_id: DbId,
    },
}

impl Attribute {
    pub fn is_relationship(&self) -> bool {
        matches!(self.kind, AttributeKind::Relationship { .. })
    }

    /// `(cardinality, target schema id)` for RELATIONSHIP attributes.
    pub fn relationship(&self) -> Option<(Cardinality, &DbId)> {
        match &self.kind {
            AttributeKind::Relationship {
                cardinality,
                target_id,
            } => Some((*cardinality, target_id)),
            _ => None,
        }
    }
}

impl Schema {
    /// Look up an attribute by name. The first declaration wins.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// STRING, NUMERIC and BOOLEAN attributes.
    pub fn scalar_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| !a.is_relationship())
    }

    pub fn relationship_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_relationship())
    }
}

/// Request body for creating a schema. Any client-supplied `id` is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchema {
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl CreateSchema {
    pub fn into_schema(self, id: DbId) -> Schema {
        Schema {
            id,
            display: self.display,
            description: self.description,
            attributes: self.attributes,
        }
    }
}

/// Request body for updating a schema. Absent fields keep their value;
/// `attributes` is replaced wholesale when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSchema {
    pub display: Option<String>,
    pub description: Option<String>,
    pub attributes: Option<Vec<Attribute>>,
}

impl UpdateSchema {
    pub fn apply_to(self, schema: &mut Schema) {
        if let Some(display) = self.display {
            schema.display = display;
        }
        if let Some(description) = self.description {
            schema.description = description;
        }
        if let Some(attributes) = self.attributes {
            schema.attributes = attributes;
        }
    }
}

/// Check an attribute list before it is stored.
///
/// Names must be non-empty, unique, and not reserved entity keys;
/// relationships need a target schema; numeric bounds must be ordered.
pub fn check_attributes(attributes: &[Attribute]) -> Result<(), CoreError> {
    let mut details = Details::new();
    let mut seen = std::collections::HashSet::new();

    for (index, attribute) in attributes.iter().enumerate() {
        let key = if attribute.name.is_empty() {
            format!("attributes[{index}]")
        } else {
            attribute.name.clone()
        };

        let problem = if attribute.name.is_empty() {
            Some("Attribute name must not be empty.".to_string())
        } else if RESERVED_KEYS.contains(&attribute.name.as_str()) {
            Some(format!("'{}' is a reserved key.", attribute.name))
        } else if !seen.insert(attribute.name.as_str()) {
            Some("Attribute names must be unique within a schema.".to_string())
        } else {
            match &attribute.kind {
                AttributeKind::Relationship { target_id, .. } if target_id.is_empty() => {
                    Some("Relationship attributes need a targetId.".to_string())
                }
                AttributeKind::Numeric {
                    min: Some(min),
                    max: Some(max),
                    ..
                } if min > max => Some(format!("min ({min}) must not exceed max ({max}).")),
                _ => None,
            }
        };

        if let Some(problem) = problem {
            details.insert(key, problem);
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(CoreError::InvalidFields {
            message: "Schema definition is invalid".to_string(),
            details,
        })
    }
}
