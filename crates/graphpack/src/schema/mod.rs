//! Schema model: record types, field types, and structural equality.
//!
//! A [`Schema`] describes one entity type as a record: an ordered set of
//! named fields, each a primitive or a reference list bound to a
//! relationship. Schemas are immutable once constructed and are
//! structurally comparable, which underlies container compatibility
//! checks on read.

pub mod parse;

use crate::error::SchemaError;
use crate::limits::{MAX_EDGE_ATTRIBUTES, MAX_FIELDS_PER_SCHEMA};

/// Primitive attribute types for edge attributes copied into reference
/// entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttrType {
    Str = 1,
    Int = 2,
    Bool = 3,
}

impl AttrType {
    /// Creates an AttrType from its wire tag.
    pub fn from_tag(v: u8) -> Option<AttrType> {
        match v {
            1 => Some(AttrType::Str),
            2 => Some(AttrType::Int),
            3 => Some(AttrType::Bool),
            _ => None,
        }
    }

    /// Returns the wire tag for this type.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the schema-document name of this type.
    pub fn name(self) -> &'static str {
        match self {
            AttrType::Str => "string",
            AttrType::Int => "int",
            AttrType::Bool => "boolean",
        }
    }
}

/// Direction of the edges a reference field materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward reference: the node's outgoing edges.
    Outgoing,
    /// Back-reference: the node's incoming edges, source ids only unless
    /// attributes are declared explicitly.
    Incoming,
}

impl Direction {
    /// Returns the schema-document name of this direction.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }
}

/// A declared edge attribute copied into each reference entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeAttr {
    pub name: String,
    pub attr_type: AttrType,
}

/// Declaration of a reference-list field: which relationship it
/// materializes, in which direction, and which edge attributes each
/// entry carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpec {
    /// Name of the nested entry record type.
    pub entry_name: String,
    /// Relationship tag the field materializes.
    pub relationship: String,
    pub direction: Direction,
    /// Edge attributes copied into each entry, in declared order.
    pub edge_attributes: Vec<EdgeAttr>,
}

impl ReferenceSpec {
    /// Declares a forward-reference field over outgoing edges.
    pub fn outgoing(entry_name: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            relationship: relationship.into(),
            direction: Direction::Outgoing,
            edge_attributes: Vec::new(),
        }
    }

    /// Declares a back-reference field over incoming edges.
    pub fn incoming(entry_name: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            relationship: relationship.into(),
            direction: Direction::Incoming,
            edge_attributes: Vec::new(),
        }
    }

    /// Adds a declared edge attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.edge_attributes.push(EdgeAttr {
            name: name.into(),
            attr_type,
        });
        self
    }
}

/// Declared default for a field whose node attribute is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Str(String),
    Int(i64),
    Bool(bool),
    /// The only default a reference field may declare.
    EmptyList,
}

/// Type of one schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Bool,
    References(ReferenceSpec),
}

impl FieldType {
    /// Returns the schema-document name of this type.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Int => "int",
            FieldType::Bool => "boolean",
            FieldType::References(_) => "references",
        }
    }
}

/// One named field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub default: Option<DefaultValue>,
}

impl Field {
    /// A string field with no default.
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Str,
            default: None,
        }
    }

    /// An integer field with no default.
    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Int,
            default: None,
        }
    }

    /// A boolean field with no default.
    pub fn bool(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Bool,
            default: None,
        }
    }

    /// A reference-list field.
    pub fn references(name: impl Into<String>, spec: ReferenceSpec) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::References(spec),
            default: None,
        }
    }

    /// Sets the field's default. Validated against the field type when
    /// the schema is defined.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// An immutable, named record type.
///
/// Two schemas are equal iff name, namespace, field order, field names,
/// field types, and defaults match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    namespace: Option<String>,
    fields: Vec<Field>,
}

impl Schema {
    /// Defines a schema from a name and ordered fields.
    ///
    /// Fails if field names collide, nested entry record names collide
    /// (or shadow the schema name), a reference field declares an empty
    /// relationship tag or duplicate edge attributes, a default does not
    /// match its field's type, or the schema lacks a string `id` field.
    pub fn define(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, SchemaError> {
        Self::build(name.into(), None, fields)
    }

    /// Defines a schema inside a namespace.
    pub fn define_in(
        namespace: impl Into<String>,
        name: impl Into<String>,
        fields: Vec<Field>,
    ) -> Result<Self, SchemaError> {
        Self::build(name.into(), Some(namespace.into()), fields)
    }

    fn build(
        name: String,
        namespace: Option<String>,
        fields: Vec<Field>,
    ) -> Result<Self, SchemaError> {
        if fields.len() > MAX_FIELDS_PER_SCHEMA {
            return Err(SchemaError::Malformed(format!(
                "schema {name:?} declares {} fields (maximum {MAX_FIELDS_PER_SCHEMA})",
                fields.len()
            )));
        }

        let mut seen_fields: Vec<&str> = Vec::with_capacity(fields.len());
        let mut seen_types: Vec<String> = vec![name.clone()];
        for field in &fields {
            if seen_fields.contains(&field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: name,
                    field: field.name.clone(),
                });
            }
            seen_fields.push(&field.name);

            if let FieldType::References(spec) = &field.field_type {
                if spec.relationship.is_empty() {
                    return Err(SchemaError::EmptyRelationship {
                        field: field.name.clone(),
                    });
                }
                if seen_types.iter().any(|t| *t == spec.entry_name) {
                    return Err(SchemaError::DuplicateTypeName {
                        schema: name,
                        name: spec.entry_name.clone(),
                    });
                }
                seen_types.push(spec.entry_name.clone());

                if spec.edge_attributes.len() > MAX_EDGE_ATTRIBUTES {
                    return Err(SchemaError::Malformed(format!(
                        "field {:?} declares {} edge attributes (maximum {MAX_EDGE_ATTRIBUTES})",
                        field.name,
                        spec.edge_attributes.len()
                    )));
                }
                let mut seen_attrs: Vec<&str> = Vec::with_capacity(spec.edge_attributes.len());
                for attr in &spec.edge_attributes {
                    if seen_attrs.contains(&attr.name.as_str()) {
                        return Err(SchemaError::DuplicateEdgeAttribute {
                            field: field.name.clone(),
                            attribute: attr.name.clone(),
                        });
                    }
                    seen_attrs.push(&attr.name);
                }
            }

            if let Some(default) = &field.default {
                let matches = matches!(
                    (&field.field_type, default),
                    (FieldType::Str, DefaultValue::Str(_))
                        | (FieldType::Int, DefaultValue::Int(_))
                        | (FieldType::Bool, DefaultValue::Bool(_))
                        | (FieldType::References(_), DefaultValue::EmptyList)
                );
                if !matches {
                    return Err(SchemaError::DefaultTypeMismatch {
                        field: field.name.clone(),
                    });
                }
            }
        }

        let id_ok = fields
            .iter()
            .any(|f| f.name == "id" && f.field_type == FieldType::Str);
        if !id_ok {
            return Err(SchemaError::MissingIdField {
                schema: name,
                expected: "string",
            });
        }

        Ok(Self {
            name,
            namespace,
            fields,
        })
    }

    /// The schema's record type name. Doubles as the entity type tag the
    /// conversion pass matches against node type tags.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema's namespace, if declared.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The ordered fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
