//! JSON schema documents.
//!
//! One JSON document per entity type is the canonical serialized form:
//! it is what [`Schema::parse`] consumes and what the container embeds
//! verbatim as its schema block.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::limits::MAX_SCHEMA_JSON;
use crate::schema::{AttrType, DefaultValue, Direction, Field, FieldType, ReferenceSpec, Schema};

#[derive(Debug, Serialize, Deserialize)]
struct SchemaDoc {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    fields: Vec<FieldDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldDoc {
    name: String,
    #[serde(rename = "type")]
    field_type: TypeDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<serde_json::Value>,
}

/// A field type is either a primitive tag string or an inline
/// references declaration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum TypeDoc {
    Tag(String),
    References(Box<ReferencesDoc>),
}

#[derive(Debug, Serialize, Deserialize)]
struct ReferencesDoc {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    relationship: String,
    direction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    edge_attributes: Vec<EdgeAttrDoc>,
}

/// Edge attributes accept a bare name (implies string) or a typed form.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum EdgeAttrDoc {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type")]
        attr_type: TypeDoc,
    },
}

fn primitive_from_tag(field: &str, tag: &str) -> Result<FieldType, SchemaError> {
    match tag {
        "string" => Ok(FieldType::Str),
        "int" => Ok(FieldType::Int),
        "boolean" => Ok(FieldType::Bool),
        other => Err(SchemaError::UnknownType {
            field: field.to_string(),
            found: other.to_string(),
        }),
    }
}

fn attr_type_from_tag(field: &str, tag: &str) -> Result<AttrType, SchemaError> {
    match tag {
        "string" => Ok(AttrType::Str),
        "int" => Ok(AttrType::Int),
        "boolean" => Ok(AttrType::Bool),
        other => Err(SchemaError::UnknownType {
            field: field.to_string(),
            found: other.to_string(),
        }),
    }
}

fn reference_spec(field: &str, doc: &ReferencesDoc) -> Result<ReferenceSpec, SchemaError> {
    if doc.kind != "references" {
        return Err(SchemaError::UnknownType {
            field: field.to_string(),
            found: doc.kind.clone(),
        });
    }
    let direction = match doc.direction.as_str() {
        "outgoing" => Direction::Outgoing,
        "incoming" => Direction::Incoming,
        other => {
            return Err(SchemaError::UnknownDirection {
                field: field.to_string(),
                found: other.to_string(),
            });
        }
    };

    let mut spec = ReferenceSpec {
        entry_name: doc.name.clone(),
        relationship: doc.relationship.clone(),
        direction,
        edge_attributes: Vec::with_capacity(doc.edge_attributes.len()),
    };
    for attr in &doc.edge_attributes {
        let (name, attr_type) = match attr {
            EdgeAttrDoc::Name(name) => (name.clone(), AttrType::Str),
            EdgeAttrDoc::Typed { name, attr_type } => match attr_type {
                TypeDoc::Tag(tag) => (name.clone(), attr_type_from_tag(field, tag)?),
                TypeDoc::References(_) => {
                    return Err(SchemaError::NestedReference {
                        field: field.to_string(),
                    });
                }
            },
        };
        spec = spec.with_attribute(name, attr_type);
    }
    Ok(spec)
}

fn default_value(field: &FieldDoc, field_type: &FieldType) -> Result<DefaultValue, SchemaError> {
    let mismatch = || SchemaError::DefaultTypeMismatch {
        field: field.name.clone(),
    };
    let value = field.default.as_ref().ok_or_else(mismatch)?;
    match (field_type, value) {
        (FieldType::Str, serde_json::Value::String(s)) => Ok(DefaultValue::Str(s.clone())),
        (FieldType::Int, serde_json::Value::Number(n)) => {
            n.as_i64().map(DefaultValue::Int).ok_or_else(mismatch)
        }
        (FieldType::Bool, serde_json::Value::Bool(b)) => Ok(DefaultValue::Bool(*b)),
        (FieldType::References(_), serde_json::Value::Array(items)) if items.is_empty() => {
            Ok(DefaultValue::EmptyList)
        }
        _ => Err(mismatch()),
    }
}

impl Schema {
    /// Parses a schema from its canonical JSON document.
    ///
    /// All structural checks of [`Schema::define`] apply, plus document
    /// checks: missing required keys, unknown type tags or directions,
    /// and references types nested inside a reference entry are all
    /// rejected with a [`SchemaError`].
    pub fn parse(json: &str) -> Result<Self, SchemaError> {
        if json.len() > MAX_SCHEMA_JSON {
            return Err(SchemaError::DocumentTooLarge {
                len: json.len(),
                max: MAX_SCHEMA_JSON,
            });
        }
        let doc: SchemaDoc = serde_json::from_str(json)?;

        let mut fields = Vec::with_capacity(doc.fields.len());
        for fd in &doc.fields {
            let field_type = match &fd.field_type {
                TypeDoc::Tag(tag) => primitive_from_tag(&fd.name, tag)?,
                TypeDoc::References(rd) => FieldType::References(reference_spec(&fd.name, rd)?),
            };
            let default = if fd.default.is_some() {
                Some(default_value(fd, &field_type)?)
            } else {
                None
            };
            fields.push(Field {
                name: fd.name.clone(),
                field_type,
                default,
            });
        }

        match doc.namespace {
            Some(ns) => Schema::define_in(ns, doc.name, fields),
            None => Schema::define(doc.name, fields),
        }
    }

    /// Serializes the schema to its canonical JSON document.
    pub fn to_json(&self) -> String {
        let doc = SchemaDoc {
            name: self.name().to_string(),
            namespace: self.namespace().map(str::to_string),
            fields: self
                .fields()
                .iter()
                .map(|f| FieldDoc {
                    name: f.name.clone(),
                    field_type: match &f.field_type {
                        FieldType::Str | FieldType::Int | FieldType::Bool => {
                            TypeDoc::Tag(f.field_type.name().to_string())
                        }
                        FieldType::References(spec) => TypeDoc::References(Box::new(ReferencesDoc {
                            kind: "references".to_string(),
                            name: spec.entry_name.clone(),
                            relationship: spec.relationship.clone(),
                            direction: spec.direction.name().to_string(),
                            edge_attributes: spec
                                .edge_attributes
                                .iter()
                                .map(|a| EdgeAttrDoc::Typed {
                                    name: a.name.clone(),
                                    attr_type: TypeDoc::Tag(a.attr_type.name().to_string()),
                                })
                                .collect(),
                        })),
                    },
                    default: f.default.as_ref().map(|d| match d {
                        DefaultValue::Str(s) => serde_json::Value::String(s.clone()),
                        DefaultValue::Int(i) => serde_json::Value::Number((*i).into()),
                        DefaultValue::Bool(b) => serde_json::Value::Bool(*b),
                        DefaultValue::EmptyList => serde_json::Value::Array(Vec::new()),
                    }),
                })
                .collect(),
        };
        // SchemaDoc contains no map keys or non-string values that can
        // fail to serialize.
        serde_json::to_string_pretty(&doc).unwrap_or_default()
    }
}
