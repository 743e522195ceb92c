//! Relationship materializer: one node plus one schema in, one record
//! out.
//!
//! Live edges are denormalized into static reference lists inside the
//! record. A record is always producible from partially attributed
//! source data: absent node attributes fall back to declared defaults,
//! and absent edge attributes fall back to a typed sentinel.

use crate::error::ValidationError;
use crate::graph::{AttrValue, Edge, GraphSource, Node};
use crate::record::{FieldValue, Record, Reference};
use crate::schema::{AttrType, DefaultValue, Direction, EdgeAttr, FieldType, ReferenceSpec, Schema};

/// Sentinel for an edge attribute absent from the source edge.
pub(crate) fn sentinel(attr_type: AttrType) -> AttrValue {
    match attr_type {
        AttrType::Str => AttrValue::Str("unknown".to_string()),
        AttrType::Int => AttrValue::Int(0),
        AttrType::Bool => AttrValue::Bool(false),
    }
}

fn primitive_matches(value: &AttrValue, field_type: &FieldType) -> bool {
    matches!(
        (value, field_type),
        (AttrValue::Str(_), FieldType::Str)
            | (AttrValue::Int(_), FieldType::Int)
            | (AttrValue::Bool(_), FieldType::Bool)
    )
}

fn attr_matches(value: &AttrValue, attr_type: AttrType) -> bool {
    matches!(
        (value, attr_type),
        (AttrValue::Str(_), AttrType::Str)
            | (AttrValue::Int(_), AttrType::Int)
            | (AttrValue::Bool(_), AttrType::Bool)
    )
}

fn default_to_value(default: &DefaultValue) -> FieldValue {
    match default {
        DefaultValue::Str(s) => FieldValue::Str(s.clone()),
        DefaultValue::Int(i) => FieldValue::Int(*i),
        DefaultValue::Bool(b) => FieldValue::Bool(*b),
        DefaultValue::EmptyList => FieldValue::References(Vec::new()),
    }
}

fn attr_to_value(value: &AttrValue) -> FieldValue {
    match value {
        AttrValue::Str(s) => FieldValue::Str(s.clone()),
        AttrValue::Int(i) => FieldValue::Int(*i),
        AttrValue::Bool(b) => FieldValue::Bool(*b),
    }
}

/// Copies the declared edge attributes off one edge, substituting the
/// sentinel for anything absent.
fn entry_attrs(
    node: &Node,
    edge: &Edge,
    declared: &[EdgeAttr],
) -> Result<Vec<(String, AttrValue)>, ValidationError> {
    let mut attrs = Vec::with_capacity(declared.len());
    for attr in declared {
        let value = match edge.attr(&attr.name) {
            Some(v) => {
                if !attr_matches(v, attr.attr_type) {
                    return Err(ValidationError::AttributeType {
                        node: node.id().to_string(),
                        attribute: attr.name.clone(),
                        expected: attr.attr_type.name(),
                    });
                }
                v.clone()
            }
            None => sentinel(attr.attr_type),
        };
        attrs.push((attr.name.clone(), value));
    }
    Ok(attrs)
}

/// Builds one reference list from the node's live edges.
///
/// Entry order follows the adapter's traversal order and is not sorted.
/// A relationship tag matching zero edges yields an empty list, never an
/// error.
fn materialize_references(
    graph: &dyn GraphSource,
    node: &Node,
    spec: &ReferenceSpec,
) -> Result<Vec<Reference>, ValidationError> {
    let mut entries = Vec::new();
    match spec.direction {
        Direction::Outgoing => {
            for edge in graph.outgoing_edges(node.id(), &spec.relationship) {
                entries.push(Reference {
                    target: edge.target().to_string(),
                    attrs: entry_attrs(node, edge, &spec.edge_attributes)?,
                });
            }
        }
        Direction::Incoming => {
            // Back-reference: source ids of all incoming edges of the
            // relationship type.
            for edge in graph.incoming_edges(node.id(), &spec.relationship) {
                entries.push(Reference {
                    target: edge.source().to_string(),
                    attrs: entry_attrs(node, edge, &spec.edge_attributes)?,
                });
            }
        }
    }
    Ok(entries)
}

/// Produces exactly one record for one node under one schema.
///
/// Non-reference fields copy the node attribute, substituting the
/// field's declared default when the attribute is absent; the `id`
/// field is filled from the node's identifier. Attribute values are
/// checked against the declared primitive kinds here, once.
pub fn materialize(
    graph: &dyn GraphSource,
    node: &Node,
    schema: &Schema,
) -> Result<Record, ValidationError> {
    let mut values = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let value = match &field.field_type {
            FieldType::References(spec) => {
                FieldValue::References(materialize_references(graph, node, spec)?)
            }
            _ if field.name == "id" => FieldValue::Str(node.id().to_string()),
            primitive => match node.attr(&field.name) {
                Some(attr) => {
                    if !primitive_matches(attr, primitive) {
                        return Err(ValidationError::AttributeType {
                            node: node.id().to_string(),
                            attribute: field.name.clone(),
                            expected: primitive.name(),
                        });
                    }
                    attr_to_value(attr)
                }
                None => match &field.default {
                    Some(default) => default_to_value(default),
                    None => {
                        return Err(ValidationError::MissingAttribute {
                            node: node.id().to_string(),
                            attribute: field.name.clone(),
                        });
                    }
                },
            },
        };
        values.push((field.name.clone(), value));
    }

    Ok(Record::new(values))
}
