//! Round-trip verifier: replays decoded record streams against the
//! original graph and checks relationship symmetry.
//!
//! Violations are collected, never fail-fast: the point is to surface
//! every integrity issue, not to terminate on the first mismatch.
//! Reference lists are compared as multisets keyed by target id plus
//! attributes, honoring the documented enumeration-order non-guarantee.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::ConsistencyError;
use crate::graph::{Edge, GraphSource, Node};
use crate::materialize::sentinel;
use crate::record::{FieldValue, Record, Reference};
use crate::schema::{Direction, FieldType, ReferenceSpec, Schema};

/// Outcome of one verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    violations: Vec<ConsistencyError>,
    records_checked: usize,
    references_checked: usize,
}

impl ConsistencyReport {
    /// True when no violation was found.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every violation found, in discovery order.
    pub fn violations(&self) -> &[ConsistencyError] {
        &self.violations
    }

    pub fn records_checked(&self) -> usize {
        self.records_checked
    }

    pub fn references_checked(&self) -> usize {
        self.references_checked
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked {} records and {} references: {} violation(s)",
            self.records_checked,
            self.references_checked,
            self.violations.len()
        )
    }
}

/// Builds the reference list a node's live edges should have produced.
///
/// Tolerant on purpose: a wrongly typed edge attribute is copied as-is
/// so the comparison can flag the mismatch instead of aborting.
fn expected_references(
    graph: &dyn GraphSource,
    node: &Node,
    spec: &ReferenceSpec,
) -> Vec<Reference> {
    let edges: Vec<(&str, &Edge)> = match spec.direction {
        Direction::Outgoing => graph
            .outgoing_edges(node.id(), &spec.relationship)
            .map(|e| (e.target(), e))
            .collect(),
        Direction::Incoming => graph
            .incoming_edges(node.id(), &spec.relationship)
            .map(|e| (e.source(), e))
            .collect(),
    };

    edges
        .into_iter()
        .map(|(target, edge)| Reference {
            target: target.to_string(),
            attrs: spec
                .edge_attributes
                .iter()
                .map(|attr| {
                    let value = edge
                        .attr(&attr.name)
                        .cloned()
                        .unwrap_or_else(|| sentinel(attr.attr_type));
                    (attr.name.clone(), value)
                })
                .collect(),
        })
        .collect()
}

/// Diffs an actual reference list against the expected one as
/// multisets, reporting each missing and unexpected entry.
fn diff_references<'a>(
    expected: &'a [Reference],
    actual: &'a [Reference],
) -> (Vec<&'a Reference>, Vec<&'a Reference>) {
    let mut counts: FxHashMap<&Reference, i64> = FxHashMap::default();
    for r in expected {
        *counts.entry(r).or_insert(0) += 1;
    }

    let mut unexpected = Vec::new();
    for r in actual {
        match counts.get_mut(r) {
            Some(c) if *c > 0 => *c -= 1,
            _ => unexpected.push(r),
        }
    }
    let mut missing = Vec::new();
    for r in expected {
        if let Some(c) = counts.get_mut(r) {
            if *c > 0 {
                *c -= 1;
                missing.push(r);
            }
        }
    }
    (missing, unexpected)
}

struct Indexes<'a> {
    /// node id -> type tag, over every converted type
    node_types: FxHashMap<&'a str, &'a str>,
    /// type tag -> (record id -> record)
    records: FxHashMap<&'a str, FxHashMap<&'a str, &'a Record>>,
    /// relationship -> (schema name, back-reference field name)
    back_fields: FxHashMap<&'a str, Vec<(&'a str, &'a str)>>,
}

fn build_indexes<'a>(
    graph: &'a dyn GraphSource,
    schemas: &'a [Schema],
    decoded: &'a BTreeMap<String, Vec<Record>>,
) -> Indexes<'a> {
    let mut node_types = FxHashMap::default();
    let mut records: FxHashMap<&str, FxHashMap<&str, &Record>> = FxHashMap::default();
    let mut back_fields: FxHashMap<&str, Vec<(&str, &str)>> = FxHashMap::default();

    for schema in schemas {
        for node in graph.nodes_of_type(schema.name()) {
            node_types.insert(node.id(), node.type_tag());
        }
        for field in schema.fields() {
            if let FieldType::References(spec) = &field.field_type {
                if spec.direction == Direction::Incoming {
                    back_fields
                        .entry(spec.relationship.as_str())
                        .or_default()
                        .push((schema.name(), field.name.as_str()));
                }
            }
        }
    }
    for (entity_type, stream) in decoded {
        let by_id = records.entry(entity_type.as_str()).or_default();
        for record in stream {
            if let Some(id) = record.id() {
                by_id.insert(id, record);
            }
        }
    }

    Indexes {
        node_types,
        records,
        back_fields,
    }
}

/// Verifies decoded record streams (one per entity type, keyed by type
/// tag) against the original graph.
///
/// For every forward reference on a source record the target must exist
/// as a converted node, and where some schema declares the matching
/// back-reference field for the relationship, the target's
/// back-reference list must contain the source id. Forward and back
/// reference lists must also equal, as multisets, what the graph's
/// edges derive.
pub fn verify(
    graph: &dyn GraphSource,
    schemas: &[Schema],
    decoded: &BTreeMap<String, Vec<Record>>,
) -> ConsistencyReport {
    let idx = build_indexes(graph, schemas, decoded);

    let mut violations = Vec::new();
    let mut records_checked = 0usize;
    let mut references_checked = 0usize;

    for schema in schemas {
        let by_id = idx.records.get(schema.name());
        for node in graph.nodes_of_type(schema.name()) {
            records_checked += 1;
            let Some(record) = by_id.and_then(|m| m.get(node.id())) else {
                violations.push(ConsistencyError::MissingRecord {
                    entity_type: schema.name().to_string(),
                    node: node.id().to_string(),
                });
                continue;
            };

            for field in schema.fields() {
                let FieldType::References(spec) = &field.field_type else {
                    continue;
                };
                let actual = record
                    .get(&field.name)
                    .and_then(FieldValue::as_references)
                    .unwrap_or(&[]);
                references_checked += actual.len();

                let expected = expected_references(graph, node, spec);
                let (missing, unexpected) = diff_references(&expected, actual);

                match spec.direction {
                    Direction::Outgoing => {
                        for r in missing {
                            violations.push(ConsistencyError::MissingForwardReference {
                                src: node.id().to_string(),
                                field: field.name.clone(),
                                target: r.target.clone(),
                            });
                        }
                        for r in unexpected {
                            violations.push(ConsistencyError::UnexpectedForwardReference {
                                src: node.id().to_string(),
                                field: field.name.clone(),
                                target: r.target.clone(),
                            });
                        }
                        check_forward_entries(
                            &idx,
                            node,
                            &field.name,
                            spec,
                            actual,
                            &mut violations,
                        );
                    }
                    Direction::Incoming => {
                        for r in missing {
                            violations.push(ConsistencyError::MissingBackReference {
                                target: node.id().to_string(),
                                field: field.name.clone(),
                                src: r.target.clone(),
                            });
                        }
                        for r in unexpected {
                            violations.push(ConsistencyError::UnexpectedBackReference {
                                node: node.id().to_string(),
                                field: field.name.clone(),
                                src: r.target.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    ConsistencyReport {
        violations,
        records_checked,
        references_checked,
    }
}

/// Per forward entry: the target must be a converted node, and where a
/// schema declares the reverse field for this relationship, the
/// target's back-reference list must contain the source id.
fn check_forward_entries(
    idx: &Indexes<'_>,
    node: &Node,
    field_name: &str,
    spec: &ReferenceSpec,
    actual: &[Reference],
    violations: &mut Vec<ConsistencyError>,
) {
    for entry in actual {
        let Some(&target_type) = idx.node_types.get(entry.target.as_str()) else {
            violations.push(ConsistencyError::MissingTarget {
                src: node.id().to_string(),
                field: field_name.to_string(),
                target: entry.target.clone(),
            });
            continue;
        };

        let Some(back_fields) = idx.back_fields.get(spec.relationship.as_str()) else {
            continue;
        };
        for (schema_name, back_field) in back_fields {
            if *schema_name != target_type {
                continue;
            }
            let listed = idx
                .records
                .get(target_type)
                .and_then(|m| m.get(entry.target.as_str()))
                .and_then(|r| r.get(back_field))
                .and_then(FieldValue::as_references)
                .is_some_and(|refs| refs.iter().any(|r| r.target == node.id()));
            if !listed {
                violations.push(ConsistencyError::MissingBackReference {
                    target: entry.target.clone(),
                    field: (*back_field).to_string(),
                    src: node.id().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, MemoryGraph};
    use crate::materialize::materialize;
    use crate::schema::{AttrType, DefaultValue, Field};

    fn schemas() -> Vec<Schema> {
        vec![
            Schema::define_in(
                "healthcare",
                "Patient",
                vec![
                    Field::string("id"),
                    Field::string("name").with_default(DefaultValue::Str(String::new())),
                    Field::references(
                        "diagnoses",
                        ReferenceSpec::outgoing("DiagnosisReference", "has_diagnosis")
                            .with_attribute("date", AttrType::Str),
                    ),
                ],
            )
            .unwrap(),
            Schema::define_in(
                "healthcare",
                "Diagnosis",
                vec![
                    Field::string("id"),
                    Field::string("code").with_default(DefaultValue::Str(String::new())),
                    Field::references(
                        "patients",
                        ReferenceSpec::incoming("PatientReference", "has_diagnosis"),
                    ),
                ],
            )
            .unwrap(),
        ]
    }

    fn graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_node(Node::new("p1", "Patient").with_attr("name", "John Doe"))
            .unwrap();
        g.add_node(Node::new("d1", "Diagnosis").with_attr("code", "E11.9"))
            .unwrap();
        g.add_edge(Edge::new("p1", "d1", "has_diagnosis").with_attr("date", "2023-10-12"))
            .unwrap();
        g
    }

    fn decode_faithfully(
        g: &MemoryGraph,
        schemas: &[Schema],
    ) -> BTreeMap<String, Vec<Record>> {
        let mut decoded = BTreeMap::new();
        for schema in schemas {
            let records: Vec<Record> = g
                .nodes_of_type(schema.name())
                .map(|n| materialize(g, n, schema).unwrap())
                .collect();
            decoded.insert(schema.name().to_string(), records);
        }
        decoded
    }

    #[test]
    fn test_faithful_streams_are_consistent() {
        let g = graph();
        let schemas = schemas();
        let decoded = decode_faithfully(&g, &schemas);

        let report = verify(&g, &schemas, &decoded);
        assert!(report.is_consistent(), "{report}: {:?}", report.violations());
        assert_eq!(report.records_checked(), 2);
        assert_eq!(report.references_checked(), 2);
    }

    #[test]
    fn test_missing_record_reported() {
        let g = graph();
        let schemas = schemas();
        let mut decoded = decode_faithfully(&g, &schemas);
        decoded.get_mut("Diagnosis").unwrap().clear();

        let report = verify(&g, &schemas, &decoded);
        assert!(report.violations().iter().any(|v| matches!(
            v,
            ConsistencyError::MissingRecord { entity_type, node }
                if entity_type == "Diagnosis" && node == "d1"
        )));
        // The forward entry on p1 now also lacks its reverse listing.
        assert!(report.violations().iter().any(|v| matches!(
            v,
            ConsistencyError::MissingBackReference { target, src: source, .. }
                if target == "d1" && source == "p1"
        )));
    }

    #[test]
    fn test_dropped_back_reference_reported() {
        let g = graph();
        let schemas = schemas();
        let mut decoded = decode_faithfully(&g, &schemas);

        let stripped = Record::new(
            decoded["Diagnosis"][0]
                .fields()
                .map(|(n, v)| {
                    let v = if n == "patients" {
                        FieldValue::References(Vec::new())
                    } else {
                        v.clone()
                    };
                    (n.to_string(), v)
                })
                .collect(),
        );
        decoded.insert("Diagnosis".to_string(), vec![stripped]);

        let report = verify(&g, &schemas, &decoded);
        assert!(!report.is_consistent());
        // Reported both by the multiset diff and the pairing check.
        assert!(report.violations().iter().any(|v| matches!(
            v,
            ConsistencyError::MissingBackReference { target, src: source, .. }
                if target == "d1" && source == "p1"
        )));
    }

    #[test]
    fn test_phantom_forward_reference_reported() {
        let g = graph();
        let schemas = schemas();
        let mut decoded = decode_faithfully(&g, &schemas);

        let padded = Record::new(
            decoded["Patient"][0]
                .fields()
                .map(|(n, v)| {
                    let v = if n == "diagnoses" {
                        let mut refs = v.as_references().unwrap().to_vec();
                        refs.push(Reference::to("ghost").with_attr("date", "unknown"));
                        FieldValue::References(refs)
                    } else {
                        v.clone()
                    };
                    (n.to_string(), v)
                })
                .collect(),
        );
        decoded.insert("Patient".to_string(), vec![padded]);

        let report = verify(&g, &schemas, &decoded);
        assert!(report.violations().iter().any(|v| matches!(
            v,
            ConsistencyError::UnexpectedForwardReference { target, .. } if target == "ghost"
        )));
        assert!(report.violations().iter().any(|v| matches!(
            v,
            ConsistencyError::MissingTarget { target, .. } if target == "ghost"
        )));
    }
}
