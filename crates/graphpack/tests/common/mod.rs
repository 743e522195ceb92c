//! Shared fixtures: the clinical sample graph and its schemas.

use graphpack::{Edge, MemoryGraph, Node, Schema};

pub const PATIENT_SCHEMA_JSON: &str = r#"{
    "name": "Patient",
    "namespace": "healthcare",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "name", "type": "string", "default": ""},
        {"name": "age", "type": "int", "default": 0},
        {"name": "diagnoses", "type": {
            "type": "references",
            "name": "DiagnosisReference",
            "relationship": "has_diagnosis",
            "direction": "outgoing",
            "edge_attributes": ["date"]
        }}
    ]
}"#;

pub const DIAGNOSIS_SCHEMA_JSON: &str = r#"{
    "name": "Diagnosis",
    "namespace": "healthcare",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "code", "type": "string", "default": ""},
        {"name": "description", "type": "string", "default": ""},
        {"name": "patients", "type": {
            "type": "references",
            "name": "PatientReference",
            "relationship": "has_diagnosis",
            "direction": "incoming"
        }}
    ]
}"#;

pub fn patient_schema() -> Schema {
    Schema::parse(PATIENT_SCHEMA_JSON).unwrap()
}

pub fn diagnosis_schema() -> Schema {
    Schema::parse(DIAGNOSIS_SCHEMA_JSON).unwrap()
}

pub fn schemas() -> Vec<Schema> {
    vec![patient_schema(), diagnosis_schema()]
}

pub fn clinical_graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    g.add_node(
        Node::new("patient-1", "Patient")
            .with_attr("name", "John Doe")
            .with_attr("age", 45i64),
    )
    .unwrap();
    g.add_node(
        Node::new("patient-2", "Patient")
            .with_attr("name", "Jane Smith")
            .with_attr("age", 62i64),
    )
    .unwrap();
    g.add_node(
        Node::new("diagnosis-1", "Diagnosis")
            .with_attr("code", "E11.9")
            .with_attr("description", "Type 2 diabetes"),
    )
    .unwrap();
    g.add_node(
        Node::new("diagnosis-2", "Diagnosis")
            .with_attr("code", "I10")
            .with_attr("description", "Hypertension"),
    )
    .unwrap();
    g.add_edge(
        Edge::new("patient-1", "diagnosis-1", "has_diagnosis").with_attr("date", "2023-10-12"),
    )
    .unwrap();
    g.add_edge(
        Edge::new("patient-2", "diagnosis-1", "has_diagnosis").with_attr("date", "2022-05-30"),
    )
    .unwrap();
    g.add_edge(
        Edge::new("patient-2", "diagnosis-2", "has_diagnosis").with_attr("date", "2021-11-14"),
    )
    .unwrap();
    g
}
