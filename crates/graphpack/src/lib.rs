//! graphpack: schema-validated binary record containers for typed
//! property graphs.
//!
//! This crate converts a typed property graph (nodes and directed,
//! attributed edges) into self-describing binary record containers and
//! back, preserving relationship integrity in both directions.
//!
//! # Overview
//!
//! Each entity type is described by a [`Schema`]: an ordered record of
//! primitive fields plus reference lists bound to relationships. The
//! conversion pass walks a caller-owned, read-only [`GraphSource`] and,
//! for each node, denormalizes its live edges into static reference
//! lists inside one [`Record`]. Records are persisted per entity type
//! in a container file that embeds its schema, so no external schema is
//! needed to decode it.
//!
//! # Quick Start
//!
//! ```rust
//! use graphpack::{
//!     materialize, AttrType, Edge, Field, FieldValue, MemoryGraph, Node, ReferenceSpec, Schema,
//! };
//!
//! // A small clinical graph
//! let mut graph = MemoryGraph::new();
//! graph
//!     .add_node(Node::new("patient-1", "Patient")
//!         .with_attr("name", "John Doe")
//!         .with_attr("age", 45i64))
//!     .unwrap();
//! graph
//!     .add_node(Node::new("diagnosis-1", "Diagnosis").with_attr("code", "E11.9"))
//!     .unwrap();
//! graph
//!     .add_edge(Edge::new("patient-1", "diagnosis-1", "has_diagnosis")
//!         .with_attr("date", "2023-10-12"))
//!     .unwrap();
//!
//! // The Patient entity type as a record schema
//! let schema = Schema::define_in(
//!     "healthcare",
//!     "Patient",
//!     vec![
//!         Field::string("id"),
//!         Field::string("name"),
//!         Field::int("age"),
//!         Field::references(
//!             "diagnoses",
//!             ReferenceSpec::outgoing("DiagnosisReference", "has_diagnosis")
//!                 .with_attribute("date", AttrType::Str),
//!         ),
//!     ],
//! )
//! .unwrap();
//!
//! // One record per node, edges denormalized into reference lists
//! let node = graph.node("patient-1").unwrap();
//! let record = materialize(&graph, node, &schema).unwrap();
//! assert_eq!(record.id(), Some("patient-1"));
//! let refs = record.get("diagnoses").and_then(FieldValue::as_references).unwrap();
//! assert_eq!(refs[0].target, "diagnosis-1");
//! ```
//!
//! Whole-graph conversion goes through [`convert`], which writes one
//! container per entity type and returns the type-to-path map;
//! [`read_container`] reads one back. [`verify`] replays decoded
//! streams against the original graph and collects every relationship
//! mismatch instead of failing fast.
//!
//! # Modules
//!
//! - [`schema`]: Record types, field types, JSON schema documents
//! - [`graph`]: Read-only graph view and the in-memory graph
//! - [`record`]: Materialized records and reference lists
//! - [`materialize`]: Node-to-record conversion
//! - [`container`]: Binary container writer/reader with compression
//! - [`convert`]: Whole-graph conversion entry points
//! - [`verify`]: Round-trip consistency checking
//! - [`error`]: Error types
//! - [`limits`]: Format constants and decode limits
//!
//! # Wire Format
//!
//! A container starts with a header (`GPK1` magic, format version,
//! codec tag, a random 16-byte sync marker, the schema's JSON document)
//! followed by data blocks. Each block repeats the sync marker, then
//! carries a record count, the optionally-compressed record bytes, and
//! a truncated SHA-256 checksum; a zero-count block is the trailer. A
//! reader that finds a corrupt block scans forward to the next sync
//! marker and continues, so one bad block does not take down the file.
//!
//! # Ordering
//!
//! Reference entry order follows edge traversal order, which is stable
//! within one traversal only. Compare reference lists as sets or
//! multisets, the way [`references_equal_unordered`] and the verifier
//! do, never as sequences.

pub mod container;
pub mod convert;
pub mod error;
pub mod graph;
pub mod limits;
pub mod materialize;
pub mod record;
pub mod schema;
pub mod verify;

// Re-export commonly used types at crate root
pub use container::{Codec, ContainerReader, ContainerWriter, Records};
pub use convert::{convert, load_schema_documents, read_container, write_schema_documents};
pub use error::{
    ConsistencyError, ContainerError, ConvertError, FormatError, GraphError, SchemaError,
    ValidationError,
};
pub use graph::{AttrValue, Edge, GraphSource, MemoryGraph, Node};
pub use materialize::materialize;
pub use record::{references_equal_unordered, FieldValue, Record, Reference};
pub use schema::{
    AttrType, DefaultValue, Direction, EdgeAttr, Field, FieldType, ReferenceSpec, Schema,
};
pub use verify::{verify, ConsistencyReport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
