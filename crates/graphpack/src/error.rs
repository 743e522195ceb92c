//! Error types for schema handling, conversion, and container I/O.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error in a schema definition or schema document.
///
/// Schema errors are fatal and are raised before any container I/O
/// takes place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("malformed schema document: {0}")]
    Malformed(String),

    #[error("schema {schema:?} declares field {field:?} more than once")]
    DuplicateField { schema: String, field: String },

    #[error("schema {schema:?} declares nested record type {name:?} more than once")]
    DuplicateTypeName { schema: String, name: String },

    #[error("duplicate schema {name:?} in schema set")]
    DuplicateSchema { name: String },

    #[error("field {field:?} has unknown type tag {found:?}")]
    UnknownType { field: String, found: String },

    #[error("field {field:?} has unknown reference direction {found:?} (expected \"outgoing\" or \"incoming\")")]
    UnknownDirection { field: String, found: String },

    #[error("field {field:?} nests a references type inside a reference entry")]
    NestedReference { field: String },

    #[error("reference field {field:?} declares an empty relationship tag")]
    EmptyRelationship { field: String },

    #[error("reference field {field:?} declares edge attribute {attribute:?} more than once")]
    DuplicateEdgeAttribute { field: String, attribute: String },

    #[error("default for field {field:?} does not match the field's declared type")]
    DefaultTypeMismatch { field: String },

    #[error("schema {schema:?} has no {expected:?} field named \"id\"")]
    MissingIdField { schema: String, expected: &'static str },

    #[error("schema document exceeds maximum size ({len} > {max} bytes)")]
    DocumentTooLarge { len: usize, max: usize },
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Malformed(err.to_string())
    }
}

/// Error raised when a record does not structurally conform to its schema,
/// either while materializing a node, appending to a container, or
/// decoding a block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("node {node:?} is missing attribute {attribute:?} and field declares no default")]
    MissingAttribute { node: String, attribute: String },

    #[error("node {node:?} attribute {attribute:?} is not of the declared type {expected}")]
    AttributeType {
        node: String,
        attribute: String,
        expected: &'static str,
    },

    #[error("record is missing field {field:?}")]
    MissingField { field: String },

    #[error("record carries undeclared field {field:?}")]
    UnexpectedField { field: String },

    #[error("record field {found:?} does not match schema field {expected:?} at that position")]
    FieldMismatch { expected: String, found: String },

    #[error("field {field:?} is not of the declared type {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("reference entry in field {field:?} has the wrong shape: {context}")]
    ReferenceShape {
        field: String,
        context: &'static str,
    },
}

/// Error in the container's binary structure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("invalid magic bytes: expected GPK1, found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported format version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("unknown codec tag: {codec}")]
    UnknownCodec { codec: u8 },

    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("invalid value tag: {tag}")]
    InvalidValueTag { tag: u8 },

    #[error("malformed encoding: {context}")]
    MalformedEncoding { context: &'static str },

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("decompressed size {actual} doesn't match declared {declared}")]
    UncompressedSizeMismatch { declared: usize, actual: usize },

    #[error("container is truncated: no trailing marker and no further sync marker to resume from")]
    TruncatedFile,
}

/// Error while writing or reading a container file.
///
/// I/O errors propagate unchanged; the crate never retries I/O.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Error during a whole-graph conversion pass.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("conversion of entity type {entity_type:?} failed: {source}")]
    Container {
        entity_type: String,
        #[source]
        source: ContainerError,
    },

    #[error("schema document {path:?} failed to parse: {source}")]
    SchemaDocument {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

/// Error mutating an in-memory graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("node {id:?} already exists")]
    DuplicateNode { id: String },

    #[error("edge source node {id:?} does not exist")]
    UnknownSource { id: String },

    #[error("edge target node {id:?} does not exist")]
    UnknownTarget { id: String },
}

/// A single relationship-integrity violation found by the round-trip
/// verifier. Violations are collected, never fatal to the read itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("no record for node {node:?} in the {entity_type:?} stream")]
    MissingRecord { entity_type: String, node: String },

    #[error("record {src:?} field {field:?} references {target:?}, which is not a node of any converted type")]
    MissingTarget {
        src: String,
        field: String,
        target: String,
    },

    #[error("record {src:?} field {field:?} is missing a reference to {target:?} present in the graph")]
    MissingForwardReference {
        src: String,
        field: String,
        target: String,
    },

    #[error("record {src:?} field {field:?} carries a reference to {target:?} with no matching edge in the graph")]
    UnexpectedForwardReference {
        src: String,
        field: String,
        target: String,
    },

    #[error("record {target:?} field {field:?} does not list back-reference to {src:?}")]
    MissingBackReference {
        target: String,
        field: String,
        src: String,
    },

    #[error("record {node:?} field {field:?} lists back-reference to {src:?} with no matching incoming edge")]
    UnexpectedBackReference {
        node: String,
        field: String,
        src: String,
    },
}
