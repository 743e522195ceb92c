//! Conversion entry points: whole-graph conversion into one container
//! per entity type, the matching read path, and schema documents on
//! disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::container::{Codec, ContainerReader, ContainerWriter};
use crate::error::{ContainerError, ConvertError, SchemaError};
use crate::graph::GraphSource;
use crate::materialize::materialize;
use crate::record::Record;
use crate::schema::Schema;

/// File extension of container files. Conventional, not enforced.
pub const CONTAINER_EXT: &str = "gpk";

/// File suffix of schema documents on disk.
pub const SCHEMA_SUFFIX: &str = ".schema.json";

fn check_schema_set(schemas: &[Schema]) -> Result<(), SchemaError> {
    let mut seen: Vec<&str> = Vec::with_capacity(schemas.len());
    for schema in schemas {
        if seen.contains(&schema.name()) {
            return Err(SchemaError::DuplicateSchema {
                name: schema.name().to_string(),
            });
        }
        seen.push(schema.name());
    }
    Ok(())
}

fn container_path(output_dir: &Path, schema: &Schema) -> PathBuf {
    output_dir.join(format!("{}.{CONTAINER_EXT}", schema.name().to_lowercase()))
}

/// Converts a graph into one container file per entity type.
///
/// Each schema's name is the entity type tag it converts: every node
/// carrying that tag is materialized into one record and appended to
/// that type's container. The schema set is validated before any I/O.
/// Returns the entity type to container path map.
pub fn convert(
    graph: &dyn GraphSource,
    schemas: &[Schema],
    output_dir: impl AsRef<Path>,
    codec: Codec,
) -> Result<BTreeMap<String, PathBuf>, ConvertError> {
    check_schema_set(schemas)?;

    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut paths = BTreeMap::new();
    for schema in schemas {
        let path = container_path(output_dir, schema);
        let written = convert_type(graph, schema, &path, codec).map_err(|source| {
            ConvertError::Container {
                entity_type: schema.name().to_string(),
                source,
            }
        })?;
        debug!(
            entity_type = schema.name(),
            records = written,
            path = %path.display(),
            "converted entity type"
        );
        paths.insert(schema.name().to_string(), path);
    }
    Ok(paths)
}

fn convert_type(
    graph: &dyn GraphSource,
    schema: &Schema,
    path: &Path,
    codec: Codec,
) -> Result<u64, ContainerError> {
    let mut writer = ContainerWriter::create(path, schema, codec)?;
    for node in graph.nodes_of_type(schema.name()) {
        let record = materialize(graph, node, schema)?;
        writer.append(&record)?;
    }
    let written = writer.records_written();
    writer.close()?;
    Ok(written)
}

/// Opens a container and reads it to the end.
///
/// Returns the embedded schema and every record. Streaming callers
/// should use [`ContainerReader`] directly.
pub fn read_container(path: impl AsRef<Path>) -> Result<(Schema, Vec<Record>), ContainerError> {
    let mut reader = ContainerReader::open(path)?;
    let records = reader.read_all()?;
    Ok((reader.schema().clone(), records))
}

/// Writes one canonical JSON schema document per schema into `dir`.
///
/// Returns the schema name to document path map.
pub fn write_schema_documents(
    schemas: &[Schema],
    dir: impl AsRef<Path>,
) -> Result<BTreeMap<String, PathBuf>, ConvertError> {
    check_schema_set(schemas)?;
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut paths = BTreeMap::new();
    for schema in schemas {
        let path = dir.join(format!("{}{SCHEMA_SUFFIX}", schema.name().to_lowercase()));
        fs::write(&path, schema.to_json())?;
        paths.insert(schema.name().to_string(), path);
    }
    Ok(paths)
}

/// Loads every schema document (`*.schema.json`) found in `dir`,
/// sorted by schema name.
pub fn load_schema_documents(dir: impl AsRef<Path>) -> Result<Vec<Schema>, ConvertError> {
    let mut schemas = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let is_schema = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(SCHEMA_SUFFIX));
        if !is_schema {
            continue;
        }
        let json = fs::read_to_string(&path)?;
        let schema = Schema::parse(&json).map_err(|source| ConvertError::SchemaDocument {
            path: path.clone(),
            source,
        })?;
        schemas.push(schema);
    }
    schemas.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DefaultValue, Field};

    fn schema(name: &str) -> Schema {
        Schema::define(
            name,
            vec![
                Field::string("id"),
                Field::string("label").with_default(DefaultValue::Str(String::new())),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_schema_rejected_before_io() {
        let schemas = vec![schema("Patient"), schema("Patient")];
        let graph = crate::graph::MemoryGraph::new();
        // A nonsense output path: the duplicate check must fire first.
        let err = convert(&graph, &schemas, "/nonexistent/\0", Codec::Null).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Schema(SchemaError::DuplicateSchema { name }) if name == "Patient"
        ));
    }

    #[test]
    fn test_schema_documents_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let schemas = vec![schema("Patient"), schema("Diagnosis")];
        let paths = write_schema_documents(&schemas, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths["Patient"].file_name().unwrap().to_str().unwrap().starts_with("patient"));

        let loaded = load_schema_documents(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        // Sorted by name
        assert_eq!(loaded[0].name(), "Diagnosis");
        assert_eq!(loaded[1].name(), "Patient");
    }
}
