//! Container writer: header, synchronized record blocks, trailer.
//!
//! One writer owns one file. Records are validated against the schema
//! before any bytes are buffered, encoded per-field in schema order,
//! and flushed in blocks of [`BLOCK_RECORDS`]. Every block is preceded
//! by the file's sync marker and followed by a truncated SHA-256
//! checksum of its uncompressed payload, so a reader can detect
//! corruption and scan forward to the next block.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::mem;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::container::codec::{Codec, block_checksum};
use crate::container::primitives::Writer;
use crate::error::{ContainerError, ValidationError};
use crate::graph::AttrValue;
use crate::limits::{
    BLOCK_RECORDS, FORMAT_VERSION, MAGIC, SYNC_MARKER_LEN, TAG_BOOL, TAG_INT, TAG_REFERENCES,
    TAG_STRING,
};
use crate::record::{FieldValue, Record, Reference};
use crate::schema::{AttrType, EdgeAttr, Field, FieldType, Schema};

/// Checks that a record's field set structurally matches the schema:
/// same field names in the same order, each value of the declared type,
/// and reference entries carrying exactly the declared edge attributes.
pub(crate) fn validate_record(record: &Record, schema: &Schema) -> Result<(), ValidationError> {
    let fields = schema.fields();
    let mut record_fields = record.fields();

    for field in fields {
        let Some((name, value)) = record_fields.next() else {
            return Err(ValidationError::MissingField {
                field: field.name.clone(),
            });
        };
        if name != field.name {
            return Err(ValidationError::FieldMismatch {
                expected: field.name.clone(),
                found: name.to_string(),
            });
        }
        validate_value(field, value)?;
    }
    if let Some((name, _)) = record_fields.next() {
        return Err(ValidationError::UnexpectedField {
            field: name.to_string(),
        });
    }
    Ok(())
}

fn validate_value(field: &Field, value: &FieldValue) -> Result<(), ValidationError> {
    match (&field.field_type, value) {
        (FieldType::Str, FieldValue::Str(_))
        | (FieldType::Int, FieldValue::Int(_))
        | (FieldType::Bool, FieldValue::Bool(_)) => Ok(()),
        (FieldType::References(spec), FieldValue::References(entries)) => {
            for entry in entries {
                validate_entry(&field.name, entry, &spec.edge_attributes)?;
            }
            Ok(())
        }
        _ => Err(ValidationError::TypeMismatch {
            field: field.name.clone(),
            expected: field.field_type.name(),
        }),
    }
}

fn validate_entry(
    field: &str,
    entry: &Reference,
    declared: &[EdgeAttr],
) -> Result<(), ValidationError> {
    if entry.attrs.len() != declared.len() {
        return Err(ValidationError::ReferenceShape {
            field: field.to_string(),
            context: "entry attribute count differs from the declared edge attributes",
        });
    }
    for ((name, value), attr) in entry.attrs.iter().zip(declared) {
        if name != &attr.name {
            return Err(ValidationError::ReferenceShape {
                field: field.to_string(),
                context: "entry attribute name differs from the declared edge attribute",
            });
        }
        let matches = matches!(
            (value, attr.attr_type),
            (AttrValue::Str(_), AttrType::Str)
                | (AttrValue::Int(_), AttrType::Int)
                | (AttrValue::Bool(_), AttrType::Bool)
        );
        if !matches {
            return Err(ValidationError::ReferenceShape {
                field: field.to_string(),
                context: "entry attribute value is not of the declared type",
            });
        }
    }
    Ok(())
}

/// Encodes one validated record per-field in schema order.
pub(crate) fn encode_record(writer: &mut Writer, record: &Record) {
    for (_, value) in record.fields() {
        match value {
            FieldValue::Str(s) => {
                writer.write_byte(TAG_STRING);
                writer.write_string(s);
            }
            FieldValue::Int(i) => {
                writer.write_byte(TAG_INT);
                writer.write_signed_varint(*i);
            }
            FieldValue::Bool(b) => {
                writer.write_byte(TAG_BOOL);
                writer.write_byte(u8::from(*b));
            }
            FieldValue::References(entries) => {
                writer.write_byte(TAG_REFERENCES);
                writer.write_varint(entries.len() as u64);
                for entry in entries {
                    writer.write_string(&entry.target);
                    for (_, attr) in &entry.attrs {
                        match attr {
                            AttrValue::Str(s) => {
                                writer.write_byte(TAG_STRING);
                                writer.write_string(s);
                            }
                            AttrValue::Int(i) => {
                                writer.write_byte(TAG_INT);
                                writer.write_signed_varint(*i);
                            }
                            AttrValue::Bool(b) => {
                                writer.write_byte(TAG_BOOL);
                                writer.write_byte(u8::from(*b));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Writes records of one schema into one container file.
///
/// The file handle is a scoped resource: it is flushed and released on
/// every exit path, including validation failures mid-write. Dropping a
/// writer without calling [`close`](ContainerWriter::close) still writes
/// the trailer for whatever was appended, best-effort.
#[derive(Debug)]
pub struct ContainerWriter {
    path: PathBuf,
    file: BufWriter<File>,
    schema: Schema,
    codec: Codec,
    sync_marker: [u8; SYNC_MARKER_LEN],
    block: Writer,
    buffered: usize,
    records_written: u64,
    finished: bool,
}

impl ContainerWriter {
    /// Creates a container file and writes its header: magic bytes,
    /// format version, codec tag, a fresh random sync marker, and the
    /// schema's canonical JSON document.
    pub fn create(
        path: impl AsRef<Path>,
        schema: &Schema,
        codec: Codec,
    ) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let sync_marker = Uuid::new_v4().into_bytes();

        let mut header = Writer::with_capacity(64);
        header.write_bytes(MAGIC);
        header.write_byte(FORMAT_VERSION);
        header.write_byte(codec.tag());
        header.write_bytes(&sync_marker);
        header.write_string(&schema.to_json());

        let mut file = BufWriter::new(file);
        file.write_all(header.as_bytes())?;

        debug!(
            path = %path.display(),
            schema = schema.name(),
            codec = codec.name(),
            "opened container for writing"
        );

        Ok(Self {
            path,
            file,
            schema: schema.clone(),
            codec,
            sync_marker,
            block: Writer::new(),
            buffered: 0,
            records_written: 0,
            finished: false,
        })
    }

    /// The schema this container holds.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Records appended so far, flushed or buffered.
    pub fn records_written(&self) -> u64 {
        self.records_written + self.buffered as u64
    }

    /// Validates and buffers one record.
    ///
    /// A record whose field set does not structurally match the schema
    /// is rejected whole; nothing is buffered for it.
    pub fn append(&mut self, record: &Record) -> Result<(), ContainerError> {
        validate_record(record, &self.schema)?;
        encode_record(&mut self.block, record);
        self.buffered += 1;
        if self.buffered >= BLOCK_RECORDS {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Flushes buffered records as one synchronized block.
    fn flush_block(&mut self) -> Result<(), ContainerError> {
        if self.buffered == 0 {
            return Ok(());
        }
        let payload = mem::take(&mut self.block).into_bytes();
        let checksum = block_checksum(&payload);
        let compressed = self.codec.compress(&payload)?;

        let mut out = Writer::with_capacity(SYNC_MARKER_LEN + 24 + compressed.len());
        out.write_bytes(&self.sync_marker);
        out.write_varint(self.buffered as u64);
        out.write_varint(payload.len() as u64);
        out.write_bytes_prefixed(&compressed);
        out.write_bytes(&checksum);
        self.file.write_all(out.as_bytes())?;

        debug!(
            path = %self.path.display(),
            records = self.buffered,
            raw = payload.len(),
            stored = compressed.len(),
            "flushed block"
        );

        self.records_written += self.buffered as u64;
        self.buffered = 0;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ContainerError> {
        if self.finished {
            return Ok(());
        }
        // Mark finished up front so a failed flush is not retried on Drop.
        self.finished = true;
        self.flush_block()?;

        let mut trailer = Writer::with_capacity(SYNC_MARKER_LEN + 1);
        trailer.write_bytes(&self.sync_marker);
        trailer.write_varint(0);
        self.file.write_all(trailer.as_bytes())?;
        self.file.flush()?;

        debug!(
            path = %self.path.display(),
            records = self.records_written,
            "closed container"
        );
        Ok(())
    }

    /// Flushes the tail block, writes the trailing marker, and releases
    /// the file.
    pub fn close(mut self) -> Result<PathBuf, ContainerError> {
        self.finish()?;
        Ok(self.path.clone())
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrType, DefaultValue, ReferenceSpec};

    fn patient_schema() -> Schema {
        Schema::define_in(
            "healthcare",
            "Patient",
            vec![
                Field::string("id"),
                Field::string("name").with_default(DefaultValue::Str(String::new())),
                Field::int("age").with_default(DefaultValue::Int(0)),
                Field::references(
                    "diagnoses",
                    ReferenceSpec::outgoing("DiagnosisReference", "has_diagnosis")
                        .with_attribute("date", AttrType::Str),
                ),
            ],
        )
        .unwrap()
    }

    fn valid_record() -> Record {
        Record::new(vec![
            ("id".into(), FieldValue::Str("patient-1".into())),
            ("name".into(), FieldValue::Str("John Doe".into())),
            ("age".into(), FieldValue::Int(45)),
            (
                "diagnoses".into(),
                FieldValue::References(vec![
                    Reference::to("diagnosis-1").with_attr("date", "2023-10-12"),
                ]),
            ),
        ])
    }

    #[test]
    fn test_validate_accepts_conformant_record() {
        assert!(validate_record(&valid_record(), &patient_schema()).is_ok());
    }

    #[test]
    fn test_validate_missing_field() {
        let record = Record::new(vec![("id".into(), FieldValue::Str("patient-1".into()))]);
        let err = validate_record(&record, &patient_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field } if field == "name"));
    }

    #[test]
    fn test_validate_type_mismatch() {
        let record = Record::new(vec![
            ("id".into(), FieldValue::Str("patient-1".into())),
            ("name".into(), FieldValue::Str("John Doe".into())),
            ("age".into(), FieldValue::Str("forty-five".into())),
            ("diagnoses".into(), FieldValue::References(Vec::new())),
        ]);
        let err = validate_record(&record, &patient_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { field, expected: "int" } if field == "age"));
    }

    #[test]
    fn test_validate_field_order() {
        let record = Record::new(vec![
            ("name".into(), FieldValue::Str("John Doe".into())),
            ("id".into(), FieldValue::Str("patient-1".into())),
            ("age".into(), FieldValue::Int(45)),
            ("diagnoses".into(), FieldValue::References(Vec::new())),
        ]);
        let err = validate_record(&record, &patient_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::FieldMismatch { .. }));
    }

    #[test]
    fn test_validate_reference_shape() {
        let record = Record::new(vec![
            ("id".into(), FieldValue::Str("patient-1".into())),
            ("name".into(), FieldValue::Str("John Doe".into())),
            ("age".into(), FieldValue::Int(45)),
            (
                "diagnoses".into(),
                // Missing the declared "date" attribute
                FieldValue::References(vec![Reference::to("diagnosis-1")]),
            ),
        ]);
        let err = validate_record(&record, &patient_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::ReferenceShape { field, .. } if field == "diagnoses"));
    }

    #[test]
    fn test_validate_unexpected_field() {
        let mut values: Vec<(String, FieldValue)> = valid_record().fields()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        values.push(("extra".into(), FieldValue::Bool(true)));
        let err = validate_record(&Record::new(values), &patient_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedField { field } if field == "extra"));
    }
}
