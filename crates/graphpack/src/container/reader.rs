//! Container reader: validates the header, then decodes synchronized
//! record blocks.
//!
//! Every yielded record is structurally conformant to the embedded
//! schema. A block whose sync marker or checksum fails is skipped with
//! a warning and decoding resumes at the next marker; a structural
//! mismatch inside a verified block surfaces as a `ValidationError` for
//! that block before decoding resumes. When no further marker exists,
//! decoding ends with `TruncatedFile` after all complete blocks were
//! yielded.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::container::codec::{Codec, block_checksum};
use crate::container::primitives::Reader;
use crate::error::{ContainerError, FormatError, ValidationError};
use crate::limits::{
    BLOCK_CHECKSUM_LEN, FORMAT_VERSION, MAGIC, MAX_BLOCK_PAYLOAD, MAX_RECORDS_PER_BLOCK,
    MAX_REFERENCES_PER_FIELD, MAX_SCHEMA_JSON, MAX_STRING_LEN, MIN_FORMAT_VERSION,
    SYNC_MARKER_LEN, TAG_BOOL, TAG_INT, TAG_REFERENCES, TAG_STRING,
};
use crate::graph::AttrValue;
use crate::record::{FieldValue, Record, Reference};
use crate::schema::{AttrType, FieldType, ReferenceSpec, Schema};

/// Reads records of one schema out of one container file.
#[derive(Debug)]
pub struct ContainerReader {
    path: PathBuf,
    data: Vec<u8>,
    schema: Schema,
    codec: Codec,
    sync_marker: [u8; SYNC_MARKER_LEN],
    /// Scan position: start of the next block's sync marker.
    pos: usize,
    done: bool,
}

impl ContainerReader {
    /// Opens a container and validates its header.
    ///
    /// The schema embedded in the file is parsed here, so the file is
    /// self-describing: no external schema is needed to decode it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let data = fs::read(&path)?;

        let mut reader = Reader::new(&data);
        let magic = reader.read_bytes(4, "magic")?;
        if magic != MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            return Err(FormatError::InvalidMagic { found }.into());
        }
        let version = reader.read_byte("version")?;
        if !(MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) {
            return Err(FormatError::UnsupportedVersion { version }.into());
        }
        let codec_tag = reader.read_byte("codec")?;
        let codec =
            Codec::from_tag(codec_tag).ok_or(FormatError::UnknownCodec { codec: codec_tag })?;
        let mut sync_marker = [0u8; SYNC_MARKER_LEN];
        sync_marker.copy_from_slice(reader.read_bytes(SYNC_MARKER_LEN, "sync marker")?);
        let schema_json = reader.read_string(MAX_SCHEMA_JSON, "schema block")?;
        let schema = Schema::parse(&schema_json)?;

        debug!(
            path = %path.display(),
            schema = schema.name(),
            codec = codec.name(),
            "opened container for reading"
        );

        let pos = reader.position();
        Ok(Self {
            path,
            data,
            schema,
            codec,
            sync_marker,
            pos,
            done: false,
        })
    }

    /// The schema stored with the container.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The codec the container was written with.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the lazy record stream: a finite, single forward pass.
    /// It is not restartable; reopen the container to read again.
    pub fn records(&mut self) -> Records<'_> {
        Records {
            reader: self,
            pending: Vec::new().into_iter(),
        }
    }

    /// Reads all remaining records eagerly, stopping at the first error.
    pub fn read_all(&mut self) -> Result<Vec<Record>, ContainerError> {
        self.records().collect()
    }

    /// Moves the scan position to the next sync marker at or past
    /// `from`. When none exists the file cannot be resumed.
    fn resync(&mut self, from: usize) -> bool {
        let found = Reader::new(&self.data).find_marker(&self.sync_marker, from);
        match found {
            Some(pos) => {
                self.pos = pos;
                true
            }
            None => {
                self.done = true;
                false
            }
        }
    }

    fn next_block(&mut self) -> NextBlock {
        loop {
            if self.done {
                return NextBlock::End;
            }
            let start = self.pos;
            if start >= self.data.len() {
                // EOF without the trailing marker
                self.done = true;
                return NextBlock::Err(FormatError::TruncatedFile.into());
            }

            if self.data.len() - start < SYNC_MARKER_LEN
                || self.data[start..start + SYNC_MARKER_LEN] != self.sync_marker
            {
                warn!(
                    path = %self.path.display(),
                    offset = start,
                    "sync marker mismatch, scanning for next block"
                );
                if !self.resync(start + 1) {
                    return NextBlock::Err(FormatError::TruncatedFile.into());
                }
                continue;
            }

            match read_block(&self.data, start + SYNC_MARKER_LEN, self.codec) {
                BlockOutcome::Trailer => {
                    self.done = true;
                    return NextBlock::End;
                }
                BlockOutcome::Block { count, raw, end } => {
                    // Skip-and-continue: the scan position moves past the
                    // block whether or not its records decode.
                    self.pos = end;
                    match decode_records(&raw, count, &self.schema) {
                        Ok(records) => return NextBlock::Records(records),
                        Err(err) => return NextBlock::Err(err),
                    }
                }
                BlockOutcome::Corrupt { context } => {
                    warn!(
                        path = %self.path.display(),
                        offset = start,
                        context,
                        "skipping corrupt block"
                    );
                    if !self.resync(start + SYNC_MARKER_LEN) {
                        return NextBlock::Err(FormatError::TruncatedFile.into());
                    }
                }
            }
        }
    }
}

enum NextBlock {
    Records(Vec<Record>),
    Err(ContainerError),
    End,
}

/// Lazy record stream over one container.
#[derive(Debug)]
pub struct Records<'r> {
    reader: &'r mut ContainerReader,
    pending: std::vec::IntoIter<Record>,
}

impl Iterator for Records<'_> {
    type Item = Result<Record, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                return Some(Ok(record));
            }
            match self.reader.next_block() {
                NextBlock::Records(records) => {
                    self.pending = records.into_iter();
                }
                NextBlock::Err(err) => return Some(Err(err)),
                NextBlock::End => return None,
            }
        }
    }
}

enum BlockOutcome {
    /// Count-zero block: the end-of-file trailer.
    Trailer,
    Block {
        count: usize,
        /// Decompressed, checksum-verified record bytes.
        raw: Vec<u8>,
        /// Absolute offset one past the block.
        end: usize,
    },
    Corrupt {
        context: &'static str,
    },
}

/// Reads one block envelope after an already-matched sync marker and
/// verifies its checksum.
fn read_block(data: &[u8], after_marker: usize, codec: Codec) -> BlockOutcome {
    let mut reader = Reader::new(data);
    reader.seek(after_marker);

    let corrupt = |context| BlockOutcome::Corrupt { context };

    let Ok(count) = reader.read_varint("record count") else {
        return corrupt("unreadable record count");
    };
    if count == 0 {
        return BlockOutcome::Trailer;
    }
    let count = count as usize;
    if count > MAX_RECORDS_PER_BLOCK {
        return corrupt("record count exceeds limit");
    }
    let Ok(raw_len) = reader.read_varint("uncompressed length") else {
        return corrupt("unreadable uncompressed length");
    };
    let Ok(payload) = reader.read_bytes_prefixed(MAX_BLOCK_PAYLOAD, "block payload") else {
        return corrupt("unreadable block payload");
    };
    let Ok(checksum) = reader.read_bytes(BLOCK_CHECKSUM_LEN, "block checksum") else {
        return corrupt("unreadable block checksum");
    };
    let Ok(raw) = codec.decompress(payload, raw_len as usize) else {
        return corrupt("decompression failed");
    };
    if block_checksum(&raw) != checksum {
        return corrupt("checksum mismatch");
    }

    BlockOutcome::Block {
        count,
        raw,
        end: reader.position(),
    }
}

/// Decodes the declared number of records out of verified block bytes.
fn decode_records(raw: &[u8], count: usize, schema: &Schema) -> Result<Vec<Record>, ContainerError> {
    let mut reader = Reader::new(raw);
    let mut records = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        records.push(decode_record(&mut reader, schema)?);
    }
    if !reader.is_empty() {
        return Err(FormatError::MalformedEncoding {
            context: "trailing bytes after the last record in a block",
        }
        .into());
    }
    Ok(records)
}

fn field_tag(field_type: &FieldType) -> u8 {
    match field_type {
        FieldType::Str => TAG_STRING,
        FieldType::Int => TAG_INT,
        FieldType::Bool => TAG_BOOL,
        FieldType::References(_) => TAG_REFERENCES,
    }
}

/// Maps a wrong-but-known tag to a ValidationError and an unknown tag
/// to a FormatError: a known tag means the block holds a value of the
/// wrong type, not garbage.
fn check_tag(found: u8, expected: u8, field: &str, expected_name: &'static str) -> Result<(), ContainerError> {
    if found == expected {
        return Ok(());
    }
    if (TAG_STRING..=TAG_REFERENCES).contains(&found) {
        return Err(ValidationError::TypeMismatch {
            field: field.to_string(),
            expected: expected_name,
        }
        .into());
    }
    Err(FormatError::InvalidValueTag { tag: found }.into())
}

fn decode_bool(reader: &mut Reader<'_>) -> Result<bool, ContainerError> {
    match reader.read_byte("bool value")? {
        0x00 => Ok(false),
        0x01 => Ok(true),
        value => Err(FormatError::InvalidBool { value }.into()),
    }
}

/// Decodes one record per-field in schema order, enforcing schema
/// conformance as it goes.
fn decode_record(reader: &mut Reader<'_>, schema: &Schema) -> Result<Record, ContainerError> {
    let mut values = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let tag = reader.read_byte("field tag")?;
        check_tag(tag, field_tag(&field.field_type), &field.name, field.field_type.name())?;

        let value = match &field.field_type {
            FieldType::Str => FieldValue::Str(reader.read_string(MAX_STRING_LEN, "string field")?),
            FieldType::Int => FieldValue::Int(reader.read_signed_varint("int field")?),
            FieldType::Bool => FieldValue::Bool(decode_bool(reader)?),
            FieldType::References(spec) => {
                let count = reader.read_varint("reference count")? as usize;
                if count > MAX_REFERENCES_PER_FIELD {
                    return Err(FormatError::LengthExceedsLimit {
                        field: "reference count",
                        len: count,
                        max: MAX_REFERENCES_PER_FIELD,
                    }
                    .into());
                }
                let mut entries = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    entries.push(decode_entry(reader, &field.name, spec)?);
                }
                FieldValue::References(entries)
            }
        };
        values.push((field.name.clone(), value));
    }
    Ok(Record::new(values))
}

fn decode_entry(
    reader: &mut Reader<'_>,
    field_name: &str,
    spec: &ReferenceSpec,
) -> Result<Reference, ContainerError> {
    let target = reader.read_string(MAX_STRING_LEN, "reference target")?;
    let mut attrs = Vec::with_capacity(spec.edge_attributes.len());
    for attr in &spec.edge_attributes {
        let tag = reader.read_byte("attribute tag")?;
        check_tag(tag, attr.attr_type.tag(), field_name, attr.attr_type.name())?;
        let value = match attr.attr_type {
            AttrType::Str => AttrValue::Str(reader.read_string(MAX_STRING_LEN, "attribute value")?),
            AttrType::Int => AttrValue::Int(reader.read_signed_varint("attribute value")?),
            AttrType::Bool => AttrValue::Bool(decode_bool(reader)?),
        };
        attrs.push((attr.name.clone(), value));
    }
    Ok(Reference { target, attrs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::primitives::Writer;
    use crate::container::writer::encode_record;
    use crate::schema::{DefaultValue, Field};

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

    fn sample_record() -> Record {
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
    fn test_record_codec_roundtrip() {
        let schema = patient_schema();
        let record = sample_record();

        let mut writer = Writer::new();
        encode_record(&mut writer, &record);

        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        let decoded = decode_record(&mut reader, &schema).unwrap();
        assert!(reader.is_empty());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let schema = patient_schema();
        let record = sample_record();

        let mut writer = Writer::new();
        encode_record(&mut writer, &record);
        let mut bytes = writer.into_bytes();
        // First byte is the "id" field's string tag; flip it to int.
        bytes[0] = TAG_INT;

        let mut reader = Reader::new(&bytes);
        let err = decode_record(&mut reader, &schema).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::Validation(ValidationError::TypeMismatch { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        let schema = patient_schema();
        let mut writer = Writer::new();
        encode_record(&mut writer, &sample_record());
        let mut bytes = writer.into_bytes();
        bytes[0] = 0x7F;

        let mut reader = Reader::new(&bytes);
        let err = decode_record(&mut reader, &schema).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::Format(FormatError::InvalidValueTag { tag: 0x7F })
        ));
    }

    #[test]
    fn test_decode_records_rejects_trailing_bytes() {
        let schema = patient_schema();
        let mut writer = Writer::new();
        encode_record(&mut writer, &sample_record());
        writer.write_byte(0xAA);

        let err = decode_records(writer.as_bytes(), 1, &schema).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::Format(FormatError::MalformedEncoding { .. })
        ));
    }
}
