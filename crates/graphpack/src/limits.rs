//! Format constants and decode limits.
//!
//! The decoder is expected to handle untrusted files; every allocation
//! it makes is bounded by one of the limits below.

/// Magic bytes at the start of every container file.
pub const MAGIC: &[u8; 4] = b"GPK1";

/// Current container format version.
pub const FORMAT_VERSION: u8 = 1;

/// Oldest format version this crate can read.
pub const MIN_FORMAT_VERSION: u8 = 1;

/// Length of the per-file sync marker, in bytes.
pub const SYNC_MARKER_LEN: usize = 16;

/// Length of the per-block checksum (truncated SHA-256), in bytes.
pub const BLOCK_CHECKSUM_LEN: usize = 8;

/// Records buffered per data block before the writer flushes.
pub const BLOCK_RECORDS: usize = 64;

/// Maximum encoded length of a varint.
pub const MAX_VARINT_BYTES: usize = 10;

// Wire tags for field values. Reference entry attributes reuse the
// primitive tags.
pub const TAG_STRING: u8 = 1;
pub const TAG_INT: u8 = 2;
pub const TAG_BOOL: u8 = 3;
pub const TAG_REFERENCES: u8 = 4;

/// Maximum length of any single string value, in bytes.
pub const MAX_STRING_LEN: usize = 1 << 20;

/// Maximum size of the embedded schema document, in bytes.
pub const MAX_SCHEMA_JSON: usize = 1 << 20;

/// Maximum record count declared by one block.
pub const MAX_RECORDS_PER_BLOCK: usize = 1 << 20;

/// Maximum uncompressed or compressed payload of one block, in bytes.
pub const MAX_BLOCK_PAYLOAD: usize = 64 << 20;

/// Maximum reference entries in one reference list.
pub const MAX_REFERENCES_PER_FIELD: usize = 1 << 20;

/// Maximum fields in one schema.
pub const MAX_FIELDS_PER_SCHEMA: usize = 1024;

/// Maximum declared edge attributes on one reference field.
pub const MAX_EDGE_ATTRIBUTES: usize = 64;
