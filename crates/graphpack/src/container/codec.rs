//! Block compression codecs.
//!
//! The codec is chosen per container at open time and recorded in the
//! header; blocks are compressed as a unit.

use std::io::{self, Read, Write};

use sha2::{Digest, Sha256};

use crate::error::FormatError;
use crate::limits::{BLOCK_CHECKSUM_LEN, MAX_BLOCK_PAYLOAD};

/// Block-level compression choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Codec {
    /// No compression.
    #[default]
    Null = 0,
    /// DEFLATE (raw, no zlib wrapper).
    Deflate = 1,
    /// Zstandard.
    Zstd = 2,
}

impl Codec {
    /// Creates a Codec from its wire tag.
    pub fn from_tag(v: u8) -> Option<Codec> {
        match v {
            0 => Some(Codec::Null),
            1 => Some(Codec::Deflate),
            2 => Some(Codec::Zstd),
            _ => None,
        }
    }

    /// Returns the wire tag for this codec.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the codec's display name.
    pub fn name(self) -> &'static str {
        match self {
            Codec::Null => "null",
            Codec::Deflate => "deflate",
            Codec::Zstd => "zstd",
        }
    }

    /// Compresses one block payload.
    pub fn compress(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Codec::Null => Ok(data.to_vec()),
            Codec::Deflate => {
                let mut encoder =
                    flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Codec::Zstd => zstd::encode_all(data, 0),
        }
    }

    /// Decompresses one block payload, verifying the declared
    /// uncompressed size.
    pub fn decompress(self, data: &[u8], declared: usize) -> Result<Vec<u8>, FormatError> {
        if declared > MAX_BLOCK_PAYLOAD {
            return Err(FormatError::LengthExceedsLimit {
                field: "block payload",
                len: declared,
                max: MAX_BLOCK_PAYLOAD,
            });
        }

        let out = match self {
            Codec::Null => data.to_vec(),
            Codec::Deflate => {
                let mut decoder = flate2::read::DeflateDecoder::new(data);
                let mut out = Vec::with_capacity(declared);
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| FormatError::Decompression(e.to_string()))?;
                out
            }
            Codec::Zstd => {
                let mut decoder = zstd::Decoder::new(data)
                    .map_err(|e| FormatError::Decompression(e.to_string()))?;
                let mut out = Vec::with_capacity(declared);
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| FormatError::Decompression(e.to_string()))?;
                out
            }
        };

        if out.len() != declared {
            return Err(FormatError::UncompressedSizeMismatch {
                declared,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

/// Computes the integrity checksum of one uncompressed block payload:
/// the first 8 bytes of its SHA-256 digest.
pub(crate) fn block_checksum(data: &[u8]) -> [u8; BLOCK_CHECKSUM_LEN] {
    let digest = Sha256::digest(data);
    let mut checksum = [0u8; BLOCK_CHECKSUM_LEN];
    checksum.copy_from_slice(&digest[..BLOCK_CHECKSUM_LEN]);
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for codec in [Codec::Null, Codec::Deflate, Codec::Zstd] {
            assert_eq!(Codec::from_tag(codec.tag()), Some(codec));
        }
        assert_eq!(Codec::from_tag(9), None);
    }

    #[test]
    fn test_compress_roundtrip() {
        let data = b"a moderately repetitive payload payload payload payload".repeat(20);
        for codec in [Codec::Null, Codec::Deflate, Codec::Zstd] {
            let compressed = codec.compress(&data).unwrap();
            let restored = codec.decompress(&compressed, data.len()).unwrap();
            assert_eq!(restored, data, "failed for {}", codec.name());
        }
    }

    #[test]
    fn test_compression_shrinks_repetitive_data() {
        let data = vec![0u8; 4096];
        for codec in [Codec::Deflate, Codec::Zstd] {
            let compressed = codec.compress(&data).unwrap();
            assert!(compressed.len() < data.len(), "failed for {}", codec.name());
        }
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let data = b"payload";
        let compressed = Codec::Deflate.compress(data).unwrap();
        let err = Codec::Deflate.decompress(&compressed, data.len() + 1).unwrap_err();
        assert!(matches!(err, FormatError::UncompressedSizeMismatch { .. }));
    }

    #[test]
    fn test_declared_size_bounded() {
        let err = Codec::Null.decompress(b"x", MAX_BLOCK_PAYLOAD + 1).unwrap_err();
        assert!(matches!(err, FormatError::LengthExceedsLimit { .. }));
    }

    #[test]
    fn test_garbage_decompression_fails() {
        let garbage = [0xFFu8; 32];
        assert!(Codec::Zstd.decompress(&garbage, 10).is_err());
    }

    #[test]
    fn test_block_checksum_is_stable() {
        let a = block_checksum(b"block");
        let b = block_checksum(b"block");
        assert_eq!(a, b);
        assert_ne!(a, block_checksum(b"other"));
    }
}
