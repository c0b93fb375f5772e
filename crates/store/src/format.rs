//! On-disk container format.
//!
//! ```text
//! ┌──────────────┬────────────────┬──────────────────────────────────┐
//! │ magic (8 B)  │ version (u32)  │ zstd( bincode( entries, attrs ) )│
//! └──────────────┴────────────────┴──────────────────────────────────┘
//! ```
//!
//! The version is a little-endian `u32` outside the compressed body, so an
//! unknown version is rejected before any decoding is attempted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::{ScalarValue, StoredArray};
use crate::error::{Result, StoreError};

/// Leading bytes of every container file.
pub const MAGIC: [u8; 8] = *b"COEVAL\0\0";

/// Container format version (increment on breaking changes).
pub const FORMAT_VERSION: u32 = 1;

/// Conventional file extension for containers.
pub const FILE_EXTENSION: &str = "cbx";

const HEADER_LEN: usize = MAGIC.len() + 4;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// A top-level named entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Array(StoredArray),
    Scalar(ScalarValue),
}

/// Decoded file contents.
#[derive(Debug, Clone)]
pub struct ContainerFile {
    pub version: u32,
    pub entries: IndexMap<String, Entry>,
    pub attrs: IndexMap<String, String>,
}

/// Encode a payload into file bytes.
pub fn encode(file: &ContainerFile, compression_level: i32) -> Result<Vec<u8>> {
    let serialized = bincode::serialize(&(&file.entries, &file.attrs))
        .map_err(|e| StoreError::Encode(e.to_string()))?;

    let compressed = zstd::encode_all(&serialized[..], compression_level)
        .map_err(|e| StoreError::Compression(e.to_string()))?;

    debug!(
        serialized_bytes = serialized.len(),
        compressed_bytes = compressed.len(),
        "container encoded"
    );

    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&file.version.to_le_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Decode file bytes, validating magic, version and every array's shape.
pub fn decode(bytes: &[u8]) -> Result<ContainerFile> {
    let rest = bytes
        .strip_prefix(&MAGIC[..])
        .ok_or_else(|| StoreError::Format("not a coeval container (bad magic)".to_string()))?;

    let (version, payload) = match rest.split_first_chunk::<4>() {
        Some((version, payload)) => (u32::from_le_bytes(*version), payload),
        None => return Err(StoreError::Format("truncated container header".to_string())),
    };
    if version != FORMAT_VERSION {
        return Err(StoreError::Format(format!(
            "unsupported container version {version} (expected {FORMAT_VERSION})"
        )));
    }

    let serialized = zstd::decode_all(payload)
        .map_err(|e| StoreError::Format(format!("corrupt payload: {e}")))?;

    let (entries, attrs): (IndexMap<String, Entry>, IndexMap<String, String>) =
        bincode::deserialize(&serialized)
            .map_err(|e| StoreError::Format(format!("corrupt payload: {e}")))?;
    let file = ContainerFile {
        version,
        entries,
        attrs,
    };

    for (key, entry) in &file.entries {
        if let Entry::Array(array) = entry {
            array
                .validate()
                .map_err(|e| StoreError::Format(format!("entry '{key}': {e}")))?;
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayData;

    fn sample_file() -> ContainerFile {
        let mut entries = IndexMap::new();
        entries.insert(
            "redshifts".to_string(),
            Entry::Array(StoredArray::from(vec![6.0f32, 7.0, 8.0])),
        );
        entries.insert("random_seed".to_string(), Entry::Scalar(ScalarValue::Int(42)));
        let mut attrs = IndexMap::new();
        attrs.insert("seed".to_string(), "42".to_string());
        ContainerFile {
            version: FORMAT_VERSION,
            entries,
            attrs,
        }
    }

    #[test]
    fn encoded_bytes_start_with_magic() {
        let bytes = encode(&sample_file(), DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert_eq!(&bytes[..8], &MAGIC);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.entries, sample_file().entries);
        assert_eq!(decoded.attrs.get("seed").map(String::as_str), Some("42"));
    }

    #[test]
    fn decode_rejects_foreign_bytes() {
        let err = decode(b"\x89HDF\r\n\x1a\n....").unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let mut file = sample_file();
        file.version = FORMAT_VERSION + 1;
        let bytes = encode(&file, DEFAULT_COMPRESSION_LEVEL).unwrap();
        match decode(&bytes) {
            Err(StoreError::Format(msg)) => assert!(msg.contains("version")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let err = decode(&MAGIC).unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[test]
    fn decode_rejects_corrupt_payload() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend(zstd::encode_all(&[1u8, 2, 3][..], DEFAULT_COMPRESSION_LEVEL).unwrap());
        match decode(&bytes) {
            Err(StoreError::Format(msg)) => assert!(msg.contains("corrupt payload")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_overflowing_shape() {
        let mut file = sample_file();
        file.entries.insert(
            "huge".to_string(),
            Entry::Array(StoredArray::unchecked(
                vec![1 << 40, 1 << 40],
                ArrayData::F32(Vec::new()),
            )),
        );
        let bytes = encode(&file, DEFAULT_COMPRESSION_LEVEL).unwrap();
        match decode(&bytes) {
            Err(StoreError::Format(msg)) => {
                assert!(msg.contains("huge"));
                assert!(msg.contains("overflows"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
