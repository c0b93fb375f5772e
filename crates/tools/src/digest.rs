//! Content digests for stored arrays.

use coeval_store::{ArrayData, StoredArray};
use sha2::{Digest, Sha256};

/// SHA256 over dtype, shape and little-endian element bytes.
///
/// Two arrays share a digest only when they would load identically, so the
/// value can be compared across runs to check determinism.
pub fn array_digest(array: &StoredArray) -> String {
    let mut hasher = Sha256::new();
    hasher.update(array.dtype().to_string().as_bytes());
    hasher.update((array.shape().len() as u64).to_le_bytes());
    for &dim in array.shape() {
        hasher.update((dim as u64).to_le_bytes());
    }
    match array.data() {
        ArrayData::F32(values) => values.iter().for_each(|v| hasher.update(v.to_le_bytes())),
        ArrayData::F64(values) => values.iter().for_each(|v| hasher.update(v.to_le_bytes())),
        ArrayData::I64(values) => values.iter().for_each(|v| hasher.update(v.to_le_bytes())),
    }
    format!("{:x}", hasher.finalize())
}

/// Format a float for reports.
pub fn fmt_value(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else if v.abs() < 0.01 || v.abs() > 10000.0 {
        format!("{:.4e}", v)
    } else {
        format!("{:.4}", v)
    }
}
