//! Typed array and scalar entries held by a container.
//!
//! `ndarray` arrays use layouts and strides that cannot be written directly.
//! [`StoredArray`] is the portable representation: a shape plus row-major
//! data in one of the supported element types.

use std::fmt;

use ndarray::{Array, ArrayD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Element type of a stored array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
    I64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I64 => write!(f, "i64"),
        }
    }
}

/// Row-major element buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
            ArrayData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::F32(_) => DType::F32,
            ArrayData::F64(_) => DType::F64,
            ArrayData::I64(_) => DType::I64,
        }
    }
}

/// N-dimensional array in portable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl StoredArray {
    /// Create an array, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let array = Self { shape, data };
        array.validate()?;
        Ok(array)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether any element is NaN. Integer arrays never are.
    pub fn has_nan(&self) -> bool {
        match &self.data {
            ArrayData::F32(v) => v.iter().any(|x| x.is_nan()),
            ArrayData::F64(v) => v.iter().any(|x| x.is_nan()),
            ArrayData::I64(_) => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn unchecked(shape: Vec<usize>, data: ArrayData) -> Self {
        Self { shape, data }
    }

    /// Shape and element count agree.
    pub(crate) fn validate(&self) -> Result<()> {
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                StoreError::Format(format!("array shape {:?} overflows", self.shape))
            })?;
        if expected != self.data.len() {
            return Err(StoreError::Format(format!(
                "array of shape {:?} holds {} elements, expected {}",
                self.shape,
                self.data.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Coerce to 32-bit float.
    pub fn to_f32(&self) -> Result<ArrayD<f32>> {
        let values: Vec<f32> = match &self.data {
            ArrayData::F32(v) => v.clone(),
            ArrayData::F64(v) => v.iter().map(|&x| x as f32).collect(),
            ArrayData::I64(v) => v.iter().map(|&x| x as f32).collect(),
        };
        self.shaped(values)
    }

    /// Coerce to 64-bit float.
    pub fn to_f64(&self) -> Result<ArrayD<f64>> {
        let values: Vec<f64> = match &self.data {
            ArrayData::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::F64(v) => v.clone(),
            ArrayData::I64(v) => v.iter().map(|&x| x as f64).collect(),
        };
        self.shaped(values)
    }

    /// Coerce to 64-bit integer.
    ///
    /// Float arrays are accepted only when every element is finite and
    /// integral.
    pub fn to_i64(&self) -> Result<ArrayD<i64>> {
        let values: Vec<i64> = match &self.data {
            ArrayData::I64(v) => v.clone(),
            ArrayData::F32(v) => v
                .iter()
                .map(|&x| integral(f64::from(x)))
                .collect::<Result<_>>()?,
            ArrayData::F64(v) => v.iter().map(|&x| integral(x)).collect::<Result<_>>()?,
        };
        self.shaped(values)
    }

    fn shaped<T>(&self, values: Vec<T>) -> Result<ArrayD<T>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), values)
            .map_err(|e| StoreError::Format(format!("cannot shape array as {:?}: {e}", self.shape)))
    }
}

fn integral(x: f64) -> Result<i64> {
    if !x.is_finite() || x.fract() != 0.0 {
        return Err(StoreError::Validation(format!("value {x} is not an integer")));
    }
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if x < i64::MIN as f64 || x >= i64::MAX as f64 {
        return Err(StoreError::Validation(format!(
            "value {x} is outside the 64-bit integer range"
        )));
    }
    Ok(x as i64)
}

impl<D: Dimension> From<Array<f32, D>> for StoredArray {
    fn from(array: Array<f32, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: ArrayData::F32(array.iter().copied().collect()),
        }
    }
}

impl<D: Dimension> From<Array<f64, D>> for StoredArray {
    fn from(array: Array<f64, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: ArrayData::F64(array.iter().copied().collect()),
        }
    }
}

impl<D: Dimension> From<Array<i64, D>> for StoredArray {
    fn from(array: Array<i64, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: ArrayData::I64(array.iter().copied().collect()),
        }
    }
}

impl From<Vec<f32>> for StoredArray {
    fn from(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::F32(values),
        }
    }
}

impl From<Vec<f64>> for StoredArray {
    fn from(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::F64(values),
        }
    }
}

impl From<Vec<i64>> for StoredArray {
    fn from(values: Vec<i64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::I64(values),
        }
    }
}

/// Scalar metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Text(_) => None,
        }
    }

}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Text(v)
    }
}
