//! In-memory container and whole-file load/save.
//!
//! A container is opened, fully read or written, and closed before control
//! returns. Saving always replaces the destination; there are no merge or
//! append semantics.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ndarray::ArrayD;
use tracing::info;

use crate::array::{ScalarValue, StoredArray};
use crate::error::{Result, StoreError};
use crate::format::{self, ContainerFile, Entry, DEFAULT_COMPRESSION_LEVEL, FORMAT_VERSION};

/// Options for [`Container::save_with`].
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// zstd compression level.
    pub compression_level: i32,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Named arrays, scalar metadata and string attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    entries: IndexMap<String, Entry>,
    attrs: IndexMap<String, String>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a named array.
    pub fn with_array(mut self, key: impl Into<String>, array: impl Into<StoredArray>) -> Self {
        self.insert_array(key, array);
        self
    }

    /// Builder method: add a scalar metadata entry.
    pub fn with_scalar(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.entries.insert(key.into(), Entry::Scalar(value.into()));
        self
    }

    /// Builder method: add a file-level attribute, stored as its `Display` text.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.attrs.insert(key.into(), value.to_string());
        self
    }

    /// Add or replace a named array on a container under construction.
    pub fn insert_array(&mut self, key: impl Into<String>, array: impl Into<StoredArray>) {
        self.entries.insert(key.into(), Entry::Array(array.into()));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Array entries in insertion order.
    pub fn arrays(&self) -> impl Iterator<Item = (&str, &StoredArray)> {
        self.entries.iter().filter_map(|(k, e)| match e {
            Entry::Array(a) => Some((k.as_str(), a)),
            Entry::Scalar(_) => None,
        })
    }

    /// Scalar metadata entries in insertion order.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.entries.iter().filter_map(|(k, e)| match e {
            Entry::Scalar(s) => Some((k.as_str(), s)),
            Entry::Array(_) => None,
        })
    }

    pub fn attrs(&self) -> &IndexMap<String, String> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn array(&self, key: &str) -> Option<&StoredArray> {
        match self.entries.get(key) {
            Some(Entry::Array(a)) => Some(a),
            _ => None,
        }
    }

    pub fn scalar(&self, key: &str) -> Option<&ScalarValue> {
        match self.entries.get(key) {
            Some(Entry::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    fn require_array(&self, key: &str) -> Result<&StoredArray> {
        self.array(key)
            .ok_or_else(|| StoreError::EntryNotFound(key.to_string()))
    }

    /// Named array coerced to 32-bit float.
    pub fn array_f32(&self, key: &str) -> Result<ArrayD<f32>> {
        self.require_array(key)?.to_f32()
    }

    /// Named array coerced to 64-bit float.
    pub fn array_f64(&self, key: &str) -> Result<ArrayD<f64>> {
        self.require_array(key)?.to_f64()
    }

    /// Named array coerced to 64-bit integer.
    pub fn array_i64(&self, key: &str) -> Result<ArrayD<i64>> {
        self.require_array(key)?.to_i64()
    }

    /// Fail with every key in `keys` that is absent.
    pub fn require_keys(&self, keys: &[&str]) -> Result<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| !self.entries.contains_key(**k))
            .map(|k| k.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::MissingKeys(missing))
        }
    }

    /// Fail on the first array holding a NaN.
    pub fn check_finite(&self) -> Result<()> {
        for (key, array) in self.arrays() {
            if array.has_nan() {
                return Err(StoreError::Validation(format!(
                    "array '{key}' contains NaN values"
                )));
            }
        }
        Ok(())
    }

    /// Human-readable listing of contents.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Contents:");
        for (key, array) in self.arrays() {
            let _ = writeln!(out, "\t{key}, dtype: {}, shape: {:?}", array.dtype(), array.shape());
        }
        let _ = writeln!(out, "Metadata:");
        for (key, value) in self.scalars() {
            let _ = writeln!(out, "\t{key}: {value}");
        }
        let _ = writeln!(out, "Attributes:");
        for (key, value) in &self.attrs {
            let _ = writeln!(out, "\t'{key}': {value}");
        }
        out
    }

    /// Save with default options.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_with(path, SaveOptions::default())
    }

    /// Write the container to `path`, replacing any existing file.
    ///
    /// The bytes go to a sibling temporary file first and are renamed into
    /// place, so a failed save never leaves a truncated container behind.
    pub fn save_with(&self, path: impl AsRef<Path>, options: SaveOptions) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let file = ContainerFile {
            version: FORMAT_VERSION,
            entries: self.entries.clone(),
            attrs: self.attrs.clone(),
        };
        let bytes = format::encode(&file, options.compression_level)?;

        let tmp = temp_path(path);
        if let Err(e) = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(path, e));
        }

        info!(
            path = %path.display(),
            entries = self.entries.len(),
            attrs = self.attrs.len(),
            bytes = bytes.len(),
            "container saved"
        );
        self.log_contents();
        Ok(())
    }

    /// Read a whole container from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let file = format::decode(&bytes)?;

        let container = Self {
            entries: file.entries,
            attrs: file.attrs,
        };

        info!(
            path = %path.display(),
            entries = container.entries.len(),
            attrs = container.attrs.len(),
            "container loaded"
        );
        container.log_contents();
        Ok(container)
    }

    fn log_contents(&self) {
        info!(summary = %self.summary(), "container contents");
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Save float arrays plus stringified attributes to `path`.
pub fn save<V: fmt::Display>(
    path: impl AsRef<Path>,
    data: &IndexMap<String, ArrayD<f32>>,
    attrs: &IndexMap<String, V>,
) -> Result<()> {
    let mut container = Container::new();
    for (key, array) in data {
        container.insert_array(key.clone(), array.clone());
    }
    for (key, value) in attrs {
        container = container.with_attr(key.clone(), value);
    }
    container.save(path)
}

/// Load a container without key or value checks.
pub fn load(path: impl AsRef<Path>) -> Result<Container> {
    Container::load(path)
}
