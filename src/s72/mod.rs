//! s72 scene document handling.
//!
//! An s72 document is a JSON-compatible top-level array whose first element
//! is the literal string `"s72-v1"`. The remaining elements are objects with
//! a required `type` key; references between elements are indices into the
//! top-level array. [`value`] holds the semantics-free tree parser;
//! [`Document`] adds the magic check and typed element access.

pub mod value;

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{HeliosError, Result};
pub use value::Value;

/// Magic tag required as element 0 of every document.
pub const MAGIC: &str = "s72-v1";

/// A parsed scene document: the flat element array plus the directory scene
/// assets resolve against.
pub struct Document {
    elements: Vec<Value>,
    base_dir: PathBuf,
}

impl Document {
    /// Reads and parses a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| HeliosError::io(path, e))?;
        let base_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::from_text(&text, base_dir)
    }

    /// Parses a document from already-loaded text.
    pub fn from_text(text: &str, base_dir: PathBuf) -> Result<Self> {
        let root = value::parse(text)?;
        let Value::Array(elements) = root else {
            return Err(HeliosError::Parse("top level must be an array".into()));
        };
        match elements.first().and_then(Value::as_str) {
            Some(tag) if tag == MAGIC => {}
            _ => {
                return Err(HeliosError::Parse(format!(
                    "element 0 must be the string \"{MAGIC}\""
                )));
            }
        }
        Ok(Self { elements, base_dir })
    }

    /// All elements, including the magic tag at position 0.
    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    /// Element by its document index (the index space used by references).
    pub fn element(&self, index: usize) -> Result<&Value> {
        self.elements.get(index).ok_or_else(|| {
            HeliosError::AssetShape(format!(
                "reference {index} is outside the element array (len {})",
                self.elements.len()
            ))
        })
    }

    /// Directory that `src` paths resolve against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves an asset path relative to the scene file's directory.
    #[must_use]
    pub fn resolve(&self, src: &str) -> PathBuf {
        self.base_dir.join(src)
    }
}

/// Fetches a required string key from a map element.
pub fn require_str<'a>(value: &'a Value, key: &str, what: &str) -> Result<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| HeliosError::Format(format!("{what} is missing string key '{key}'")))
}

/// Fetches a required numeric key from a map element.
pub fn require_number(value: &Value, key: &str, what: &str) -> Result<f32> {
    value
        .get(key)
        .and_then(Value::as_number)
        .ok_or_else(|| HeliosError::Format(format!("{what} is missing numeric key '{key}'")))
}

/// Fetches a required array key from a map element.
pub fn require_array<'a>(value: &'a Value, key: &str, what: &str) -> Result<&'a [Value]> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| HeliosError::Format(format!("{what} is missing array key '{key}'")))
}

/// Reads an `[x, y, z]` array as a `glam::Vec3`.
pub fn number_vec3(values: &[Value], what: &str) -> Result<glam::Vec3> {
    if values.len() != 3 {
        return Err(HeliosError::Format(format!("{what} must have 3 components")));
    }
    let mut out = [0.0f32; 3];
    for (slot, v) in out.iter_mut().zip(values) {
        *slot = v
            .as_number()
            .ok_or_else(|| HeliosError::Format(format!("{what} has a non-numeric component")))?;
    }
    Ok(glam::Vec3::from_array(out))
}
