//! Serialization of the generated documents to JSON or YAML.
//!
//! Every document type of the crate (`ApiDocument`, `OpenApiDocument`, the symbol dump) keeps its
//! keys in insertion order, so the same input always serializes to the same bytes.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use press_apidoc::serializer::serialize_yaml;
/// use press_apidoc::synthesizer::ApiDocument;
///
/// let yaml = serialize_yaml(&ApiDocument::default()).unwrap();
/// assert_eq!(yaml.trim(), "{}");
/// ```
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Serializes a document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use press_apidoc::serializer::serialize_json;
/// use press_apidoc::synthesizer::ApiDocument;
///
/// let json = serialize_json(&ApiDocument::default()).unwrap();
/// assert_eq!(json, "{}");
/// ```
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Writes string content to a file.
///
/// Creates the file and any missing parent directories, or overwrites the file if it exists.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
