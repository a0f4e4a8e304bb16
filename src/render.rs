//! Metadata rendering.
//!
//! Each copy gets its own JSON document, produced by substituting `{key}`
//! tokens into every string leaf of the shared template:
//!
//! | Token | Value |
//! |---|---|
//! | `{name}` | the collection's `name` field |
//! | `{nft_image_folder_cid}` | root CID of the uploaded image folder |
//! | `{image_id}` | 1-based copy index |
//! | `{image_extension}` | base image extension, no dot |
//!
//! Object keys, numbers, booleans and nulls are never touched, so a rendered
//! document has exactly the template's shape. Tokens without a value are left
//! as written.

use crate::collections::CollectionSpec;
use crate::staging::{InvalidCollectionDir, StagingLayout, numbered_file_name, prepare_fresh_dir};
use crate::storage::{Cid, ContentStore, StorageError, upload_directory};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write metadata at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Metadata upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Staging(#[from] InvalidCollectionDir),
}

/// Ordered `key → value` substitutions; applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placeholders(Vec<(String, String)>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a substitution; non-string JSON values are used in their JSON
    /// text form (`2`, `true`).
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        let text = match value.into() {
            Value::String(s) => s,
            other => other.to_string(),
        };
        self.0.push((format!("{{{key}}}"), text));
        self
    }

    /// Substitutions for one copy of a collection.
    pub fn for_copy(spec: &CollectionSpec, image_folder: &Cid, index: u32, extension: &str) -> Self {
        Self::new()
            .with("name", spec.nft_name.as_str())
            .with("nft_image_folder_cid", image_folder.as_str())
            .with("image_id", index)
            .with("image_extension", extension)
    }

    /// Replace every token in `text`.
    pub fn apply(&self, text: &str) -> String {
        self.0
            .iter()
            .fold(text.to_string(), |acc, (token, value)| acc.replace(token, value))
    }
}

/// Return a copy of `template` with every string leaf substituted.
pub fn substitute(template: &Value, placeholders: &Placeholders) -> Value {
    match template {
        Value::String(s) => Value::String(placeholders.apply(s)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, placeholders)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, placeholders))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Write `1.json` … `N.json` for a collection into a fresh staging directory.
pub fn write_metadata(
    spec: &CollectionSpec,
    template: &Value,
    image_folder: &Cid,
    extension: &str,
    staging: &StagingLayout,
) -> Result<PathBuf, RenderError> {
    let dir = staging.metadata_dir(&spec.collection_id)?;
    prepare_fresh_dir(&dir).map_err(|source| RenderError::Io {
        path: dir.clone(),
        source,
    })?;

    for index in 1..=spec.copy_count {
        let placeholders = Placeholders::for_copy(spec, image_folder, index, extension);
        let rendered = substitute(template, &placeholders);
        let target = dir.join(numbered_file_name(index, "json"));
        write_document(&target, &rendered)?;
    }

    Ok(dir)
}

fn write_document(path: &Path, document: &Value) -> Result<(), RenderError> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A rendered and pinned metadata folder.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFolder {
    pub dir: PathBuf,
    pub cid: Cid,
}

/// Render a collection's metadata and upload the folder.
pub fn render_metadata(
    store: &impl ContentStore,
    spec: &CollectionSpec,
    template: &Value,
    image_folder: &Cid,
    extension: &str,
    staging: &StagingLayout,
) -> Result<MetadataFolder, RenderError> {
    let dir = write_metadata(spec, template, image_folder, extension, staging)?;
    let cid = upload_directory(store, &dir)?;
    Ok(MetadataFolder { dir, cid })
}
