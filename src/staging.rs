//! Staging directory layout.
//!
//! Every generated file lives under one explicit root so runs can be isolated
//! (tests point it at a temp dir):
//!
//! ```text
//! generated/
//! ├── images/
//! │   └── <collection_id>/     # 1.png … N.png
//! └── metadata/
//!     └── <collection_id>/     # 1.json … N.json
//! ```
//!
//! Directories are never cleaned up after a run; they are emptied before
//! being filled again so an upload only ever contains the current copies.
//! A collection id must therefore name exactly one directory below
//! `images/` and `metadata/`: empty ids, `.`, `..` and ids containing a path
//! separator are refused.

use crate::collections::CollectionId;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Collection id {0:?} cannot be used as a staging directory name")]
pub struct InvalidCollectionDir(pub String);

/// Directory name for a collection id, if the id is a plain single name.
pub fn collection_dir_name(id: &CollectionId) -> Result<String, InvalidCollectionDir> {
    let name = id.to_string();
    let mut components = Path::new(&name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name),
        _ => Err(InvalidCollectionDir(name)),
    }
}

#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self, id: &CollectionId) -> Result<PathBuf, InvalidCollectionDir> {
        Ok(self.root.join("images").join(collection_dir_name(id)?))
    }

    pub fn metadata_dir(&self, id: &CollectionId) -> Result<PathBuf, InvalidCollectionDir> {
        Ok(self.root.join("metadata").join(collection_dir_name(id)?))
    }
}

/// Create `dir`, removing whatever a previous run left in it.
pub fn prepare_fresh_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

/// File name of the `index`th copy (1-based).
pub fn numbered_file_name(index: u32, extension: &str) -> String {
    format!("{index}.{extension}")
}
