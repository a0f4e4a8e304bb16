//! Collection definitions and the metadata template.
//!
//! Both inputs are JSON documents read once at startup. The collection file is
//! an array of objects:
//!
//! ```json
//! [{
//!     "nft_collection_id": 1,
//!     "nft_collection_name": "Sunsets",
//!     "name": "Sunset",
//!     "symbol": "SUN",
//!     "image_name": "sunset.png",
//!     "num_copies": 10,
//!     "ipfs_node_rpc_api": "/ip4/127.0.0.1/tcp/5001"
//! }]
//! ```
//!
//! Missing fields surface as JSON decode errors; nothing else is validated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Collection identifier as written in the input: any JSON number or a
/// string. Numbers keep their written form (`-1`, `1.5`) when echoed back.
///
/// `1` and `"1"` are different ids but share the text form `"1"`, which is
/// what names the manifest entry and the staging directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionId::Number(n) => write!(f, "{n}"),
            CollectionId::Text(s) => f.write_str(s),
        }
    }
}

/// One collection to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    #[serde(rename = "nft_collection_id")]
    pub collection_id: CollectionId,
    #[serde(rename = "nft_collection_name")]
    pub collection_name: String,
    /// Per-token display name, substituted for `{name}`.
    #[serde(rename = "name")]
    pub nft_name: String,
    pub symbol: String,
    /// Base image file name, relative to the images directory.
    pub image_name: String,
    #[serde(rename = "num_copies")]
    pub copy_count: u32,
    /// Storage daemon API address; empty means the CLI default.
    #[serde(rename = "ipfs_node_rpc_api")]
    pub storage_endpoint: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CollectionsError> {
    let content = std::fs::read_to_string(path).map_err(|source| CollectionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CollectionsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the collection definitions, in file order.
pub fn load_collections(path: &Path) -> Result<Vec<CollectionSpec>, CollectionsError> {
    read_json(path)
}

/// Load the metadata template as an untyped JSON tree.
pub fn load_template(path: &Path) -> Result<serde_json::Value, CollectionsError> {
    read_json(path)
}
