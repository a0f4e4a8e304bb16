//! Output manifest.
//!
//! One entry per collection, keyed by collection id: the collection's input
//! fields plus the two folder CIDs. Entries appear in input order. A repeated
//! id replaces the earlier entry in its original position.
//!
//! ```json
//! {
//!   "1": {
//!     "nft_collection_id": 1,
//!     "nft_collection_name": "Sunsets",
//!     "name": "Sunset",
//!     "symbol": "SUN",
//!     "image_name": "sunset.png",
//!     "num_copies": 10,
//!     "ipfs_node_rpc_api": "/ip4/127.0.0.1/tcp/5001",
//!     "imageFolderCID": "Qm…",
//!     "metadataFolderCID": "Qm…"
//!   }
//! }
//! ```

use crate::collections::CollectionSpec;
use crate::storage::Cid;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "Mismatched inputs: {collections} collections, {images} image CIDs, {metadata} metadata CIDs"
    )]
    LengthMismatch {
        collections: usize,
        images: usize,
        metadata: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub collection: CollectionSpec,
    #[serde(rename = "imageFolderCID")]
    pub image_folder_cid: Cid,
    #[serde(rename = "metadataFolderCID")]
    pub metadata_folder_cid: Cid,
}

/// Collection id → entry, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<(String, ManifestEntry)>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under `key`, replacing any entry already stored there.
    pub fn insert(&mut self, key: String, entry: ManifestEntry) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((key, entry)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().map(|(_, e)| e)
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// Pair each collection with its CIDs by position.
pub fn build_manifest(
    collections: &[CollectionSpec],
    image_cids: &[Cid],
    metadata_cids: &[Cid],
) -> Result<Manifest, ManifestError> {
    if collections.len() != image_cids.len() || collections.len() != metadata_cids.len() {
        return Err(ManifestError::LengthMismatch {
            collections: collections.len(),
            images: image_cids.len(),
            metadata: metadata_cids.len(),
        });
    }

    let mut manifest = Manifest::new();
    for ((spec, image), metadata) in collections.iter().zip(image_cids).zip(metadata_cids) {
        manifest.insert(
            spec.collection_id.to_string(),
            ManifestEntry {
                collection: spec.clone(),
                image_folder_cid: image.clone(),
                metadata_folder_cid: metadata.clone(),
            },
        );
    }
    Ok(manifest)
}

/// Write the manifest as pretty-printed JSON, creating parent directories.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json)?;
    Ok(())
}
