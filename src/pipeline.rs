//! Pipeline driver.
//!
//! Collections are processed one at a time, in input order:
//!
//! ```text
//! for each collection:
//!     replicate base image  →  staging/images/<id>/    →  add + pin  →  image CID
//!     render metadata       →  staging/metadata/<id>/  →  add + pin  →  metadata CID
//! write manifest (only after every collection succeeded)
//! ```
//!
//! Any error stops the run. Folders already uploaded stay pinned, but no
//! manifest is written, not even for the collections that completed.

use crate::collections::{
    CollectionId, CollectionSpec, CollectionsError, load_collections, load_template,
};
use crate::manifest::{Manifest, ManifestError, build_manifest, write_manifest};
use crate::render::{RenderError, render_metadata};
use crate::replicate::{ReplicateError, replicate_image};
use crate::staging::{StagingLayout, collection_dir_name};
use crate::storage::{Cid, ContentStore, StorageError, upload_directory};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] CollectionsError),
    #[error("Collection {id}: {source}")]
    Replicate {
        id: CollectionId,
        source: ReplicateError,
    },
    #[error("Collection {id}: image upload failed: {source}")]
    ImageUpload {
        id: CollectionId,
        source: StorageError,
    },
    #[error("Collection {id}: {source}")]
    Render { id: CollectionId, source: RenderError },
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

impl PipelineError {
    /// The storage error behind this failure, if any.
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            PipelineError::ImageUpload { source, .. } => Some(source),
            PipelineError::Render {
                source: RenderError::Storage(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Whether the run stopped because a pin was rejected.
    pub fn is_pin_failure(&self) -> bool {
        matches!(self.storage_error(), Some(StorageError::Pin { .. }))
    }

    /// Process exit status for this failure: 2 for a rejected pin, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_pin_failure() {
            PIN_FAILURE_EXIT
        } else {
            FAILURE_EXIT
        }
    }
}

pub const FAILURE_EXIT: u8 = 1;
pub const PIN_FAILURE_EXIT: u8 = 2;

/// Everything a run reads, with every location explicit.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub collections: Vec<CollectionSpec>,
    pub template: Value,
    pub images_dir: PathBuf,
    pub staging: StagingLayout,
    pub manifest_path: PathBuf,
}

impl PipelineInputs {
    /// Load collections and template from disk.
    pub fn load(
        collections_path: &Path,
        template_path: &Path,
        images_dir: &Path,
        staging_root: &Path,
        manifest_path: &Path,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            collections: load_collections(collections_path)?,
            template: load_template(template_path)?,
            images_dir: images_dir.to_path_buf(),
            staging: StagingLayout::new(staging_root),
            manifest_path: manifest_path.to_path_buf(),
        })
    }
}

/// Progress notifications emitted while the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    CollectionStarted {
        position: usize,
        total: usize,
        id: CollectionId,
        name: String,
        copies: u32,
    },
    ImagesStaged {
        dir: PathBuf,
        count: u32,
    },
    ImagesUploaded {
        cid: Cid,
    },
    MetadataUploaded {
        dir: PathBuf,
        cid: Cid,
    },
    ManifestWritten {
        path: PathBuf,
        entries: usize,
    },
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

/// Run the whole pipeline.
///
/// `connect` builds the store for a collection's endpoint; `on_event` sees
/// progress as it happens.
pub fn run<S, C, F>(
    inputs: &PipelineInputs,
    connect: C,
    mut on_event: F,
) -> Result<RunSummary, PipelineError>
where
    S: ContentStore,
    C: Fn(&str) -> S,
    F: FnMut(&PipelineEvent),
{
    let total = inputs.collections.len();
    let mut image_cids = Vec::with_capacity(total);
    let mut metadata_cids = Vec::with_capacity(total);

    for (i, spec) in inputs.collections.iter().enumerate() {
        on_event(&PipelineEvent::CollectionStarted {
            position: i + 1,
            total,
            id: spec.collection_id.clone(),
            name: spec.collection_name.clone(),
            copies: spec.copy_count,
        });
        let store = connect(&spec.storage_endpoint);
        let id = || spec.collection_id.clone();

        let staged = replicate_image(spec, &inputs.images_dir, &inputs.staging)
            .map_err(|source| PipelineError::Replicate { id: id(), source })?;
        on_event(&PipelineEvent::ImagesStaged {
            dir: staged.dir.clone(),
            count: staged.count,
        });

        let image_cid = upload_directory(&store, &staged.dir)
            .map_err(|source| PipelineError::ImageUpload { id: id(), source })?;
        on_event(&PipelineEvent::ImagesUploaded {
            cid: image_cid.clone(),
        });

        let metadata = render_metadata(
            &store,
            spec,
            &inputs.template,
            &image_cid,
            &staged.extension,
            &inputs.staging,
        )
        .map_err(|source| PipelineError::Render { id: id(), source })?;
        on_event(&PipelineEvent::MetadataUploaded {
            dir: metadata.dir,
            cid: metadata.cid.clone(),
        });

        image_cids.push(image_cid);
        metadata_cids.push(metadata.cid);
    }

    let manifest = build_manifest(&inputs.collections, &image_cids, &metadata_cids)?;
    write_manifest(&inputs.manifest_path, &manifest)?;
    on_event(&PipelineEvent::ManifestWritten {
        path: inputs.manifest_path.clone(),
        entries: manifest.len(),
    });

    Ok(RunSummary {
        manifest,
        manifest_path: inputs.manifest_path.clone(),
    })
}

/// Problems `check` can find without touching the storage network.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckIssue {
    UnusableId { id: CollectionId },
    MissingImage { id: CollectionId, path: PathBuf },
}

/// Verify every collection id can name a staging directory and every base
/// image exists.
pub fn check(inputs: &PipelineInputs) -> Vec<CheckIssue> {
    let mut issues = Vec::new();
    for spec in &inputs.collections {
        if collection_dir_name(&spec.collection_id).is_err() {
            issues.push(CheckIssue::UnusableId {
                id: spec.collection_id.clone(),
            });
        }
        let path = inputs.images_dir.join(&spec.image_name);
        if !path.is_file() {
            issues.push(CheckIssue::MissingImage {
                id: spec.collection_id.clone(),
                path,
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replicate::tests::{create_test_image, spec_with};
    use crate::storage::tests::{MockStore, RecordedOp};
    use serde_json::json;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn inputs_in(tmp: &Path, collections: Vec<CollectionSpec>) -> PipelineInputs {
        let images_dir = tmp.join("images");
        for spec in &collections {
            let path = images_dir.join(&spec.image_name);
            if !path.exists() {
                create_test_image(&path, 10, 10);
            }
        }
        PipelineInputs {
            collections,
            template: json!({
                "name": "{name} #{image_id}",
                "image": "ipfs://{nft_image_folder_cid}/{image_id}.{image_extension}"
            }),
            images_dir,
            staging: StagingLayout::new(tmp.join("generated")),
            manifest_path: tmp.join("outputs/manifest.json"),
        }
    }

    #[test]
    fn run_produces_manifest_for_every_collection() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(
            tmp.path(),
            vec![
                spec_with(1, "a.png", 2),
                spec_with(2, "b.png", 3),
                spec_with(3, "a.png", 1),
            ],
        );
        let store = MockStore::new();

        let summary = run(&inputs, |_| &store, |_| {}).unwrap();

        assert_eq!(summary.manifest.len(), 3);
        let ids: HashSet<_> = summary
            .manifest
            .values()
            .map(|e| e.collection.collection_id.to_string())
            .collect();
        assert_eq!(ids, HashSet::from(["1".into(), "2".into(), "3".into()]));
        assert!(inputs.manifest_path.is_file());

        // Collection 2: image folder is the 3rd add, metadata the 4th.
        let entry = summary.manifest.get("2").unwrap();
        assert_eq!(entry.image_folder_cid, Cid::new("QmMock3"));
        assert_eq!(entry.metadata_folder_cid, Cid::new("QmMock4"));
    }

    #[test]
    fn run_uploads_images_before_metadata_in_input_order() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(
            tmp.path(),
            vec![spec_with(7, "a.png", 2), spec_with(8, "b.png", 1)],
        );
        let store = MockStore::new();

        run(&inputs, |_| &store, |_| {}).unwrap();

        let adds: Vec<(PathBuf, Vec<String>)> = store
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Add { dir, files } => Some((dir, files)),
                RecordedOp::Pin(_) => None,
            })
            .collect();
        let staged = |kind: &str, n: u32| tmp.path().join(format!("generated/{kind}/{n}"));
        assert_eq!(
            adds,
            vec![
                (staged("images", 7), vec!["1.png".into(), "2.png".into()]),
                (staged("metadata", 7), vec!["1.json".into(), "2.json".into()]),
                (staged("images", 8), vec!["1.png".into()]),
                (staged("metadata", 8), vec!["1.json".into()]),
            ]
        );
    }

    #[test]
    fn metadata_points_at_uploaded_image_folder() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(tmp.path(), vec![spec_with(1, "a.png", 2)]);
        let store = MockStore::new();

        run(&inputs, |_| &store, |_| {}).unwrap();

        let doc: Value = serde_json::from_str(
            &fs::read_to_string(tmp.path().join("generated/metadata/1/2.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(doc["image"], "ipfs://QmMock1/2.png");
        assert_eq!(doc["name"], "Token 1 #2");
    }

    #[test]
    fn run_connects_with_each_collection_endpoint() {
        let tmp = TempDir::new().unwrap();
        let mut first = spec_with(1, "a.png", 1);
        first.storage_endpoint = "/ip4/10.0.0.1/tcp/5001".into();
        let mut second = spec_with(2, "a.png", 1);
        second.storage_endpoint = "/ip4/10.0.0.2/tcp/5001".into();
        let inputs = inputs_in(tmp.path(), vec![first, second]);
        let store = MockStore::new();
        let endpoints = std::cell::RefCell::new(Vec::new());

        run(
            &inputs,
            |endpoint| {
                endpoints.borrow_mut().push(endpoint.to_string());
                &store
            },
            |_| {},
        )
        .unwrap();

        assert_eq!(
            endpoints.into_inner(),
            vec!["/ip4/10.0.0.1/tcp/5001", "/ip4/10.0.0.2/tcp/5001"]
        );
    }

    #[test]
    fn pin_failure_stops_run_before_manifest() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(
            tmp.path(),
            vec![
                spec_with(1, "a.png", 1),
                spec_with(2, "a.png", 1),
                spec_with(3, "a.png", 1),
            ],
        );
        // 3rd add is collection 2's image folder.
        let store = MockStore::failing_pin_at(3);

        let err = run(&inputs, |_| &store, |_| {}).unwrap_err();

        assert!(err.is_pin_failure());
        assert_eq!(err.exit_code(), PIN_FAILURE_EXIT);
        match &err {
            PipelineError::ImageUpload { id, .. } => assert_eq!(id.to_string(), "2"),
            other => panic!("expected image upload failure, got {other:?}"),
        }
        assert!(!inputs.manifest_path.exists());
        // Collection 3 was never started.
        assert!(!tmp.path().join("generated/images/3").exists());
    }

    #[test]
    fn metadata_pin_failure_is_pin_failure() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(tmp.path(), vec![spec_with(1, "a.png", 1)]);
        let store = MockStore::failing_pin_at(2);

        let err = run(&inputs, |_| &store, |_| {}).unwrap_err();

        assert!(err.is_pin_failure());
        assert_eq!(err.exit_code(), PIN_FAILURE_EXIT);
        assert!(matches!(err, PipelineError::Render { .. }));
        assert!(!inputs.manifest_path.exists());
    }

    #[test]
    fn unparseable_add_is_not_pin_failure() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(tmp.path(), vec![spec_with(1, "a.png", 1)]);
        let store = MockStore::failing_add_at(1);

        let err = run(&inputs, |_| &store, |_| {}).unwrap_err();

        assert!(!err.is_pin_failure());
        assert_eq!(err.exit_code(), FAILURE_EXIT);
        assert!(matches!(
            err.storage_error(),
            Some(StorageError::UnparseableAdd { .. })
        ));
        assert!(!inputs.manifest_path.exists());
    }

    #[test]
    fn missing_image_fails_without_uploading() {
        let tmp = TempDir::new().unwrap();
        let mut inputs = inputs_in(tmp.path(), vec![spec_with(1, "a.png", 1)]);
        inputs.collections.push(spec_with(2, "missing.png", 1));
        let store = MockStore::new();

        let err = run(&inputs, |_| &store, |_| {}).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Replicate {
                source: ReplicateError::NotFound(_),
                ..
            }
        ));
        // Collection 1 was fully uploaded before the failure.
        assert_eq!(store.get_operations().len(), 4);
        assert!(!inputs.manifest_path.exists());
    }

    #[test]
    fn run_emits_events_in_order() {
        let tmp = TempDir::new().unwrap();
        let inputs = inputs_in(tmp.path(), vec![spec_with(1, "a.png", 2)]);
        let store = MockStore::new();
        let mut events = Vec::new();

        run(&inputs, |_| &store, |e| events.push(e.clone())).unwrap();

        assert_eq!(events.len(), 5);
        assert!(matches!(
            &events[0],
            PipelineEvent::CollectionStarted {
                position: 1,
                total: 1,
                copies: 2,
                ..
            }
        ));
        assert!(matches!(&events[1], PipelineEvent::ImagesStaged { count: 2, .. }));
        assert!(matches!(&events[2], PipelineEvent::ImagesUploaded { .. }));
        assert!(matches!(&events[3], PipelineEvent::MetadataUploaded { .. }));
        assert!(matches!(
            &events[4],
            PipelineEvent::ManifestWritten { entries: 1, .. }
        ));
    }

    #[test]
    fn check_reports_missing_images() {
        let tmp = TempDir::new().unwrap();
        let mut inputs = inputs_in(tmp.path(), vec![spec_with(1, "a.png", 1)]);
        inputs.collections.push(spec_with(2, "gone.png", 1));

        let issues = check(&inputs);

        assert_eq!(
            issues,
            vec![CheckIssue::MissingImage {
                id: CollectionId::Number(2u64.into()),
                path: inputs.images_dir.join("gone.png"),
            }]
        );
    }

    #[test]
    fn check_reports_ids_that_cannot_name_a_directory() {
        let tmp = TempDir::new().unwrap();
        let mut bad = spec_with(1, "a.png", 1);
        bad.collection_id = CollectionId::Text("a/b".into());
        let inputs = inputs_in(tmp.path(), vec![spec_with(2, "a.png", 1), bad]);

        let issues = check(&inputs);

        assert_eq!(
            issues,
            vec![CheckIssue::UnusableId {
                id: CollectionId::Text("a/b".into()),
            }]
        );
    }

    #[test]
    fn parent_dir_id_fails_without_deleting_staged_data() {
        let tmp = TempDir::new().unwrap();
        let mut escaping = spec_with(6, "a.png", 1);
        escaping.collection_id = CollectionId::Text("..".into());
        let inputs = inputs_in(tmp.path(), vec![spec_with(5, "a.png", 2), escaping]);
        let keep = tmp.path().join("generated/keep.txt");
        fs::create_dir_all(keep.parent().unwrap()).unwrap();
        fs::write(&keep, b"unrelated").unwrap();
        let store = MockStore::new();

        let err = run(&inputs, |_| &store, |_| {}).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Replicate {
                source: ReplicateError::Staging(_),
                ..
            }
        ));
        assert_eq!(err.exit_code(), FAILURE_EXIT);
        assert!(keep.is_file());
        assert!(tmp.path().join("generated/images/5/2.png").is_file());
        assert!(tmp.path().join("generated/metadata/5/2.json").is_file());
        assert!(!inputs.manifest_path.exists());
    }

    #[test]
    fn load_reads_inputs_from_disk() {
        let tmp = TempDir::new().unwrap();
        let collections = tmp.path().join("collections.json");
        let template = tmp.path().join("template.json");
        fs::write(
            &collections,
            r#"[{"nft_collection_id": 1, "nft_collection_name": "A", "name": "a",
                 "symbol": "A", "image_name": "a.png", "num_copies": 2,
                 "ipfs_node_rpc_api": ""}]"#,
        )
        .unwrap();
        fs::write(&template, r#"{"name": "{name}"}"#).unwrap();

        let inputs = PipelineInputs::load(
            &collections,
            &template,
            &tmp.path().join("images"),
            &tmp.path().join("generated"),
            &tmp.path().join("out.json"),
        )
        .unwrap();

        assert_eq!(inputs.collections.len(), 1);
        assert_eq!(inputs.template, json!({"name": "{name}"}));
        assert_eq!(inputs.staging.root(), tmp.path().join("generated"));
    }
}
