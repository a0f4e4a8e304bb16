//! CLI output formatting.
//!
//! Each piece of output has a `format_*` function (returns `Vec<String>`) for
//! testability and, where it is printed directly, a `print_*` wrapper that
//! writes to stdout. Format functions are pure.
//!
//! ## Build
//!
//! ```text
//! [1/2] Sunsets (id 1, 10 copies)
//!     images: 10 copies → generated/images/1
//!     images CID: QmImages…
//!     metadata CID: QmMeta… (generated/metadata/1)
//! [2/2] Moons (id moons, 1 copy)
//!     ...
//! Manifest: outputs/output_nfts_info.json (2 collections)
//! ```
//!
//! ## Failure
//!
//! ```text
//! ============================================================
//! ERROR: Collection 2: image upload failed: Pinning Qm… failed: …
//!
//! Make sure the IPFS daemon is running (`ipfs daemon`).
//! ============================================================
//! ```

use crate::pipeline::{CheckIssue, PipelineError, PipelineEvent, PipelineInputs};

const BORDER_WIDTH: usize = 60;

fn copies(n: u32) -> String {
    if n == 1 {
        "1 copy".to_string()
    } else {
        format!("{n} copies")
    }
}

/// Format one progress event.
pub fn format_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::CollectionStarted {
            position,
            total,
            id,
            name,
            copies: n,
        } => vec![format!("[{position}/{total}] {name} (id {id}, {})", copies(*n))],
        PipelineEvent::ImagesStaged { dir, count } => {
            vec![format!("    images: {} → {}", copies(*count), dir.display())]
        }
        PipelineEvent::ImagesUploaded { cid } => vec![format!("    images CID: {cid}")],
        PipelineEvent::MetadataUploaded { dir, cid } => {
            vec![format!("    metadata CID: {cid} ({})", dir.display())]
        }
        PipelineEvent::ManifestWritten { path, entries } => {
            let noun = if *entries == 1 {
                "collection"
            } else {
                "collections"
            };
            vec![format!("Manifest: {} ({entries} {noun})", path.display())]
        }
    }
}

pub fn print_event(event: &PipelineEvent) {
    for line in format_event(event) {
        println!("{line}");
    }
}

/// Banner printed after a successful build.
pub fn format_success() -> Vec<String> {
    let border = "=".repeat(BORDER_WIDTH);
    vec![
        border.clone(),
        "NFT collections generated and pinned successfully.".to_string(),
        border,
    ]
}

/// Bordered error block with the failure and a hint about the daemon.
pub fn format_error(message: &str) -> Vec<String> {
    let border = "=".repeat(BORDER_WIDTH);
    vec![
        border.clone(),
        format!("ERROR: {message}"),
        String::new(),
        "Make sure the IPFS daemon is running (`ipfs daemon`).".to_string(),
        border,
    ]
}

/// Error block for a pipeline failure; pin failures say so explicitly.
pub fn format_pipeline_error(err: &PipelineError) -> Vec<String> {
    let mut lines = format_error(&err.to_string());
    if err.is_pin_failure() {
        lines.insert(2, "Pinning failed; aborting before the manifest is written.".into());
    }
    lines
}

/// Plan shown by `check`: one line per collection, then any issues.
pub fn format_check(inputs: &PipelineInputs, issues: &[CheckIssue]) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];
    for (i, spec) in inputs.collections.iter().enumerate() {
        lines.push(format!(
            "{:0>3} {} (id {}, {}, {})",
            i + 1,
            spec.collection_name,
            spec.collection_id,
            spec.symbol,
            copies(spec.copy_count)
        ));
        lines.push(format!(
            "    Image: {}",
            inputs.images_dir.join(&spec.image_name).display()
        ));
        if !spec.storage_endpoint.is_empty() {
            lines.push(format!("    Node: {}", spec.storage_endpoint));
        }
    }
    lines.push(String::new());
    lines.push(format!("Manifest → {}", inputs.manifest_path.display()));

    for issue in issues {
        match issue {
            CheckIssue::UnusableId { id } => {
                lines.push(format!(
                    "Collection id {:?} cannot name a staging directory",
                    id.to_string()
                ));
            }
            CheckIssue::MissingImage { id, path } => {
                lines.push(format!(
                    "Missing base image for collection {id}: {}",
                    path.display()
                ));
            }
        }
    }
    lines
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
