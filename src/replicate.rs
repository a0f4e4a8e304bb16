//! Image replication.
//!
//! The base image is decoded and re-encoded once in its own format with the
//! `image` crate; the encoded bytes are then written `copy_count` times.
//! No pixel work happens here, so every copy is byte-identical.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Format detection | `ImageReader::with_guessed_format` (content sniffing, extension fallback) |
//! | Decode | `ImageReader::decode` |
//! | Encode | `DynamicImage::write_to` with the detected `ImageFormat` |

use crate::collections::CollectionSpec;
use crate::staging::{InvalidCollectionDir, StagingLayout, numbered_file_name, prepare_fresh_dir};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicateError {
    #[error("Base image not found: {0}")]
    NotFound(PathBuf),
    #[error("Cannot determine image format of {0}")]
    UnknownFormat(PathBuf),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Failed to encode {path} as {format:?}: {source}")]
    Encode {
        path: PathBuf,
        format: ImageFormat,
        source: image::ImageError,
    },
    #[error("Staging directory error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Staging(#[from] InvalidCollectionDir),
}

/// Result of replicating one collection's base image.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedImages {
    pub dir: PathBuf,
    /// Extension of the base image file, without the dot.
    pub extension: String,
    pub count: u32,
}

/// Extension of the base image as written in its file name.
fn image_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

fn staging_io(path: &Path) -> impl FnOnce(std::io::Error) -> ReplicateError {
    let path = path.to_path_buf();
    move |source| ReplicateError::Io { path, source }
}

/// Decode the base image and re-encode it in its original format.
pub fn encode_base_image(path: &Path) -> Result<Vec<u8>, ReplicateError> {
    if !path.is_file() {
        return Err(ReplicateError::NotFound(path.to_path_buf()));
    }
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| ReplicateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let format = reader
        .format()
        .ok_or_else(|| ReplicateError::UnknownFormat(path.to_path_buf()))?;
    let img = reader.decode().map_err(|source| ReplicateError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, format)
        .map_err(|source| ReplicateError::Encode {
            path: path.to_path_buf(),
            format,
            source,
        })?;
    Ok(encoded.into_inner())
}

/// Write `spec.copy_count` copies of the collection's base image into a fresh
/// staging directory as `1.ext` … `N.ext`.
pub fn replicate_image(
    spec: &CollectionSpec,
    images_dir: &Path,
    staging: &StagingLayout,
) -> Result<StagedImages, ReplicateError> {
    let dir = staging.images_dir(&spec.collection_id)?;
    let source = images_dir.join(&spec.image_name);
    let extension =
        image_extension(&source).ok_or_else(|| ReplicateError::UnknownFormat(source.clone()))?;
    let bytes = encode_base_image(&source)?;

    prepare_fresh_dir(&dir).map_err(staging_io(&dir))?;

    for index in 1..=spec.copy_count {
        let target = dir.join(numbered_file_name(index, &extension));
        std::fs::write(&target, &bytes).map_err(staging_io(&target))?;
    }

    Ok(StagedImages {
        dir,
        extension,
        count: spec.copy_count,
    })
}
