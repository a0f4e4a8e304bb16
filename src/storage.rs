//! Content-addressed storage access.
//!
//! The [`ContentStore`] trait is the whole capability the pipeline needs from
//! the storage network: add a directory and get its root CID, then pin that
//! CID. The production implementation is [`IpfsCli`], which shells out to the
//! `ipfs` command line:
//!
//! | Operation | Command | Success criterion |
//! |---|---|---|
//! | Add | `ipfs [--api ADDR] add -r <dir>` | root CID parsed from the last output line |
//! | Pin | `ipfs [--api ADDR] pin add <cid>` | exit 0 and nothing on stderr |
//!
//! Calls block until the child exits; there are no timeouts or retries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`add -r {}` failed: {stderr}", .dir.display())]
    Add { dir: PathBuf, stderr: String },
    #[error("No content identifier in `add -r {}` output: {output:?}", .dir.display())]
    UnparseableAdd { dir: PathBuf, output: String },
    #[error("Pinning {cid} failed: {stderr}")]
    Pin { cid: Cid, stderr: String },
}

/// Content identifier returned by the storage network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal storage capability used by the pipeline.
pub trait ContentStore {
    /// Recursively add `dir` and return the root content identifier.
    fn add_directory(&self, dir: &Path) -> Result<Cid, StorageError>;

    /// Exempt `cid` from garbage collection.
    fn pin(&self, cid: &Cid) -> Result<(), StorageError>;
}

impl<T: ContentStore + ?Sized> ContentStore for &T {
    fn add_directory(&self, dir: &Path) -> Result<Cid, StorageError> {
        (**self).add_directory(dir)
    }

    fn pin(&self, cid: &Cid) -> Result<(), StorageError> {
        (**self).pin(cid)
    }
}

/// Add `dir` and pin the resulting root identifier.
pub fn upload_directory(store: &impl ContentStore, dir: &Path) -> Result<Cid, StorageError> {
    let cid = store.add_directory(dir)?;
    store.pin(&cid)?;
    Ok(cid)
}

/// Extract the root CID from `add -r` output.
///
/// The root directory is reported last, as `added <cid> <name>`; the CID is
/// the second-to-last token of that line.
pub fn parse_add_output(stdout: &str) -> Option<Cid> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    Some(Cid::new(tokens[tokens.len() - 2]))
}

/// Storage access through the `ipfs` command line.
#[derive(Debug, Clone)]
pub struct IpfsCli {
    program: String,
    base_args: Vec<String>,
}

impl IpfsCli {
    /// `endpoint` is passed as `--api`; an empty endpoint uses the CLI default.
    pub fn new(program: impl Into<String>, extra_args: &[String], endpoint: &str) -> Self {
        let mut base_args = extra_args.to_vec();
        if !endpoint.trim().is_empty() {
            base_args.push("--api".to_string());
            base_args.push(endpoint.trim().to_string());
        }
        Self {
            program: program.into(),
            base_args,
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, StorageError> {
        Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .output()
            .map_err(|source| StorageError::Spawn {
                command: format!("{} {}", self.program, args.join(" ")),
                source,
            })
    }
}

impl ContentStore for IpfsCli {
    fn add_directory(&self, dir: &Path) -> Result<Cid, StorageError> {
        let dir_arg = dir.to_string_lossy();
        let output = self.run(&["add", "-r", &dir_arg])?;
        if !output.status.success() {
            return Err(StorageError::Add {
                dir: dir.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_add_output(&stdout).ok_or_else(|| StorageError::UnparseableAdd {
            dir: dir.to_path_buf(),
            output: stdout.trim().to_string(),
        })
    }

    fn pin(&self, cid: &Cid) -> Result<(), StorageError> {
        let output = self.run(&["pin", "add", cid.as_str()])?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() || !output.status.success() {
            return Err(StorageError::Pin {
                cid: cid.clone(),
                stderr: if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }
        Ok(())
    }
}
