//! Tool configuration module.
//!
//! Handles loading, validating, and merging `nft-batch.toml`. Stock defaults
//! are overridden by the user file, and individual paths can be overridden
//! again from the command line.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! collections = "inputs/input_nfts_info.json"   # Collection definitions
//! template = "inputs/metadata_template.json"    # Metadata template
//! images = "inputs/images"                      # Base images, by image_name
//! staging = "generated"                         # Staging directories
//! manifest = "outputs/output_nfts_info.json"    # Output manifest
//!
//! [storage]
//! command = "ipfs"          # Storage CLI executable
//! args = []                 # Extra arguments placed before every subcommand
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "nft-batch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Stock config could not be serialized: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `nft-batch.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Input and output locations.
    pub paths: PathsConfig,
    /// How the storage daemon CLI is invoked.
    pub storage: StorageConfig,
}

impl BatchConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.command must not be empty".into(),
            ));
        }
        let paths = [
            ("paths.collections", &self.paths.collections),
            ("paths.template", &self.paths.template),
            ("paths.images", &self.paths.images),
            ("paths.staging", &self.paths.staging),
            ("paths.manifest", &self.paths.manifest),
        ];
        for (key, value) in paths {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// JSON array of collection definitions.
    pub collections: PathBuf,
    /// Metadata template with `{placeholder}` tokens.
    pub template: PathBuf,
    /// Directory the collections' `image_name` entries are resolved against.
    pub images: PathBuf,
    /// Root of the per-collection staging directories.
    pub staging: PathBuf,
    /// Where the output manifest is written.
    pub manifest: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            collections: PathBuf::from("inputs/input_nfts_info.json"),
            template: PathBuf::from("inputs/metadata_template.json"),
            images: PathBuf::from("inputs/images"),
            staging: PathBuf::from("generated"),
            manifest: PathBuf::from("outputs/output_nfts_info.json"),
        }
    }
}

/// Storage daemon CLI invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            command: "ipfs".to_string(),
            args: Vec::new(),
        }
    }
}

// =============================================================================
// Loading: stock table, user overlay, validation
// =============================================================================

/// The built-in settings as a TOML table, ready to be overlaid.
fn stock_table() -> Result<toml::Table, ConfigError> {
    Ok(toml::Table::try_from(BatchConfig::default())?)
}

/// Lay the user's settings over `settings` in place.
///
/// Sections (`[paths]`, `[storage]`) merge key by key, so a file that only
/// sets `storage.command` keeps every stock path. Any other value replaces
/// what was there; `storage.args` is never concatenated with the stock list.
fn overlay(settings: &mut toml::Table, user: toml::Table) {
    for (key, value) in user {
        match value {
            toml::Value::Table(user_section) => match settings.get_mut(&key) {
                Some(toml::Value::Table(section)) => overlay(section, user_section),
                _ => {
                    settings.insert(key, toml::Value::Table(user_section));
                }
            },
            value => {
                settings.insert(key, value);
            }
        }
    }
}

/// The user's config file as a TOML table, or `None` when there is no file.
fn read_user_table(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Load `nft-batch.toml` from `path` over the stock settings.
///
/// A missing file is not an error: the stock settings are used as is.
pub fn load_config(path: &Path) -> Result<BatchConfig, ConfigError> {
    let mut settings = stock_table()?;
    if let Some(user) = read_user_table(path)? {
        overlay(&mut settings, user);
    }
    let config: BatchConfig = settings.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `nft-batch.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# nft-batch configuration
# =======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths (relative paths resolve against the working directory)
# ---------------------------------------------------------------------------
[paths]
# JSON array of collection definitions:
#   nft_collection_id, nft_collection_name, name, symbol,
#   image_name, num_copies, ipfs_node_rpc_api
collections = "inputs/input_nfts_info.json"

# Metadata template. String values may contain {name},
# {nft_image_folder_cid}, {image_id} and {image_extension}.
template = "inputs/metadata_template.json"

# Directory holding the base images named by image_name.
images = "inputs/images"

# Staging root. Copies land in <staging>/images/<id>/ and
# rendered metadata in <staging>/metadata/<id>/.
staging = "generated"

# Output manifest: collection id -> fields + folder CIDs.
manifest = "outputs/output_nfts_info.json"

# ---------------------------------------------------------------------------
# Storage daemon CLI
# ---------------------------------------------------------------------------
[storage]
# Executable used for `add -r <dir>` and `pin add <cid>`.
command = "ipfs"

# Extra arguments inserted before every subcommand.
args = []
"##
}
