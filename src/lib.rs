//! # nft-batch
//!
//! Batch-generates NFT collections and publishes them to IPFS. For every
//! collection in the input file the base image is copied `num_copies` times,
//! the copies are added and pinned as one folder, a metadata document is
//! rendered per copy from a shared template, and that folder is added and
//! pinned too. A final manifest maps each collection to both folder CIDs.
//!
//! # Pipeline
//!
//! ```text
//! collections.json ─┐
//! template.json ────┤
//!                   ▼
//!   per collection:  replicate ──▶ add + pin ──▶ render ──▶ add + pin
//!                   │
//!                   ▼
//!             manifest.json   (written once, after every collection succeeded)
//! ```
//!
//! Everything runs sequentially on one thread. The only blocking work is file
//! I/O and the `ipfs` child processes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`collections`] | Collection definitions and metadata template loading |
//! | [`replicate`] | Base image → `1.ext … N.ext` byte-identical copies |
//! | [`storage`] | [`storage::ContentStore`] trait and the `ipfs` CLI implementation |
//! | [`render`] | Placeholder substitution and per-copy metadata documents |
//! | [`manifest`] | Output manifest assembly and writing |
//! | [`pipeline`] | Sequential driver, single error channel, progress events |
//! | [`staging`] | Explicit staging directory layout |
//! | [`config`] | `nft-batch.toml` loading, merging, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Storage behind a trait
//!
//! The pipeline only needs "add a directory, get a CID" and "pin a CID". Keeping
//! that behind [`storage::ContentStore`] lets the whole pipeline run against a
//! recording double in tests, with no daemon and no child processes.
//!
//! ## One error channel
//!
//! A rejected pin is fatal for the whole run, but it travels through
//! [`pipeline::PipelineError`] like every other failure. The binary tells it
//! apart with [`pipeline::PipelineError::is_pin_failure`] and exits with a
//! distinct status code.
//!
//! ## Lenient templates
//!
//! Tokens that have no value (`{rarity}` in a template, say) are left in the
//! rendered output as written rather than rejected.

pub mod collections;
pub mod config;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod replicate;
pub mod staging;
pub mod storage;
