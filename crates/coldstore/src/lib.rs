//! Archive packaging and integrity pipeline.
//!
//! Inputs (7z, zip, rar, the tar family, plain files and directories) are
//! normalized into a deterministic tar stream, compressed with zstd and
//! protected by SHA-256/BLAKE3 sidecars and PAR2 recovery data. The same
//! artifacts can later be verified, extracted and repaired.
//!
//! # Architecture
//!
//! - `cli.rs` - clap command definitions
//! - `config.rs` - TOML defaults and validation
//! - `layout.rs` - Output paths for an artifact and its integrity files
//! - `pipeline/` - pack, verify, extract, process and repair
//! - `report.rs` - Per-check verification results
//! - `preflight.rs` - Memory, disk and permission gates
//! - `progress.rs` - Progress sinks
//! - `run.rs` - Logging setup and command dispatch

pub use config::Config;
pub use error::{Error, Result};
pub use layout::{LayoutMode, OutputLayout};
pub use report::{Aggregate, VerificationReport};

pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod preflight;
pub mod progress;
pub mod report;
pub mod run;
pub mod ui;
