//! PAR2 recovery data for coldstore artifacts.
//!
//! Pipelines talk to [`RecoveryBackend`]; [`Par2Cli`] is the only adapter
//! that touches the external tool.

pub use backend::{RecoveryBackend, RecoveryOutcome, recover, recovery_index_path};
pub use cli::{Par2Cli, Par2Settings, discover_recovery_files};
pub use error::{Error, Result};
pub use parse::{Par2Repair, Par2Verification};

mod backend;
mod cli;
mod error;
mod parse;
