//! Process and tool helpers shared by the coldstore crates.
//!
//! - `command.rs` - `Command` builder with bounded-time execution
//! - `tool.rs` - locating external binaries on `PATH`

pub use command::{ChildRegistry, Command, CommandOutput};
pub use error::{Error, Result};
pub use tool::{locate, locate_any};

pub mod command;
mod error;
pub mod tool;
