//! Canonical tar streams and the zstd layer wrapped around them.
//!
//! # Architecture
//!
//! - `serialize.rs` - `DeterministicSerializer`: byte-stable tar output
//! - `window.rs` - Size-to-window table and frame header parsing
//! - `compress.rs` - `CompressionEngine`: compress, decompress, integrity checks
//! - `inspect.rs` - Tar readability scans and guarded unpacking

pub use compress::{ArtifactInfo, CompressionEngine, CompressionParameters, CompressionReport, LEVEL_RANGE};
pub use error::{Error, Result};
pub use inspect::{TarSummary, check_tar_readable, scan_tar, unpack_tar_file};
pub use serialize::{DeterministicSerializer, SerializeReport};
pub use window::{
    FORMAT_MAX_WINDOW_LOG, FrameHeader, MIN_WINDOW_LOG, ZSTD_MAGIC, max_window_log, read_frame_header,
    window_log_for_size, window_memory_mb,
};

mod compress;
mod error;
mod inspect;
mod serialize;
mod window;
