//! Archive inputs for coldstore: detection, listing, guarded extraction and structure analysis.
//!
//! # Architecture
//!
//! - `format.rs` - Supported formats and their filename suffixes
//! - `detect.rs` - Extension and signature detection
//! - `sanitize.rs` - Traversal guard and Windows filename rules
//! - `handler/` - Per-format listing and extraction
//! - `analyze.rs` - Topology classification and root-folder flattening
//!
//! ```no_run
//! use coldstore_archive::{ArchiveAnalyzer, StructureKind};
//! use std::path::Path;
//!
//! let analyzer = ArchiveAnalyzer::new();
//! let info = analyzer.analyze(Path::new("photos.zip"));
//! if info.kind() != StructureKind::Error {
//!     analyzer.extract(Path::new("photos.zip"), Path::new("/tmp/photos")).unwrap();
//! }
//! ```

pub use analyze::{ArchiveAnalyzer, StructureInfo, StructureKind, analyze_structure, handle_nested_structure};
pub use detect::{detect_by_extension, detect_format, detect_from_reader, detect_magic};
pub use entry::{ArchiveEntry, ArchiveInfo, ExtractReport};
pub use error::{Error, Result};
pub use format::{ArchiveFormat, Compression, archive_suffix, strip_archive_suffix};
pub use handler::rar::{REMEDIATION as RAR_REMEDIATION, parse_technical_listing};
pub use handler::tar::unpack_tar;
pub use handler::{ArchiveHandler, wrap_reader};
pub use sanitize::{
    SanitizedPath, is_safe_entry_path, needs_windows_sanitization, normalize_entry_path, sanitize_component,
    sanitize_entry, sanitize_relative_path,
};

mod analyze;
mod detect;
mod entry;
mod error;
mod format;
mod handler;
mod sanitize;
