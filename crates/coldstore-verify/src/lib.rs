//! Integrity digests for coldstore artifacts.
//!
//! Every artifact is hashed with SHA-256 and BLAKE3 in one streaming pass
//! over fixed-size chunks. The digests are persisted as coreutils-style
//! sidecars (`<artifact>.sha256`, `<artifact>.blake3`) and later re-derived
//! and compared against them.
//!
//! ```
//! use coldstore_verify::{Algorithm, format_line, parse_digest};
//!
//! let line = format_line("ab12", "data.tar.zst");
//! assert_eq!(parse_digest(&line), Some("ab12"));
//! assert_eq!(Algorithm::Sha256.extension(), "sha256");
//! ```

pub use self::check::{CheckOutcome, CheckStatus};
pub use self::digest::{CHUNK_SIZE, FileDigests, digest_file, digest_reader};
pub use self::error::{Error, Result};
pub use self::hasher::{Algorithm, Blake3Hasher, Hasher, Sha256Hasher};
pub use self::sidecar::{
    SidecarReport, format_line, generate_and_persist, parse_digest, read_sidecar, sidecar_path,
    verify_against_sidecars, verify_digest,
};

mod check;
mod digest;
mod error;
mod hasher;
mod sidecar;
