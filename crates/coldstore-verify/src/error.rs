use std::io;
use std::path::PathBuf;

use crate::hasher::Algorithm;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{algorithm} mismatch for '{path}': expected {expected}, got {actual}")]
    Mismatch {
        algorithm: Algorithm,
        path:      PathBuf,
        expected:  String,
        actual:    String,
    },

    #[error("{algorithm} sidecar missing: '{sidecar}'")]
    SidecarMissing { algorithm: Algorithm, sidecar: PathBuf },

    #[error("{algorithm} sidecar '{sidecar}' holds no digest")]
    MalformedSidecar { algorithm: Algorithm, sidecar: PathBuf },

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Persist(#[from] coldstore_fs::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
