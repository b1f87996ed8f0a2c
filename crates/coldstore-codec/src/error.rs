use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to serialize '{path}': {source}")]
    Serialization { path: PathBuf, source: io::Error },

    #[error("no entries could be added from '{path}'")]
    NothingSerialized { path: PathBuf },

    #[error("compression of '{path}' failed: {source}")]
    Compression { path: PathBuf, source: io::Error },

    #[error("decompression of '{path}' failed: {source}")]
    Decompression { path: PathBuf, source: io::Error },

    #[error("invalid zstd frame in '{path}': {reason}")]
    InvalidFrame { path: PathBuf, reason: String },

    #[error("output was not produced: {path}")]
    MissingOutput { path: PathBuf },

    #[error("tar stream in '{path}' is unreadable: {source}")]
    UnreadableTar { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Archive(#[from] coldstore_archive::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
