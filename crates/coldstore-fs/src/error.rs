use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to remove '{path}': {source}")]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to allocate temporary path with prefix '{prefix}': {source}")]
    TempCreate { prefix: String, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("cleanup left {} path(s) behind for the next sweep", remaining.len())]
    Cleanup { remaining: Vec<PathBuf> },

    #[error("cannot allocate '{prefix}' after teardown has started")]
    TornDown { prefix: String },

    #[error("failed to install signal hooks: {source}")]
    Signal { source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
