use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported archive format: '{path}'")]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read archive '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("archive '{path}' is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory: {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("no RAR tool found to open '{path}'\n{remediation}")]
    ToolUnavailable { path: PathBuf, remediation: &'static str },

    #[error("{tool} could not open '{path}': {stderr}\n{remediation}")]
    ToolFailed {
        tool:        String,
        path:        PathBuf,
        stderr:      String,
        remediation: &'static str,
    },

    #[error("structure analysis failed for '{path}': {reason}")]
    StructureAnalysis { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
