use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Archive(#[from] coldstore_archive::Error),

    #[error(transparent)]
    Codec(#[from] coldstore_codec::Error),

    #[error(transparent)]
    Verify(#[from] coldstore_verify::Error),

    #[error(transparent)]
    Par2(#[from] coldstore_par2::Error),

    #[error(transparent)]
    Fs(#[from] coldstore_fs::Error),

    #[error("failed to read config '{path}': {source}")]
    ConfigRead { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config '{path}': {source}")]
    ConfigParse { path: PathBuf, source: toml::de::Error },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("input not found: {path}")]
    InputMissing { path: PathBuf },

    #[error("'{path}' is not a .tar.zst artifact")]
    NotAnArtifact { path: PathBuf },

    #[error("output files already exist: {}", display_paths(paths))]
    OutputExists { paths: Vec<PathBuf> },

    #[error("destination '{path}' is not empty (use --force to extract anyway)")]
    DestinationNotEmpty { path: PathBuf },

    #[error("preflight check failed: {reason}")]
    Preflight { reason: String },

    #[error("verification of '{path}' failed: {}", checks.join(", "))]
    VerificationFailed { path: PathBuf, checks: Vec<String> },

    #[error("{context} '{path}': {source}")]
    Io {
        context: &'static str,
        path:    PathBuf,
        source:  std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
