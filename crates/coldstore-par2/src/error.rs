use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("PAR2 tool '{binary}' not found on PATH (install par2cmdline-turbo, or pass --no-par2)")]
    ToolUnavailable { binary: String },

    #[error("PAR2 generation for '{artifact}' failed: {stderr}")]
    GenerationFailed { artifact: PathBuf, stderr: String },

    #[error("PAR2 verification failed: {missing} missing, {damaged} damaged")]
    VerificationFailed { missing: usize, damaged: usize },

    #[error("repair is not possible with '{par2}': insufficient recovery data, restore from backup")]
    RepairNotPossible { par2: PathBuf },

    #[error("PAR2 repair with '{par2}' failed: {stderr}")]
    RepairFailed { par2: PathBuf, stderr: String },

    #[error("PAR2 {operation} timed out after {}s", limit.as_secs())]
    Timeout { operation: &'static str, limit: Duration },

    #[error("PAR2 {operation} exited with {code:?}: {stderr}")]
    ToolFailed {
        operation: &'static str,
        code:      Option<i32>,
        stderr:    String,
    },

    #[error("recovery file not found: {path}")]
    MissingRecoveryFile { path: PathBuf },

    #[error(transparent)]
    Platform(#[from] coldstore_platform::Error),
}
