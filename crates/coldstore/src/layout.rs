//! Where a pack run writes its outputs.

use std::path::{Path, PathBuf};

use coldstore_fs::RetryPolicy;
use coldstore_verify::{Algorithm, sidecar_path};

pub const ARTIFACT_SUFFIX: &str = ".tar.zst";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutMode {
    /// `<dir>/<base>/<base>.tar.zst`
    #[default]
    Organized,
    /// `<dir>/<base>.tar.zst`
    Flat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    dir:  PathBuf,
    base: String,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        Self {
            dir:  dir.into(),
            base: base.into(),
        }
    }

    pub fn for_input(input: &Path, output_dir: &Path, mode: LayoutMode) -> Self {
        let base = base_name(input);
        let dir = match mode {
            LayoutMode::Organized => output_dir.join(&base),
            LayoutMode::Flat => output_dir.to_path_buf(),
        };
        Self::new(dir, base)
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn base(&self) -> &str { &self.base }

    pub fn artifact_name(&self) -> String { format!("{}{ARTIFACT_SUFFIX}", self.base) }

    pub fn artifact(&self) -> PathBuf { self.dir.join(self.artifact_name()) }

    pub fn sidecar(&self, algorithm: Algorithm) -> PathBuf { sidecar_path(&self.artifact(), algorithm) }

    pub fn sha256(&self) -> PathBuf { self.sidecar(Algorithm::Sha256) }

    pub fn blake3(&self) -> PathBuf { self.sidecar(Algorithm::Blake3) }

    pub fn par2(&self) -> PathBuf { coldstore_par2::recovery_index_path(&self.artifact()) }

    /// Recovery index plus any volume files already next to the artifact.
    pub fn recovery_files(&self) -> Vec<PathBuf> {
        coldstore_par2::discover_recovery_files(&self.dir, &self.artifact_name())
    }

    /// Every layout file, recovery volumes included, that is already on disk.
    pub fn existing(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = [self.artifact(), self.sha256(), self.blake3(), self.par2()]
            .into_iter()
            .filter(|p| p.exists())
            .collect();
        for volume in self.recovery_files() {
            if !found.contains(&volume) {
                found.push(volume);
            }
        }
        found
    }

    /// Remove whatever this layout produced. Failures are logged and returned.
    pub fn cleanup_partial(&self) -> Vec<PathBuf> {
        let policy = RetryPolicy::file_removal();
        let mut remaining = Vec::new();
        for path in self.existing() {
            match coldstore_fs::remove_file(&path, &policy) {
                Ok(()) => tracing::info!(path = %path.display(), "removed partial output"),
                Err(err) => {
                    tracing::error!(%err, "failed to remove partial output");
                    remaining.push(path);
                }
            }
        }
        remaining
    }
}

/// Directory name for directories, otherwise the file name without its
/// archive suffix (or plain extension when it is not an archive).
pub fn base_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    if input.is_dir() {
        return name;
    }
    let stripped = coldstore_archive::strip_archive_suffix(&name);
    if stripped.len() != name.len() {
        return stripped.to_string();
    }
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}

pub fn is_artifact(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(ARTIFACT_SUFFIX))
        .unwrap_or(false)
}

/// `data.tar.zst` -> `data`.
pub fn artifact_base(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    if !is_artifact(path) || name.len() <= ARTIFACT_SUFFIX.len() {
        return None;
    }
    Some(name[..name.len() - ARTIFACT_SUFFIX.len()].to_string())
}
