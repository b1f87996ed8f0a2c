//! Resource checks that gate entry into a pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const MIB: u64 = 1024 * 1024;
const GIB: f64 = (1024 * 1024 * 1024) as f64;

/// Available memory recommended for a long-mode (window log 31) pack.
pub const LONG_MODE_MEMORY: u64 = 2200 * MIB;
/// Free space needed on the output volume, as a multiple of the input size.
pub const PACK_SPACE_FACTOR: f64 = 2.5;
/// Assumed ratio of extracted size to artifact size.
pub const EXTRACT_EXPANSION: f64 = 5.0;
/// Headroom over an estimate.
pub const HEADROOM: f64 = 1.2;

pub trait Preflight {
    fn before_pack(&self, input: &Path, output_dir: &Path, long_mode: bool) -> Result<()>;

    fn before_extract(&self, artifact: &Path, output_dir: &Path, required_memory_mb: u64) -> Result<()>;
}

/// Readable input and a writable output directory, nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissionsPreflight;

impl PermissionsPreflight {
    pub fn check(&self, input: &Path, output_dir: &Path) -> Result<()> {
        if !input.exists() {
            return Err(Error::InputMissing {
                path: input.to_path_buf(),
            });
        }
        let readable = if input.is_dir() {
            fs::read_dir(input).map(drop)
        } else {
            fs::File::open(input).map(drop)
        };
        readable.map_err(|source| Error::Io {
            context: "cannot read input",
            path: input.to_path_buf(),
            source,
        })?;

        fs::create_dir_all(output_dir).map_err(|source| Error::Io {
            context: "cannot create output directory",
            path: output_dir.to_path_buf(),
            source,
        })?;
        tempfile::tempfile_in(output_dir).map_err(|source| Error::Io {
            context: "cannot write to output directory",
            path: output_dir.to_path_buf(),
            source,
        })?;
        tracing::debug!("permission check: read/write access confirmed");
        Ok(())
    }
}

impl Preflight for PermissionsPreflight {
    fn before_pack(&self, input: &Path, output_dir: &Path, _long_mode: bool) -> Result<()> {
        self.check(input, output_dir)
    }

    fn before_extract(&self, artifact: &Path, output_dir: &Path, _required_memory_mb: u64) -> Result<()> {
        self.check(artifact, output_dir)
    }
}

/// Permissions plus free memory and disk space as reported by the OS.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPreflight {
    permissions: PermissionsPreflight,
}

impl SystemPreflight {
    pub fn new() -> Self { Self::default() }

    fn available_memory() -> u64 {
        let mut system = System::new();
        system.refresh_memory();
        system.available_memory()
    }

    fn check_memory(required: u64, hint: &str) -> Result<()> {
        let available = Self::available_memory();
        if available < required {
            return Err(Error::Preflight {
                reason: format!(
                    "low memory: {:.1}GB available, {:.1}GB required{hint}",
                    available as f64 / GIB,
                    required as f64 / GIB
                ),
            });
        }
        tracing::info!(available_mb = available / MIB, required_mb = required / MIB, "memory check passed");
        Ok(())
    }

    fn check_space(output_dir: &Path, required: u64) -> Result<()> {
        let Some(free) = free_space(output_dir) else {
            tracing::warn!(dir = %output_dir.display(), "could not determine free disk space");
            return Ok(());
        };
        if free < required {
            return Err(Error::Preflight {
                reason: format!(
                    "insufficient disk space: {:.1}GB available, estimated need {:.1}GB",
                    free as f64 / GIB,
                    required as f64 / GIB
                ),
            });
        }
        tracing::info!(free_mb = free / MIB, required_mb = required / MIB, "disk space check passed");
        Ok(())
    }
}

impl Preflight for SystemPreflight {
    fn before_pack(&self, input: &Path, output_dir: &Path, long_mode: bool) -> Result<()> {
        self.permissions.check(input, output_dir)?;
        if long_mode {
            Self::check_memory(LONG_MODE_MEMORY, ", consider --no-long")?;
        }
        let required = (input_size(input) as f64 * PACK_SPACE_FACTOR) as u64;
        Self::check_space(output_dir, required)
    }

    fn before_extract(&self, artifact: &Path, output_dir: &Path, required_memory_mb: u64) -> Result<()> {
        self.permissions.check(artifact, output_dir)?;
        Self::check_memory((required_memory_mb as f64 * HEADROOM) as u64 * MIB, "")?;
        let compressed = fs::metadata(artifact).map(|m| m.len()).unwrap_or(0);
        let required = (compressed as f64 * EXTRACT_EXPANSION * HEADROOM) as u64;
        Self::check_space(output_dir, required)
    }
}

/// Total size of regular files under `path`.
pub fn input_size(path: &Path) -> u64 {
    if path.is_file() {
        return fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Free bytes on the volume whose mount point is the longest prefix of `path`.
fn free_space(path: &Path) -> Option<u64> {
    let path = fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path));
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_fails() {
        let root = tempfile::tempdir().unwrap();
        let err = PermissionsPreflight
            .check(&root.path().join("absent"), &root.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, Error::InputMissing { .. }));
    }

    #[test]
    fn output_directory_is_created() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("in.txt");
        fs::write(&input, b"data").unwrap();
        let out = root.path().join("deep/out");
        PermissionsPreflight.before_pack(&input, &out, true).unwrap();
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn input_size_sums_files() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("sub")).unwrap();
        fs::write(root.path().join("a"), [0u8; 10]).unwrap();
        fs::write(root.path().join("sub/b"), [0u8; 5]).unwrap();
        assert_eq!(input_size(root.path()), 15);
        assert_eq!(input_size(&root.path().join("a")), 10);
    }
}
