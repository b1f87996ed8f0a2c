//! Adapter over the `par2` command line (par2cmdline or par2cmdline-turbo).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use coldstore_platform::{Command, CommandOutput, locate};

use crate::backend::RecoveryBackend;
use crate::error::{Error, Result};
use crate::parse::{Par2Repair, Par2Verification};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Par2Settings {
    pub binary:           String,
    pub recovery_percent: u8,
    /// Bytes per slice; par2 requires a multiple of 4.
    pub slice_size:       u64,
    pub timeout:          Duration,
    pub version_timeout:  Duration,
}

impl Default for Par2Settings {
    fn default() -> Self {
        Self {
            binary:           "par2".to_string(),
            recovery_percent: 10,
            slice_size:       1024 * 1024,
            timeout:          Duration::from_secs(3600),
            version_timeout:  Duration::from_secs(5),
        }
    }
}

/// Shells out to `par2`. The binary is resolved on each call so a missing
/// tool only matters to commands that need recovery data.
#[derive(Clone, Debug, Default)]
pub struct Par2Cli {
    settings: Par2Settings,
}

impl Par2Cli {
    pub fn new(settings: Par2Settings) -> Self { Self { settings } }

    pub fn settings(&self) -> &Par2Settings { &self.settings }

    fn executable(&self) -> Result<PathBuf> {
        locate(&self.settings.binary).ok_or_else(|| Error::ToolUnavailable {
            binary: self.settings.binary.clone(),
        })
    }

    fn run(&self, operation: &'static str, args: Vec<String>, limit: Duration) -> Result<CommandOutput> {
        let exe = self.executable()?;
        Command::at(self.settings.binary.clone(), &exe)
            .args(args)
            .timeout(limit)
            .run()
            .map_err(|err| match err {
                coldstore_platform::Error::TimedOut { limit, .. } => Error::Timeout { operation, limit },
                coldstore_platform::Error::CommandNotFound { .. } => Error::ToolUnavailable {
                    binary: self.settings.binary.clone(),
                },
                other => Error::Platform(other),
            })
    }
}

/// Files in `dir` named `<artifact_name>*.par2`, sorted.
pub fn discover_recovery_files(dir: &Path, artifact_name: &str) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(artifact_name) && name.ends_with(".par2")
        })
        .map(|entry| entry.path())
        .collect();
    files.sort();
    files
}

impl RecoveryBackend for Par2Cli {
    fn version(&self) -> Result<String> {
        let output = self.run("version probe", vec!["--version".into()], self.settings.version_timeout)?;
        let banner = output.stdout.lines().next().unwrap_or_default().trim().to_string();
        if banner.to_lowercase().contains("turbo") {
            tracing::info!(version = %banner, "found par2cmdline-turbo");
        } else {
            tracing::warn!(version = %banner, "par2 found but it may not be par2cmdline-turbo");
        }
        Ok(if banner.is_empty() { "unknown version".to_string() } else { banner })
    }

    fn generate(&self, artifact: &Path) -> Result<Vec<PathBuf>> {
        let Some(name) = artifact.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Err(Error::GenerationFailed {
                artifact: artifact.to_path_buf(),
                stderr:   "artifact has no file name".to_string(),
            });
        };
        if !artifact.is_file() {
            return Err(Error::GenerationFailed {
                artifact: artifact.to_path_buf(),
                stderr:   "artifact not found".to_string(),
            });
        }
        let dir = artifact.parent().unwrap_or_else(|| Path::new("."));
        let index = dir.join(format!("{name}.par2"));
        tracing::info!(
            artifact = %artifact.display(),
            percent = self.settings.recovery_percent,
            slice = self.settings.slice_size,
            "generating PAR2 recovery data"
        );

        let args = vec![
            "create".to_string(),
            format!("-r{}", self.settings.recovery_percent),
            format!("-s{}", self.settings.slice_size),
            "-n1".to_string(),
            index.display().to_string(),
            artifact.display().to_string(),
        ];
        let output = self.run("generation", args, self.settings.timeout)?;
        if !output.success() {
            return Err(Error::GenerationFailed {
                artifact: artifact.to_path_buf(),
                stderr:   output.stderr.trim().to_string(),
            });
        }
        let files = discover_recovery_files(dir, &name);
        tracing::info!(count = files.len(), "PAR2 files generated");
        Ok(files)
    }

    fn verify(&self, par2: &Path) -> Result<Par2Verification> {
        if !par2.is_file() {
            return Err(Error::MissingRecoveryFile {
                path: par2.to_path_buf(),
            });
        }
        tracing::info!(par2 = %par2.display(), "verifying with PAR2");
        let output = self.run("verification", vec!["verify".into(), par2.display().to_string()], self.settings.timeout)?;
        match output.code() {
            Some(0..=2) => Ok(Par2Verification::from_output(output.code(), output.stdout, output.stderr)),
            code => Err(Error::ToolFailed {
                operation: "verification",
                code,
                stderr: output.stderr.trim().to_string(),
            }),
        }
    }

    fn repair(&self, par2: &Path) -> Result<Par2Repair> {
        if !par2.is_file() {
            return Err(Error::MissingRecoveryFile {
                path: par2.to_path_buf(),
            });
        }
        tracing::info!(par2 = %par2.display(), "repairing with PAR2");
        let output = self.run("repair", vec!["repair".into(), par2.display().to_string()], self.settings.timeout)?;
        let code = output.code();
        let repair = Par2Repair::from_output(code, output.stdout, output.stderr);
        match code {
            Some(0) => Ok(repair),
            Some(2) => Err(Error::RepairNotPossible {
                par2: par2.to_path_buf(),
            }),
            _ => Err(Error::RepairFailed {
                par2:   par2.to_path_buf(),
                stderr: repair.stderr.trim().to_string(),
            }),
        }
    }
}
