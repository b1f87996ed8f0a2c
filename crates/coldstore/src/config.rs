//! Optional TOML defaults, overridden by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use coldstore_codec::{CompressionParameters, LEVEL_RANGE};
use coldstore_fs::TrackerOptions;
use coldstore_par2::Par2Settings;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pack:    PackConfig,
    pub par2:    Par2Config,
    pub cleanup: CleanupConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    pub output_dir:       PathBuf,
    pub level:            i32,
    pub threads:          u32,
    pub long_mode:        bool,
    pub recovery_percent: u8,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            output_dir:       PathBuf::from("processed"),
            level:            19,
            threads:          0,
            long_mode:        true,
            recovery_percent: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Par2Config {
    pub binary:               String,
    pub timeout_secs:         u64,
    pub version_timeout_secs: u64,
    pub slice_size:           u64,
}

impl Default for Par2Config {
    fn default() -> Self {
        Self {
            binary:               "par2".to_string(),
            timeout_secs:         3600,
            version_timeout_secs: 5,
            slice_size:           1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    pub temp_prefix:         String,
    pub orphan_max_age_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            temp_prefix:         coldstore_fs::DEFAULT_PREFIX.to_string(),
            orphan_max_age_secs: coldstore_fs::DEFAULT_ORPHAN_AGE.as_secs(),
        }
    }
}

impl Config {
    /// Defaults, or the validated contents of `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_level(self.pack.level)?;
        validate_recovery_percent(self.pack.recovery_percent)?;
        if self.par2.slice_size == 0 || self.par2.slice_size % 4 != 0 {
            return Err(invalid(format!(
                "par2.slice_size must be a positive multiple of 4, got {}",
                self.par2.slice_size
            )));
        }
        if self.par2.timeout_secs == 0 || self.par2.version_timeout_secs == 0 {
            return Err(invalid("par2 timeouts must be positive"));
        }
        if self.cleanup.temp_prefix.is_empty() {
            return Err(invalid("cleanup.temp_prefix must not be empty"));
        }
        Ok(())
    }

    pub fn compression(&self) -> CompressionParameters {
        CompressionParameters {
            level:     self.pack.level,
            threads:   self.pack.threads,
            long_mode: self.pack.long_mode,
        }
    }

    pub fn par2_settings(&self) -> Par2Settings {
        Par2Settings {
            binary:           self.par2.binary.clone(),
            recovery_percent: self.pack.recovery_percent,
            slice_size:       self.par2.slice_size,
            timeout:          Duration::from_secs(self.par2.timeout_secs),
            version_timeout:  Duration::from_secs(self.par2.version_timeout_secs),
        }
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions::new()
            .prefix(self.cleanup.temp_prefix.clone())
            .orphan_age(Duration::from_secs(self.cleanup.orphan_max_age_secs))
    }
}

pub fn validate_level(level: i32) -> Result<()> {
    if LEVEL_RANGE.contains(&level) {
        Ok(())
    } else {
        Err(invalid(format!(
            "compression level must be within {}..={}, got {level}",
            LEVEL_RANGE.start(),
            LEVEL_RANGE.end()
        )))
    }
}

pub fn validate_recovery_percent(percent: u8) -> Result<()> {
    if (1..=100).contains(&percent) {
        Ok(())
    } else {
        Err(invalid(format!("recovery percent must be within 1..=100, got {percent}")))
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        reason: reason.into(),
    }
}
