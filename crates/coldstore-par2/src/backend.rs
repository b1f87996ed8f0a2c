use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::parse::{Par2Repair, Par2Verification};

/// Forward-error-correction capability the pipelines depend on.
pub trait RecoveryBackend {
    /// Human-readable tool description, e.g. its version banner.
    fn version(&self) -> Result<String>;

    /// Create recovery files next to `artifact` and return them sorted.
    fn generate(&self, artifact: &Path) -> Result<Vec<PathBuf>>;

    fn verify(&self, par2: &Path) -> Result<Par2Verification>;

    fn repair(&self, par2: &Path) -> Result<Par2Repair>;
}

/// Outcome of [`recover`].
#[derive(Debug)]
pub enum RecoveryOutcome {
    Intact(Par2Verification),
    Repaired {
        before: Par2Verification,
        repair: Par2Repair,
        after:  Par2Verification,
    },
}

/// Verify and, when the damage is repairable, repair and re-verify.
///
/// Damage that cannot be repaired is never retried.
pub fn recover(backend: &dyn RecoveryBackend, par2: &Path) -> Result<RecoveryOutcome> {
    let before = backend.verify(par2)?;
    if before.is_intact() {
        tracing::info!(par2 = %par2.display(), files = before.files_verified, "all files intact");
        return Ok(RecoveryOutcome::Intact(before));
    }
    tracing::warn!(
        missing = before.files_missing,
        damaged = before.files_damaged,
        repairable = before.repairable,
        "damage detected"
    );
    if !before.repairable {
        return Err(Error::RepairNotPossible {
            par2: par2.to_path_buf(),
        });
    }

    let repair = backend.repair(par2)?;
    tracing::info!(repaired = repair.files_repaired, "repair finished, verifying again");
    let after = backend.verify(par2)?.into_result()?;
    Ok(RecoveryOutcome::Repaired { before, repair, after })
}

/// The `.par2` index for `path`: itself when it already ends in `.par2`,
/// otherwise `path` with `.par2` appended.
pub fn recovery_index_path(path: &Path) -> PathBuf {
    let is_index = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("par2"));
    if is_index {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".par2");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_path_resolution() {
        assert_eq!(
            recovery_index_path(Path::new("out/a.tar.zst")),
            PathBuf::from("out/a.tar.zst.par2")
        );
        assert_eq!(
            recovery_index_path(Path::new("out/a.tar.zst.par2")),
            PathBuf::from("out/a.tar.zst.par2")
        );
        assert_eq!(
            recovery_index_path(Path::new("out/A.TAR.ZST.PAR2")),
            PathBuf::from("out/A.TAR.ZST.PAR2")
        );
    }
}
