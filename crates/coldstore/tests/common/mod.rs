#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use coldstore::Config;
use coldstore::pipeline::Context;
use coldstore::preflight::PermissionsPreflight;
use coldstore::progress::NoProgress;
use coldstore_fs::{ResourceTracker, TrackerOptions};
use coldstore_par2::{Error, Par2Repair, Par2Verification, RecoveryBackend, Result};
use tempfile::TempDir;

/// In-process stand-in for the `par2` tool.
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub fail_generate: bool,
    /// Torn down when `generate` starts, as an interrupt would.
    pub interrupt:     Option<ResourceTracker>,
    pub verifications: Rc<RefCell<VecDeque<Par2Verification>>>,
    pub calls:         Rc<RefCell<Vec<&'static str>>>,
}

impl FakeBackend {
    pub fn scripted(verifications: Vec<Par2Verification>) -> Self {
        Self {
            verifications: Rc::new(RefCell::new(verifications.into())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> { self.calls.borrow().clone() }
}

impl RecoveryBackend for FakeBackend {
    fn version(&self) -> Result<String> { Ok("fake par2".into()) }

    fn generate(&self, artifact: &Path) -> Result<Vec<PathBuf>> {
        self.calls.borrow_mut().push("generate");
        if let Some(tracker) = &self.interrupt {
            tracker.teardown();
            return Ok(Vec::new());
        }
        let index = coldstore_par2::recovery_index_path(artifact);
        let volume = PathBuf::from(format!("{}.vol0+1.par2", artifact.display()));
        fs::write(&index, b"PAR2\0PKT").unwrap();
        fs::write(&volume, b"PAR2\0PKT").unwrap();
        if self.fail_generate {
            return Err(Error::GenerationFailed {
                artifact: artifact.to_path_buf(),
                stderr:   "disk full".into(),
            });
        }
        Ok(vec![index, volume])
    }

    fn verify(&self, _par2: &Path) -> Result<Par2Verification> {
        self.calls.borrow_mut().push("verify");
        Ok(self.verifications.borrow_mut().pop_front().unwrap_or_else(intact))
    }

    fn repair(&self, _par2: &Path) -> Result<Par2Repair> {
        self.calls.borrow_mut().push("repair");
        Ok(Par2Repair {
            success: true,
            files_repaired: 1,
            ..Par2Repair::default()
        })
    }
}

pub fn intact() -> Par2Verification {
    Par2Verification {
        success: true,
        exit_code: Some(0),
        files_verified: 1,
        ..Par2Verification::default()
    }
}

pub fn damaged(repairable: bool) -> Par2Verification {
    Par2Verification {
        success: false,
        exit_code: Some(if repairable { 1 } else { 2 }),
        files_verified: 1,
        files_damaged: 1,
        repairable,
        ..Par2Verification::default()
    }
}

/// Scratch space: inputs, outputs and a private temp root for the tracker.
pub struct Sandbox {
    pub root:      TempDir,
    pub temp_root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let temp_root = root.path().join("tmp");
        fs::create_dir(&temp_root).unwrap();
        Self { root, temp_root }
    }

    pub fn path(&self, rel: &str) -> PathBuf { self.root.path().join(rel) }

    pub fn context(&self, backend: FakeBackend) -> Context {
        let tracker = ResourceTracker::with_options(TrackerOptions::new().temp_root(&self.temp_root));
        Context::new(Config::default())
            .with_tracker(tracker)
            .with_backend(backend)
            .with_progress(NoProgress)
            .with_preflight(PermissionsPreflight)
    }

    /// `rel` populated with `files` (`path`, `contents`).
    pub fn tree(&self, rel: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.path(rel);
        for (name, contents) in files {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        dir
    }

    /// Names left in the tracker's temp root.
    pub fn leftovers(&self) -> Vec<String> {
        fs::read_dir(&self.temp_root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Text that compresses but is not trivially repetitive.
pub fn sample_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("line {i}: {}\n", i.wrapping_mul(2_654_435_761) % 1_000_003))
        .collect()
}
