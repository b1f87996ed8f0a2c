use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use coldstore_par2::{
    Error, Par2Repair, Par2Verification, RecoveryBackend, RecoveryOutcome, Result, recover,
};

/// Replays scripted verification results and records calls.
#[derive(Default)]
struct ScriptedBackend {
    verifications: RefCell<VecDeque<Par2Verification>>,
    calls:         RefCell<Vec<&'static str>>,
}

impl ScriptedBackend {
    fn with(verifications: Vec<Par2Verification>) -> Self {
        Self {
            verifications: RefCell::new(verifications.into()),
            calls:         RefCell::default(),
        }
    }

    fn calls(&self) -> Vec<&'static str> { self.calls.borrow().clone() }
}

impl RecoveryBackend for ScriptedBackend {
    fn version(&self) -> Result<String> { Ok("scripted".into()) }

    fn generate(&self, artifact: &Path) -> Result<Vec<PathBuf>> {
        self.calls.borrow_mut().push("generate");
        Ok(vec![artifact.with_extension("zst.par2")])
    }

    fn verify(&self, _par2: &Path) -> Result<Par2Verification> {
        self.calls.borrow_mut().push("verify");
        Ok(self.verifications.borrow_mut().pop_front().unwrap_or_default())
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

fn intact() -> Par2Verification {
    Par2Verification {
        success: true,
        exit_code: Some(0),
        files_verified: 1,
        ..Par2Verification::default()
    }
}

fn damaged(repairable: bool) -> Par2Verification {
    Par2Verification {
        success: false,
        exit_code: Some(if repairable { 1 } else { 2 }),
        files_verified: 1,
        files_damaged: 1,
        repairable,
        ..Par2Verification::default()
    }
}

#[test]
fn intact_needs_no_repair() {
    let backend = ScriptedBackend::with(vec![intact()]);
    let outcome = recover(&backend, Path::new("a.tar.zst.par2")).unwrap();
    assert!(matches!(outcome, RecoveryOutcome::Intact(_)));
    assert_eq!(backend.calls(), ["verify"]);
}

#[test]
fn repairable_damage_is_repaired_and_reverified() {
    let backend = ScriptedBackend::with(vec![damaged(true), intact()]);
    let outcome = recover(&backend, Path::new("a.tar.zst.par2")).unwrap();
    match outcome {
        RecoveryOutcome::Repaired { before, repair, after } => {
            assert_eq!(before.files_damaged, 1);
            assert_eq!(repair.files_repaired, 1);
            assert!(after.is_intact());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(backend.calls(), ["verify", "repair", "verify"]);
}

#[test]
fn unrepairable_damage_never_attempts_repair() {
    let backend = ScriptedBackend::with(vec![damaged(false)]);
    let err = recover(&backend, Path::new("a.tar.zst.par2")).unwrap_err();
    assert!(matches!(err, Error::RepairNotPossible { .. }));
    assert!(err.to_string().contains("restore from backup"));
    assert_eq!(backend.calls(), ["verify"]);
}

#[test]
fn failed_reverification_is_an_error() {
    let backend = ScriptedBackend::with(vec![damaged(true), damaged(true)]);
    let err = recover(&backend, Path::new("a.tar.zst.par2")).unwrap_err();
    assert!(matches!(err, Error::VerificationFailed { missing: 0, damaged: 1 }));
}
