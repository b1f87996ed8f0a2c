use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// `Target: "name" - status.` lines of verify and repair output.
static TARGET_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*Target:\s*"?(?P<name>[^"]*?)"?\s+-\s+(?P<status>found|missing|damaged|repaired)"#)
        .expect("static regex")
});

/// Parsed result of `par2 verify`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Par2Verification {
    pub success:        bool,
    pub exit_code:      Option<i32>,
    pub files_verified: usize,
    pub files_missing:  usize,
    pub files_damaged:  usize,
    pub repairable:     bool,
    pub stdout:         String,
    pub stderr:         String,
}

impl Par2Verification {
    /// Exit status 0 is intact, 1 damaged but repairable, 2 beyond repair.
    pub fn from_output(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let mut parsed = Self {
            success: exit_code == Some(0),
            exit_code,
            ..Self::default()
        };
        for caps in TARGET_LINE.captures_iter(&stdout) {
            parsed.files_verified += 1;
            match &caps["status"] {
                "missing" => parsed.files_missing += 1,
                "damaged" => parsed.files_damaged += 1,
                _ => {}
            }
        }
        let lower = stdout.to_lowercase();
        let not_possible = lower.contains("repair is not possible");
        parsed.repairable = exit_code == Some(1)
            || lower.contains("repair is possible")
            || (lower.contains("repair is required") && !not_possible);
        if not_possible || exit_code == Some(2) {
            parsed.repairable = false;
        }
        parsed.stdout = stdout;
        parsed.stderr = stderr;
        parsed
    }

    pub fn is_intact(&self) -> bool { self.success && self.files_missing == 0 && self.files_damaged == 0 }

    /// `Ok` when intact, otherwise the missing and damaged counts as an error.
    pub fn into_result(self) -> Result<Self> {
        if self.is_intact() {
            Ok(self)
        } else {
            Err(Error::VerificationFailed {
                missing: self.files_missing,
                damaged: self.files_damaged,
            })
        }
    }
}

/// Parsed result of `par2 repair`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Par2Repair {
    pub success:        bool,
    pub files_repaired: usize,
    pub stdout:         String,
    pub stderr:         String,
}

impl Par2Repair {
    pub fn from_output(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let success = exit_code == Some(0);
        // Files listed after the repair are the ones rewritten.
        let files_repaired = match stdout.find("Verifying repaired files") {
            Some(idx) if success => TARGET_LINE.captures_iter(&stdout[idx..]).count(),
            _ => 0,
        };
        Self {
            success,
            files_repaired,
            stdout,
            stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTACT: &str = r#"par2cmdline-turbo version 1.1.1
Loading "backup.tar.zst.par2".
Loaded 4 new packets
There are 1 recoverable files and 0 other files.

Verifying source files:

Target: "backup.tar.zst" - found.

All files are correct, repair is not required.
"#;

    const DAMAGED: &str = r#"Verifying source files:

Target: "backup.tar.zst" - damaged. Found 97 of 100 data blocks.

Scanning extra files:

Repair is required.
1 file(s) exist but are damaged.
You have 97 out of 100 data blocks available.
You have 10 recovery blocks available.
Repair is possible.
"#;

    const HOPELESS: &str = r#"Target: "backup.tar.zst" - missing.

Repair is required.
1 file(s) are missing.
You have 0 out of 100 data blocks available.
You have 10 recovery blocks available.
Repair is not possible.
You need 90 more recovery blocks to be able to repair.
"#;

    const REPAIRED: &str = r#"Target: "backup.tar.zst" - damaged. Found 97 of 100 data blocks.

Repair is possible.
Wrote 104857600 bytes to disk

Verifying repaired files:

Target: "backup.tar.zst" - found.

Repair complete.
"#;

    #[test]
    fn intact_output() {
        let v = Par2Verification::from_output(Some(0), INTACT.into(), String::new());
        assert!(v.is_intact());
        assert_eq!(v.files_verified, 1);
        assert!(!v.repairable);
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn damaged_but_repairable() {
        let v = Par2Verification::from_output(Some(1), DAMAGED.into(), String::new());
        assert!(!v.is_intact());
        assert_eq!((v.files_verified, v.files_missing, v.files_damaged), (1, 0, 1));
        assert!(v.repairable);
        assert!(matches!(
            v.into_result(),
            Err(Error::VerificationFailed { missing: 0, damaged: 1 })
        ));
    }

    #[test]
    fn not_repairable() {
        let v = Par2Verification::from_output(Some(2), HOPELESS.into(), String::new());
        assert_eq!(v.files_missing, 1);
        assert!(!v.repairable);
    }

    #[test]
    fn exit_code_alone_marks_repairable() {
        let v = Par2Verification::from_output(Some(1), String::new(), String::new());
        assert!(v.repairable);
    }

    #[test]
    fn repair_counts_rewritten_files() {
        let r = Par2Repair::from_output(Some(0), REPAIRED.into(), String::new());
        assert!(r.success);
        assert_eq!(r.files_repaired, 1);

        let failed = Par2Repair::from_output(Some(2), HOPELESS.into(), String::new());
        assert_eq!(failed.files_repaired, 0);
    }
}
