use std::fmt;

use coldstore_verify::{CheckOutcome, CheckStatus};
use tabled::Tabled;

use crate::ui::table::{FormatConfig, Formatter};

pub const ZSTD_INTEGRITY: &str = "zstd_integrity";
pub const SHA256: &str = "sha256";
pub const BLAKE3: &str = "blake3";
pub const TAR_READABILITY: &str = "tar_readability";
pub const PAR2: &str = "par2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Passed,
    Failed,
    /// Some checks could not run and none of the others failed.
    Incomplete,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregate::Passed => "PASSED",
            Aggregate::Failed => "FAILED",
            Aggregate::Incomplete => "INCOMPLETE",
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct VerificationReport {
    checks: Vec<(&'static str, CheckOutcome)>,
}

#[derive(Tabled)]
struct CheckRow {
    check:  &'static str,
    status: CheckStatus,
    detail: String,
}

impl VerificationReport {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, name: &'static str, outcome: CheckOutcome) {
        match outcome.status {
            CheckStatus::Passed => tracing::info!(check = name, "passed"),
            CheckStatus::Failed => tracing::error!(check = name, detail = %outcome.detail, "failed"),
            CheckStatus::Indeterminate => tracing::warn!(check = name, detail = %outcome.detail, "could not run"),
        }
        self.checks.push((name, outcome));
    }

    pub fn checks(&self) -> &[(&'static str, CheckOutcome)] { &self.checks }

    pub fn status_of(&self, name: &str) -> Option<CheckStatus> {
        self.checks
            .iter()
            .find(|(check, _)| *check == name)
            .map(|(_, outcome)| outcome.status)
    }

    pub fn failed(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|(_, outcome)| outcome.status == CheckStatus::Failed)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn aggregate(&self) -> Aggregate {
        let statuses = || self.checks.iter().map(|(_, outcome)| outcome.status);
        if statuses().any(|s| s == CheckStatus::Failed) {
            Aggregate::Failed
        } else if statuses().any(|s| s == CheckStatus::Indeterminate) {
            Aggregate::Incomplete
        } else {
            Aggregate::Passed
        }
    }

    pub fn render(&self) -> String {
        let rows = self.checks.iter().map(|(name, outcome)| CheckRow {
            check:  *name,
            status: outcome.status,
            detail: outcome.detail.clone(),
        });
        Formatter::table(
            rows,
            FormatConfig {
                header: Some("Verification".to_string()),
                footer: Some(format!("Overall: {}", self.aggregate())),
                ..Default::default()
            },
        )
        .to_string()
    }
}
