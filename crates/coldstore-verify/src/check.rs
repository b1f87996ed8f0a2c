use std::fmt;

/// Result of one integrity check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The check could not run, e.g. its sidecar is missing.
    Indeterminate,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Passed => "PASSED",
            CheckStatus::Failed => "FAILED",
            CheckStatus::Indeterminate => "INDETERMINATE",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckOutcome {
    pub fn passed(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Passed,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Failed,
            detail: detail.into(),
        }
    }

    pub fn indeterminate(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Indeterminate,
            detail: detail.into(),
        }
    }
}
