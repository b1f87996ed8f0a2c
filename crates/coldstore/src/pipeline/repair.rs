use std::path::PathBuf;

use coldstore_par2::{Par2Verification, RecoveryOutcome, recover, recovery_index_path};

use super::Context;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct RepairOptions {
    /// The artifact or its `.par2` index.
    pub target:      PathBuf,
    pub verify_only: bool,
}

#[derive(Debug)]
pub enum RepairOutcome {
    Recovered(RecoveryOutcome),
    /// `verify_only` found damage and left it alone.
    Damaged(Par2Verification),
}

impl RepairOutcome {
    pub fn is_healthy(&self) -> bool { matches!(self, RepairOutcome::Recovered(_)) }
}

pub fn repair(ctx: &Context, opts: &RepairOptions) -> Result<RepairOutcome> {
    let index = recovery_index_path(&opts.target);
    if !index.is_file() {
        return Err(coldstore_par2::Error::MissingRecoveryFile { path: index }.into());
    }
    match ctx.backend.version() {
        Ok(version) => tracing::info!(%version, "using recovery tool"),
        Err(err @ coldstore_par2::Error::ToolUnavailable { .. }) => return Err(Error::Par2(err)),
        Err(err) => tracing::warn!(%err, "could not determine recovery tool version"),
    }

    if opts.verify_only {
        let verification = ctx.backend.verify(&index)?;
        tracing::info!(
            verified = verification.files_verified,
            missing = verification.files_missing,
            damaged = verification.files_damaged,
            repairable = verification.repairable,
            "verification finished"
        );
        return Ok(if verification.is_intact() {
            RepairOutcome::Recovered(RecoveryOutcome::Intact(verification))
        } else {
            RepairOutcome::Damaged(verification)
        });
    }

    let outcome = recover(ctx.backend.as_ref(), &index)?;
    if let RecoveryOutcome::Repaired { repair, .. } = &outcome {
        tracing::info!(repaired = repair.files_repaired, "artifact repaired and verified");
    }
    Ok(RepairOutcome::Recovered(outcome))
}
