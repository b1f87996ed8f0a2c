use std::path::Path;

use coldstore_codec::scan_tar;
use coldstore_verify::{CheckOutcome, verify_against_sidecars};

use super::Context;
use crate::error::{Error, Result};
use crate::layout::is_artifact;
use crate::report::{BLAKE3, PAR2, SHA256, TAR_READABILITY, VerificationReport, ZSTD_INTEGRITY};

/// Reject anything that is not an existing `.tar.zst` before touching it.
pub(crate) fn require_artifact(path: &Path) -> Result<()> {
    if !is_artifact(path) {
        return Err(Error::NotAnArtifact {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(Error::InputMissing {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Run every integrity check against `artifact`.
///
/// Individual check failures land in the report; only an artifact that is
/// not a `.tar.zst` or does not exist is an `Err`.
pub fn verify(ctx: &Context, artifact: &Path) -> Result<VerificationReport> {
    require_artifact(artifact)?;
    tracing::info!(artifact = %artifact.display(), "verifying");
    let mut report = VerificationReport::new();

    let task = ctx.progress.add_task("verify", None);
    report.record(ZSTD_INTEGRITY, zstd_integrity(ctx, artifact));
    ctx.progress.advance(task, 1);

    match verify_against_sidecars(artifact) {
        Ok(sidecars) => {
            report.record(SHA256, sidecars.sha256);
            report.record(BLAKE3, sidecars.blake3);
        }
        Err(err) => {
            report.record(SHA256, CheckOutcome::failed(err.to_string()));
            report.record(BLAKE3, CheckOutcome::failed(err.to_string()));
        }
    }
    ctx.progress.advance(task, 1);

    report.record(TAR_READABILITY, tar_readability(ctx, artifact));
    ctx.progress.advance(task, 1);

    if let Some(outcome) = par2(ctx, artifact) {
        report.record(PAR2, outcome);
    }
    ctx.progress.complete(task);

    tracing::info!(status = %report.aggregate(), "verification finished");
    Ok(report)
}

/// Frame header first, then a full checksum-validating decode.
fn zstd_integrity(ctx: &Context, artifact: &Path) -> CheckOutcome {
    let engine = ctx.engine();
    let header = match engine.check_header(artifact) {
        Ok(header) => header,
        Err(err) => return CheckOutcome::failed(err.to_string()),
    };
    match engine.verify_stream(artifact) {
        Ok(bytes) => CheckOutcome::passed(format!("window log {}, {bytes} bytes decoded", header.window_log())),
        Err(err) => CheckOutcome::failed(err.to_string()),
    }
}

fn tar_readability(ctx: &Context, artifact: &Path) -> CheckOutcome {
    let decoder = match ctx.engine().open_decoder(artifact) {
        Ok((_, decoder)) => decoder,
        Err(err) => return CheckOutcome::failed(err.to_string()),
    };
    match scan_tar(decoder) {
        Ok(summary) => CheckOutcome::passed(format!(
            "{} files, {} folders, {} bytes",
            summary.files, summary.folders, summary.total_size
        )),
        Err(err) => CheckOutcome::failed(format!("tar stream unreadable: {err}")),
    }
}

/// `None` when the artifact has no recovery files.
fn par2(ctx: &Context, artifact: &Path) -> Option<CheckOutcome> {
    let index = coldstore_par2::recovery_index_path(artifact);
    if !index.is_file() {
        tracing::debug!(par2 = %index.display(), "no recovery data, skipping par2 check");
        return None;
    }
    let outcome = match ctx.backend.verify(&index) {
        Ok(verification) if verification.is_intact() => {
            CheckOutcome::passed(format!("{} files verified", verification.files_verified))
        }
        Ok(verification) => CheckOutcome::failed(format!(
            "{} missing, {} damaged, {}",
            verification.files_missing,
            verification.files_damaged,
            if verification.repairable { "repairable" } else { "not repairable" }
        )),
        Err(err @ coldstore_par2::Error::ToolUnavailable { .. }) => CheckOutcome::indeterminate(err.to_string()),
        Err(err) => CheckOutcome::failed(err.to_string()),
    };
    Some(outcome)
}
