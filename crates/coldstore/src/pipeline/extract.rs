use std::fs;
use std::path::{Path, PathBuf};

use coldstore_archive::ExtractReport;
use coldstore_codec::{check_tar_readable, read_frame_header, unpack_tar_file, window_memory_mb};

use super::Context;
use super::verify::{require_artifact, verify};
use crate::error::{Error, Result};
use crate::layout::artifact_base;
use crate::report::{Aggregate, VerificationReport};

#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub archive:    PathBuf,
    pub output_dir: PathBuf,
    pub force:      bool,
    /// Verify before extracting.
    pub check:      bool,
}

impl ExtractOptions {
    pub fn new(archive: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive:    archive.into(),
            output_dir: output_dir.into(),
            force:      false,
            check:      true,
        }
    }
}

#[derive(Debug)]
pub struct ExtractSummary {
    pub destination:  PathBuf,
    pub report:       ExtractReport,
    pub verification: Option<VerificationReport>,
}

/// Unpack `<archive>` into `<output_dir>/<base>`.
pub fn extract(ctx: &Context, opts: &ExtractOptions) -> Result<ExtractSummary> {
    require_artifact(&opts.archive)?;
    let base = artifact_base(&opts.archive).ok_or_else(|| Error::NotAnArtifact {
        path: opts.archive.clone(),
    })?;
    let destination = opts.output_dir.join(base);

    let header = read_frame_header(&opts.archive)?;
    ctx.preflight
        .before_extract(&opts.archive, &opts.output_dir, window_memory_mb(header.window_log()))?;

    if !opts.force && !is_empty_dir(&destination)? {
        return Err(Error::DestinationNotEmpty { path: destination });
    }

    let verification = if opts.check {
        let report = verify(ctx, &opts.archive)?;
        if report.aggregate() == Aggregate::Failed {
            return Err(Error::VerificationFailed {
                path:   opts.archive.clone(),
                checks: report.failed(),
            });
        }
        Some(report)
    } else {
        tracing::info!("verification skipped");
        None
    };

    fs::create_dir_all(&destination).map_err(|source| Error::Io {
        context: "cannot create extract directory",
        path: destination.clone(),
        source,
    })?;

    let tar = ctx.tracker.temp_file("decompress", ".tar")?;
    let report = unpack(ctx, &opts.archive, &tar, &destination);
    ctx.release(&tar);
    let report = report?;

    tracing::info!(
        destination = %destination.display(),
        files = report.files,
        directories = report.directories,
        skipped = report.skipped.len(),
        "extraction finished"
    );
    Ok(ExtractSummary {
        destination,
        report,
        verification,
    })
}

fn unpack(ctx: &Context, archive: &Path, tar: &Path, destination: &Path) -> Result<ExtractReport> {
    let total = fs::metadata(archive).map(|m| m.len()).ok();
    let task = ctx.progress.add_task("decompress", total);
    let written = ctx.engine().decompress(archive, tar);
    ctx.progress.complete(task);
    let written = written?;
    tracing::debug!(bytes = written, "tar restored");

    let summary = check_tar_readable(tar)?;
    tracing::info!(files = summary.files, folders = summary.folders, "tar readable");

    let task = ctx.progress.add_task("unpack", Some(summary.total_size));
    let report = unpack_tar_file(tar, destination);
    if let Ok(report) = &report {
        ctx.progress.advance(task, report.bytes);
    }
    ctx.progress.complete(task);
    Ok(report?)
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(source) => Err(Error::Io {
            context: "cannot inspect extract directory",
            path: path.to_path_buf(),
            source,
        }),
    }
}
