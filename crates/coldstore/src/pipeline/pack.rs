use std::fs;
use std::path::{Path, PathBuf};

use coldstore_archive::{ArchiveAnalyzer, detect_format};
use coldstore_codec::{CompressionReport, DeterministicSerializer, SerializeReport, check_tar_readable};
use coldstore_verify::FileDigests;

use super::Context;
use crate::error::{Error, Result};
use crate::layout::{LayoutMode, OutputLayout};

#[derive(Clone, Debug)]
pub struct PackOptions {
    pub input:      PathBuf,
    pub output_dir: PathBuf,
    pub mode:       LayoutMode,
    /// Tar readability, frame header and digest sidecars.
    pub check:      bool,
    pub par2:       bool,
}

impl PackOptions {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input:      input.into(),
            output_dir: output_dir.into(),
            mode:       LayoutMode::Organized,
            check:      true,
            par2:       true,
        }
    }
}

#[derive(Debug)]
pub struct PackSummary {
    pub layout:         OutputLayout,
    pub serialized:     SerializeReport,
    pub compression:    CompressionReport,
    pub digests:        Option<FileDigests>,
    pub recovery_files: Vec<PathBuf>,
}

impl PackSummary {
    /// Every file the run left in the output directory.
    pub fn outputs(&self) -> Vec<PathBuf> {
        let mut outputs = vec![self.layout.artifact()];
        if self.digests.is_some() {
            outputs.push(self.layout.sha256());
            outputs.push(self.layout.blake3());
        }
        outputs.extend(self.recovery_files.iter().cloned());
        outputs
    }
}

/// Pack an archive, plain file or directory into a verified `.tar.zst`.
///
/// Any failure after the layout is resolved removes the outputs produced
/// so far.
pub fn pack(ctx: &Context, opts: &PackOptions) -> Result<PackSummary> {
    if !opts.input.exists() {
        return Err(Error::InputMissing {
            path: opts.input.clone(),
        });
    }
    ctx.preflight
        .before_pack(&opts.input, &opts.output_dir, ctx.config.pack.long_mode)?;

    let layout = OutputLayout::for_input(&opts.input, &opts.output_dir, opts.mode);
    let existing = layout.existing();
    if !existing.is_empty() {
        return Err(Error::OutputExists { paths: existing });
    }
    let created_dir = !layout.dir().exists();
    fs::create_dir_all(layout.dir()).map_err(|source| Error::Io {
        context: "cannot create output directory",
        path: layout.dir().to_path_buf(),
        source,
    })?;

    // An interrupt tears the tracker down before `run` can return.
    let pending = layout.clone();
    ctx.tracker.add_callback(PARTIAL_OUTPUTS, move || {
        tracing::warn!("pack interrupted, removing partial outputs");
        discard_partial(&pending, created_dir);
    });

    let result = run(ctx, opts, &layout);
    ctx.tracker.remove_callback(PARTIAL_OUTPUTS);
    match result {
        Ok(summary) => {
            log_summary(&summary);
            Ok(summary)
        }
        Err(err) => {
            tracing::error!(%err, "pack failed, removing partial outputs");
            discard_partial(&layout, created_dir);
            Err(err)
        }
    }
}

const PARTIAL_OUTPUTS: &str = "partial pack outputs";

fn discard_partial(layout: &OutputLayout, created_dir: bool) {
    layout.cleanup_partial();
    if !created_dir {
        return;
    }
    if let Err(err) = fs::remove_dir(layout.dir()) {
        tracing::debug!(%err, dir = %layout.dir().display(), "output directory kept");
    }
}

fn run(ctx: &Context, opts: &PackOptions, layout: &OutputLayout) -> Result<PackSummary> {
    let (source, staging) = stage(ctx, &opts.input)?;
    let tar = ctx.tracker.temp_file("tar", ".tar")?;

    let serialized = serialize(ctx, &source, &tar);
    if let Some(staging) = &staging {
        ctx.release(staging);
    }
    let serialized = match serialized {
        Ok(report) => report,
        Err(err) => {
            ctx.release(&tar);
            return Err(err);
        }
    };

    let compressed = compress(ctx, opts, &tar, layout);
    ctx.release(&tar);
    let compression = compressed?;

    let digests = if opts.check {
        Some(coldstore_verify::generate_and_persist(layout.artifact())?)
    } else {
        None
    };

    let recovery_files = if opts.par2 {
        tracing::info!(artifact = %layout.artifact().display(), "generating PAR2 recovery data");
        ctx.backend.generate(&layout.artifact())?
    } else {
        tracing::info!("PAR2 generation skipped");
        Vec::new()
    };

    Ok(PackSummary {
        layout: layout.clone(),
        serialized,
        compression,
        digests,
        recovery_files,
    })
}

/// Directory or file to serialize, plus the staging directory to release
/// afterwards when the input had to be extracted first.
fn stage(ctx: &Context, input: &Path) -> Result<(PathBuf, Option<PathBuf>)> {
    if input.is_dir() || detect_format(input).is_none() {
        if input.is_file() {
            tracing::info!(input = %input.display(), "not a recognised archive, packing as a single file");
        }
        return Ok((input.to_path_buf(), None));
    }

    let analyzer = ArchiveAnalyzer::new();
    let info = analyzer.try_analyze(input)?;
    let staging = ctx.tracker.temp_dir("extract")?;
    let task = ctx.progress.add_task("extract", None);
    let report = analyzer.extract(input, &staging);
    ctx.progress.complete(task);
    match report {
        Ok(report) => {
            tracing::info!(
                files = report.files,
                directories = report.directories,
                skipped = report.skipped.len(),
                renamed = report.renamed.len(),
                "archive extracted"
            );
            Ok((analyzer.handle_nested_structure(&staging, &info), Some(staging)))
        }
        Err(err) => {
            ctx.release(&staging);
            Err(err.into())
        }
    }
}

fn serialize(ctx: &Context, source: &Path, tar: &Path) -> Result<SerializeReport> {
    let task = ctx.progress.add_task("serialize", None);
    let report = DeterministicSerializer::new().serialize(source, tar);
    ctx.progress.complete(task);
    Ok(report?)
}

fn compress(ctx: &Context, opts: &PackOptions, tar: &Path, layout: &OutputLayout) -> Result<CompressionReport> {
    if opts.check {
        let summary = check_tar_readable(tar)?;
        tracing::info!(files = summary.files, folders = summary.folders, "tar readable");
    }

    let engine = ctx.engine();
    let total = fs::metadata(tar).map(|m| m.len()).ok();
    let task = ctx.progress.add_task("compress", total);
    let report = engine.compress_with_progress(tar, &layout.artifact(), |n| ctx.progress.advance(task, n));
    ctx.progress.complete(task);
    let report = report?;

    if opts.check {
        let header = engine.check_header(&layout.artifact())?;
        if header.window_log() != report.window_log {
            return Err(coldstore_codec::Error::InvalidFrame {
                path:   layout.artifact(),
                reason: format!(
                    "header records window log {}, compressed with {}",
                    header.window_log(),
                    report.window_log
                ),
            }
            .into());
        }
    }
    Ok(report)
}

fn log_summary(summary: &PackSummary) {
    let integrity: Vec<String> = summary
        .outputs()
        .iter()
        .skip(1)
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    tracing::info!(
        original_bytes = summary.serialized.bytes,
        compressed_bytes = summary.compression.output_size,
        files = summary.serialized.files,
        directories = summary.serialized.directories,
        "packed {} ({:.1}% saved)",
        summary.layout.artifact().display(),
        summary.compression.space_saving_percent()
    );
    if integrity.is_empty() {
        tracing::warn!("no integrity files produced");
    } else {
        tracing::info!(files = %integrity.join(", "), "integrity files");
    }
}
