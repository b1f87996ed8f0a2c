//! Per-format listing and extraction behind one closed dispatch enum.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::detect::detect_format;
use crate::entry::{ArchiveEntry, ArchiveInfo, ExtractReport};
use crate::error::{Error, Result};
use crate::format::{ArchiveFormat, Compression};
use crate::sanitize::{is_safe_entry_path, needs_windows_sanitization, normalize_entry_path, sanitize_entry};

pub mod rar;
mod sevenz;
mod stream;
pub mod tar;
mod zip;

/// One variant per supported container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveHandler {
    SevenZip(PathBuf),
    Zip(PathBuf),
    Rar(PathBuf),
    Tar(PathBuf, Compression),
    /// A single compressed file without a tar layer.
    Stream(PathBuf, Compression),
}

impl ArchiveHandler {
    /// Detect the format of `path` and pick the matching handler.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = detect_format(path).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        Ok(Self::for_format(path, format))
    }

    pub fn for_format(path: impl Into<PathBuf>, format: ArchiveFormat) -> Self {
        let path = path.into();
        match format {
            ArchiveFormat::SevenZip => ArchiveHandler::SevenZip(path),
            ArchiveFormat::Zip => ArchiveHandler::Zip(path),
            ArchiveFormat::Rar => ArchiveHandler::Rar(path),
            ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarXz => {
                ArchiveHandler::Tar(path, format.compression())
            }
            ArchiveFormat::Gzip | ArchiveFormat::Bzip2 | ArchiveFormat::Xz => {
                ArchiveHandler::Stream(path, format.compression())
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ArchiveHandler::SevenZip(p)
            | ArchiveHandler::Zip(p)
            | ArchiveHandler::Rar(p)
            | ArchiveHandler::Tar(p, _)
            | ArchiveHandler::Stream(p, _) => p,
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        match self {
            ArchiveHandler::SevenZip(_) => ArchiveFormat::SevenZip,
            ArchiveHandler::Zip(_) => ArchiveFormat::Zip,
            ArchiveHandler::Rar(_) => ArchiveFormat::Rar,
            ArchiveHandler::Tar(_, Compression::None) => ArchiveFormat::Tar,
            ArchiveHandler::Tar(_, Compression::Gzip) => ArchiveFormat::TarGz,
            ArchiveHandler::Tar(_, Compression::Bzip2) => ArchiveFormat::TarBz2,
            ArchiveHandler::Tar(_, Compression::Xz) => ArchiveFormat::TarXz,
            ArchiveHandler::Stream(_, Compression::Bzip2) => ArchiveFormat::Bzip2,
            ArchiveHandler::Stream(_, Compression::Xz) => ArchiveFormat::Xz,
            ArchiveHandler::Stream(_, _) => ArchiveFormat::Gzip,
        }
    }

    /// Safe entries with normalized paths.
    ///
    /// Absolute and `..` entries are dropped with a warning.
    pub fn try_list(&self) -> Result<Vec<ArchiveEntry>> {
        let raw = match self {
            ArchiveHandler::SevenZip(p) => sevenz::list(p)?,
            ArchiveHandler::Zip(p) => zip::list(p)?,
            ArchiveHandler::Rar(p) => rar::list(p)?,
            ArchiveHandler::Tar(p, codec) => tar::list(p, *codec)?,
            ArchiveHandler::Stream(p, codec) => stream::list(p, *codec)?,
        };
        Ok(retain_safe(raw))
    }

    /// [`try_list`](Self::try_list) that logs failures and yields nothing.
    pub fn list_contents(&self) -> Vec<ArchiveEntry> {
        self.try_list().unwrap_or_else(|err| {
            tracing::error!(archive = %self.path().display(), %err, "failed to list archive");
            Vec::new()
        })
    }

    /// Extract every safe entry below `dest`, creating it when missing.
    pub fn try_extract_all(&self, dest: impl AsRef<Path>) -> Result<ExtractReport> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest).map_err(|source| Error::DirectoryCreationFailed {
            path: dest.to_path_buf(),
            source,
        })?;
        tracing::info!(archive = %self.path().display(), dest = %dest.display(), format = %self.format(), "extracting");

        let report = match self {
            ArchiveHandler::SevenZip(p) => sevenz::extract(p, Extraction::new(dest))?,
            ArchiveHandler::Zip(p) => zip::extract(p, Extraction::new(dest))?,
            ArchiveHandler::Rar(p) => rar::extract(p, dest)?,
            ArchiveHandler::Tar(p, codec) => tar::extract(p, *codec, dest)?,
            ArchiveHandler::Stream(p, codec) => stream::extract(p, *codec, Extraction::new(dest))?,
        };
        tracing::info!(
            files = report.files,
            directories = report.directories,
            skipped = report.skipped.len(),
            renamed = report.renamed.len(),
            "extraction finished"
        );
        Ok(report)
    }

    /// [`try_extract_all`](Self::try_extract_all) reduced to success.
    pub fn extract_all(&self, dest: impl AsRef<Path>) -> bool {
        match self.try_extract_all(dest) {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(archive = %self.path().display(), %err, "extraction failed");
                false
            }
        }
    }

    pub fn info(&self) -> Result<ArchiveInfo> {
        let entries = self.try_list()?;
        let compressed_size = fs::metadata(self.path())
            .map_err(|source| Error::Read {
                path: self.path().to_path_buf(),
                source,
            })?
            .len();
        Ok(ArchiveInfo::summarize(self.format(), &entries, compressed_size))
    }
}

fn retain_safe(entries: Vec<ArchiveEntry>) -> Vec<ArchiveEntry> {
    entries
        .into_iter()
        .filter_map(|mut entry| {
            if !is_safe_entry_path(&entry.path) {
                tracing::warn!(entry = %entry.path, "ignoring unsafe archive entry");
                return None;
            }
            entry.path = normalize_entry_path(&entry.path);
            Some(entry)
        })
        .collect()
}

/// Decoder for `codec` layered over `reader`.
///
/// Multi-member gzip, bzip2 and xz streams are read to the end.
pub fn wrap_reader<'a, R: Read + 'a>(reader: R, codec: Compression) -> Box<dyn Read + 'a> {
    match codec {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
        Compression::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
        Compression::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
    }
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn corrupted(path: &Path, reason: impl ToString) -> Error {
    Error::Corrupted {
        path:   path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Destination-side state shared by the in-process extractors.
pub(crate) struct Extraction<'a> {
    dest:          &'a Path,
    windows_rules: bool,
    report:        ExtractReport,
}

impl<'a> Extraction<'a> {
    pub(crate) fn new(dest: &'a Path) -> Self {
        Self {
            dest,
            windows_rules: needs_windows_sanitization(),
            report: ExtractReport::default(),
        }
    }

    /// Target path for `raw`, or `None` when the entry must be skipped.
    pub(crate) fn resolve(&mut self, raw: &str) -> Option<PathBuf> {
        match sanitize_entry(self.dest, raw, self.windows_rules) {
            Some(sanitized) => {
                if sanitized.renamed() {
                    self.report
                        .renamed
                        .push((sanitized.original.clone(), sanitized.relative.clone()));
                }
                Some(sanitized.resolved)
            }
            None => {
                self.report.skipped.push(raw.to_string());
                None
            }
        }
    }

    pub(crate) fn skip(&mut self, raw: &str, reason: &str) {
        tracing::warn!(entry = raw, reason, "skipping entry");
        self.report.skipped.push(raw.to_string());
    }

    pub(crate) fn directory(&mut self, target: &Path) -> Result<()> {
        ensure_dir(target)?;
        self.report.directories += 1;
        Ok(())
    }

    pub(crate) fn file(&mut self, target: &Path, reader: &mut dyn Read) -> Result<u64> {
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        let written = File::create(target)
            .and_then(|mut out| io::copy(reader, &mut out))
            .map_err(|source| Error::ExtractionFailed {
                path: target.to_path_buf(),
                source,
            })?;
        tracing::trace!(path = %target.display(), bytes = written, "extracted");
        self.report.files += 1;
        self.report.bytes += written;
        Ok(written)
    }

    pub(crate) fn finish(self) -> ExtractReport { self.report }
}

pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Give extracted files whose stored mode is executable `0o755`.
pub(crate) fn apply_executable(_path: &Path, _mode: Option<u32>) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = _mode
            && mode & 0o111 != 0
            && let Err(err) = fs::set_permissions(_path, fs::Permissions::from_mode(0o755))
        {
            tracing::debug!(path = %_path.display(), %err, "could not set executable bit");
        }
    }
}
