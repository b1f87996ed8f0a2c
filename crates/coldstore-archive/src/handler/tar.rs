use std::io::{self, Read};
use std::path::Path;

use tar::{Archive, EntryType};

use super::{Extraction, apply_executable, corrupted, open_file, wrap_reader};
use crate::entry::{ArchiveEntry, ExtractReport};
use crate::error::Result;
use crate::format::Compression;

pub(crate) fn list(path: &Path, codec: Compression) -> Result<Vec<ArchiveEntry>> {
    let mut archive = Archive::new(wrap_reader(open_file(path)?, codec));
    let mut entries = Vec::new();
    for entry in archive.entries().map_err(|e| corrupted(path, e))? {
        let entry = entry.map_err(|e| corrupted(path, e))?;
        let name = entry_name(&entry).map_err(|e| corrupted(path, e))?;
        let header = entry.header();
        match header.entry_type() {
            EntryType::Directory => entries.push(ArchiveEntry::directory(name)),
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                entries.push(ArchiveEntry::file(name, entry.size()))
            }
            EntryType::Symlink | EntryType::Link => entries.push(ArchiveEntry::file(name, 0)),
            other => tracing::trace!(entry = %name, kind = ?other, "not listed"),
        }
    }
    Ok(entries)
}

pub(crate) fn extract(path: &Path, codec: Compression, dest: &Path) -> Result<ExtractReport> {
    unpack_tar(wrap_reader(open_file(path)?, codec), path, dest)
}

/// Unpack a plain tar stream under `dest`.
///
/// `source` only names the stream in errors. Entries escaping `dest` are
/// skipped, regular files and directories are materialized and relative
/// symlinks that stay inside the tree are recreated on unix.
pub fn unpack_tar<R: Read>(reader: R, source: &Path, dest: &Path) -> Result<ExtractReport> {
    let mut archive = Archive::new(reader);
    let mut ex = Extraction::new(dest);
    for entry in archive.entries().map_err(|e| corrupted(source, e))? {
        let mut entry = entry.map_err(|e| corrupted(source, e))?;
        let raw = entry_name(&entry).map_err(|e| corrupted(source, e))?;
        let Some(target) = ex.resolve(&raw) else {
            continue;
        };
        let kind = entry.header().entry_type();
        match kind {
            EntryType::Directory => ex.directory(&target)?,
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                let mode = entry.header().mode().ok();
                ex.file(&target, &mut entry)?;
                apply_executable(&target, mode);
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(|e| corrupted(source, e))?
                    .map(|l| l.into_owned());
                match link {
                    Some(link) if is_contained_link(&link) => create_symlink(&mut ex, &raw, &link, &target)?,
                    _ => ex.skip(&raw, "symlink target leaves the archive"),
                }
            }
            _ => ex.skip(&raw, "unsupported entry type"),
        }
    }
    Ok(ex.finish())
}

fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> io::Result<String> {
    Ok(entry.path()?.to_string_lossy().replace('\\', "/"))
}

fn is_contained_link(link: &Path) -> bool {
    link.is_relative() && !link.components().any(|c| matches!(c, std::path::Component::ParentDir))
}

#[cfg(unix)]
fn create_symlink(ex: &mut Extraction<'_>, _raw: &str, link: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        super::ensure_dir(parent)?;
    }
    std::os::unix::fs::symlink(link, target).map_err(|source| crate::Error::ExtractionFailed {
        path: target.to_path_buf(),
        source,
    })?;
    ex.report.files += 1;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(ex: &mut Extraction<'_>, raw: &str, _link: &Path, _target: &Path) -> Result<()> {
    ex.skip(raw, "symlinks are not materialized on this platform");
    Ok(())
}
