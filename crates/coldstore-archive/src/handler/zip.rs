use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use zip::ZipArchive;

use super::{Extraction, apply_executable, corrupted, open_file};
use crate::entry::{ArchiveEntry, ExtractReport};
use crate::error::Result;

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    ZipArchive::new(open_file(path)?).map_err(|e| corrupted(path, e))
}

pub(crate) fn list(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut archive = open(path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index(i).map_err(|e| corrupted(path, e))?;
        let entry = if file.is_dir() {
            ArchiveEntry::directory(file.name())
        } else {
            ArchiveEntry::file(file.name(), file.size()).with_compressed_size(file.compressed_size())
        };
        entries.push(entry);
    }
    Ok(entries)
}

pub(crate) fn extract(path: &Path, mut ex: Extraction<'_>) -> Result<ExtractReport> {
    let mut archive = open(path)?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| corrupted(path, e))?;
        let name = file.name().to_string();
        let Some(target) = ex.resolve(&name) else {
            continue;
        };
        if file.is_dir() {
            ex.directory(&target)?;
        } else {
            let mode = file.unix_mode();
            ex.file(&target, &mut file)?;
            apply_executable(&target, mode);
        }
    }
    Ok(ex.finish())
}
