use std::io;
use std::path::Path;

use sevenz_rust::{Password, SevenZReader};

use super::{Extraction, corrupted};
use crate::entry::{ArchiveEntry, ExtractReport};
use crate::error::{Error, Result};

pub(crate) fn list(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let reader = SevenZReader::open(path, Password::empty()).map_err(|e| corrupted(path, e))?;
    let entries = reader
        .archive()
        .files
        .iter()
        .filter(|f| !f.is_anti_item)
        .map(|f| {
            if f.is_directory() {
                ArchiveEntry::directory(f.name())
            } else {
                ArchiveEntry::file(f.name(), f.size()).with_compressed_size(f.compressed_size)
            }
        })
        .collect();
    Ok(entries)
}

pub(crate) fn extract(path: &Path, mut ex: Extraction<'_>) -> Result<ExtractReport> {
    let mut reader = SevenZReader::open(path, Password::empty()).map_err(|e| corrupted(path, e))?;
    let mut failure: Option<Error> = None;

    reader
        .for_each_entries(|entry, rd| {
            let outcome = match ex.resolve(entry.name()) {
                Some(target) if entry.is_directory() => ex.directory(&target),
                Some(target) => ex.file(&target, rd).map(|_| ()),
                None => Ok(()),
            };
            // Solid blocks share one decoder; unread data must be consumed.
            if let Err(err) = io::copy(rd, &mut io::sink()) {
                tracing::debug!(entry = entry.name(), %err, "could not drain entry data");
            }
            match outcome {
                Ok(()) => Ok(true),
                Err(err) => {
                    failure = Some(err);
                    Ok(false)
                }
            }
        })
        .map_err(|e| corrupted(path, e))?;

    match failure {
        Some(err) => Err(err),
        None => Ok(ex.finish()),
    }
}
