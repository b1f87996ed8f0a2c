use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use coldstore_archive::{ExtractReport, unpack_tar};
use tar::{Archive, EntryType};

use crate::error::{Error, Result};

/// Entry counts gathered by walking a whole tar stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TarSummary {
    pub files:      usize,
    pub folders:    usize,
    pub total_size: u64,
}

/// Read every header and drain every entry body of a tar stream.
pub fn scan_tar<R: Read>(reader: R) -> io::Result<TarSummary> {
    let mut summary = TarSummary::default();
    let mut archive = Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type() == EntryType::Directory {
            summary.folders += 1;
        } else {
            summary.files += 1;
            summary.total_size += entry.size();
        }
        io::copy(&mut entry, &mut io::sink())?;
    }
    Ok(summary)
}

/// [`scan_tar`] over a tar file.
pub fn check_tar_readable(path: &Path) -> Result<TarSummary> {
    File::open(path)
        .map(BufReader::new)
        .and_then(scan_tar)
        .map_err(|source| Error::UnreadableTar {
            path: path.to_path_buf(),
            source,
        })
}

/// Unpack a tar file under `dest` with the traversal guard.
pub fn unpack_tar_file(path: &Path, dest: &Path) -> Result<ExtractReport> {
    let file = File::open(path).map_err(|source| Error::UnreadableTar {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(unpack_tar(BufReader::new(file), path, dest)?)
}
