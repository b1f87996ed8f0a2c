//! Single compressed files (`.gz`, `.bz2`, `.xz`) exposed as one-entry archives.

use std::io;
use std::path::Path;

use super::{Extraction, corrupted, open_file, wrap_reader};
use crate::entry::{ArchiveEntry, ExtractReport};
use crate::error::Result;
use crate::format::Compression;

const FALLBACK_NAME: &str = "extracted_file";

fn member_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// The decompressed size is only known after a full decode.
pub(crate) fn list(path: &Path, codec: Compression) -> Result<Vec<ArchiveEntry>> {
    let mut decoder = wrap_reader(open_file(path)?, codec);
    let size = io::copy(&mut decoder, &mut io::sink()).map_err(|e| corrupted(path, e))?;
    Ok(vec![ArchiveEntry::file(member_name(path), size)])
}

pub(crate) fn extract(path: &Path, codec: Compression, mut ex: Extraction<'_>) -> Result<ExtractReport> {
    let name = member_name(path);
    let Some(target) = ex.resolve(&name) else {
        return Ok(ex.finish());
    };
    let mut decoder = wrap_reader(open_file(path)?, codec);
    ex.file(&target, &mut decoder)?;
    Ok(ex.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn member_name_is_stem() {
        assert_eq!(member_name(Path::new("/data/report.csv.gz")), "report.csv");
        assert_eq!(member_name(Path::new("dump.xz")), "dump");
    }

    #[test]
    fn lists_decompressed_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt.gz");
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&[b'z'; 4096]).unwrap();
        std::fs::write(&path, enc.finish().unwrap()).unwrap();

        let entries = list(&path, Compression::Gzip).unwrap();
        assert_eq!(entries, vec![ArchiveEntry::file("notes.txt", 4096)]);
    }

    #[test]
    fn truncated_stream_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xz");
        std::fs::write(&path, [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00]).unwrap();
        assert!(matches!(list(&path, Compression::Xz), Err(crate::Error::Corrupted { .. })));
    }
}
