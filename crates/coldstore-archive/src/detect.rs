use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::format::{ArchiveFormat, archive_suffix};

/// Bytes needed to reach the end of the tar `ustar` magic.
const PROBE_LEN: u64 = 512;

/// Format implied by the longest matching filename suffix.
pub fn detect_by_extension(path: &Path) -> Option<ArchiveFormat> {
    let name = path.file_name()?.to_string_lossy();
    archive_suffix(&name).map(|(fmt, _)| fmt)
}

/// Format implied by leading signature bytes.
///
/// Compressed streams are reported as their bare codec; whether a gzip
/// stream wraps a tar is only known from the extension.
pub fn detect_magic(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, ..] => Some(ArchiveFormat::SevenZip),
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] | [0x50, 0x4B, 0x07, 0x08, ..] => {
            Some(ArchiveFormat::Zip)
        }
        [b'R', b'a', b'r', b'!', 0x1A, 0x07, 0x00, ..] | [b'R', b'a', b'r', b'!', 0x1A, 0x07, 0x01, 0x00, ..] => {
            Some(ArchiveFormat::Rar)
        }
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::Gzip),
        [b'B', b'Z', b'h', ..] => Some(ArchiveFormat::Bzip2),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(ArchiveFormat::Xz),
        _ if is_tar_header(data) => Some(ArchiveFormat::Tar),
        _ => None,
    }
}

fn is_tar_header(data: &[u8]) -> bool { data.len() >= 262 && data[257..262] == *b"ustar" }

/// Probe the first bytes of `reader`.
pub fn detect_from_reader<R: Read>(reader: R) -> io::Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(PROBE_LEN as usize);
    reader.take(PROBE_LEN).read_to_end(&mut header)?;
    Ok(detect_magic(&header))
}

/// Combine extension and content detection.
///
/// Agreement or a single opinion is trusted as is. When both yield a
/// different format the extension wins. Unreadable or non-regular files are
/// unknown (`None`).
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    if !path.is_file() {
        return None;
    }
    let by_ext = detect_by_extension(path);
    let by_magic = File::open(path)
        .and_then(detect_from_reader)
        .unwrap_or_else(|err| {
            tracing::debug!(path = %path.display(), %err, "magic probe failed");
            None
        });

    let detected = match (by_ext, by_magic) {
        (Some(ext), Some(magic)) if ext != magic => {
            tracing::debug!(extension = %ext, content = %magic, "detection disagrees, trusting extension");
            Some(ext)
        }
        (Some(ext), _) => Some(ext),
        (None, magic) => magic,
    };
    tracing::debug!(path = %path.display(), format = ?detected.map(ArchiveFormat::tag), "format detected");
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detect_zip_variants() {
        assert_eq!(detect_magic(&[0x50, 0x4B, 0x03, 0x04, 0x14]), Some(ArchiveFormat::Zip));
        assert_eq!(detect_magic(&[0x50, 0x4B, 0x05, 0x06]), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detect_seven_zip() {
        assert_eq!(
            detect_magic(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, 0x00, 0x04]),
            Some(ArchiveFormat::SevenZip)
        );
    }

    #[test]
    fn detect_rar_v4_and_v5() {
        assert_eq!(detect_magic(b"Rar!\x1a\x07\x00rest"), Some(ArchiveFormat::Rar));
        assert_eq!(detect_magic(b"Rar!\x1a\x07\x01\x00rest"), Some(ArchiveFormat::Rar));
    }

    #[test]
    fn detect_stream_codecs() {
        assert_eq!(detect_magic(&[0x1F, 0x8B, 0x08]), Some(ArchiveFormat::Gzip));
        assert_eq!(detect_magic(b"BZh91AY&SY"), Some(ArchiveFormat::Bzip2));
        assert_eq!(
            detect_magic(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00]),
            Some(ArchiveFormat::Xz)
        );
    }

    #[test]
    fn detect_tar_at_offset() {
        let mut header = [0u8; 512];
        header[257..263].copy_from_slice(b"ustar\0");
        assert_eq!(detect_magic(&header), Some(ArchiveFormat::Tar));

        let mut gnu = [0u8; 512];
        gnu[257..265].copy_from_slice(b"ustar  \0");
        assert_eq!(detect_magic(&gnu), Some(ArchiveFormat::Tar));
    }

    #[test]
    fn detect_truncated_tar_header() {
        assert_eq!(detect_magic(&[0u8; 256]), None);
    }

    #[test]
    fn detect_unknown() {
        assert_eq!(detect_magic(&[0xDE, 0xAD, 0xBE, 0xEF]), None);
        assert_eq!(detect_magic(&[]), None);
    }

    #[test]
    fn extension_prefers_compound_suffix() {
        assert_eq!(detect_by_extension(Path::new("a/b.tar.gz")), Some(ArchiveFormat::TarGz));
        assert_eq!(detect_by_extension(Path::new("b.TGZ")), Some(ArchiveFormat::TarGz));
        assert_eq!(detect_by_extension(Path::new("b.gz")), Some(ArchiveFormat::Gzip));
        assert_eq!(detect_by_extension(Path::new("b.txt")), None);
    }

    #[test]
    fn extension_wins_on_disagreement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabeled.zip");
        std::fs::File::create(&path).unwrap().write_all(&[0x1F, 0x8B, 0x08, 0x00]).unwrap();
        assert_eq!(detect_format(&path), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn tar_gz_extension_agrees_with_gzip_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.tar.gz");
        std::fs::write(&path, [0x1F, 0x8B, 0x08, 0x00]).unwrap();
        assert_eq!(detect_format(&path), Some(ArchiveFormat::TarGz));
    }

    #[test]
    fn magic_used_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noext");
        std::fs::write(&path, b"BZh91AY&SY").unwrap();
        assert_eq!(detect_format(&path), Some(ArchiveFormat::Bzip2));
    }

    #[test]
    fn missing_or_directory_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_format(&dir.path().join("absent.zip")), None);
        assert_eq!(detect_format(dir.path()), None);
    }
}
