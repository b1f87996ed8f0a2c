use std::fmt;

/// Archive formats accepted as pack input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    SevenZip,
    Zip,
    Rar,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Gzip,
    Bzip2,
    Xz,
}

/// Stream codec wrapped around a tar archive or a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 10] = [
        ArchiveFormat::SevenZip,
        ArchiveFormat::Zip,
        ArchiveFormat::Rar,
        ArchiveFormat::Tar,
        ArchiveFormat::TarGz,
        ArchiveFormat::TarBz2,
        ArchiveFormat::TarXz,
        ArchiveFormat::Gzip,
        ArchiveFormat::Bzip2,
        ArchiveFormat::Xz,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Rar => "rar",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Gzip => "gz",
            ArchiveFormat::Bzip2 => "bz2",
            ArchiveFormat::Xz => "xz",
        }
    }

    /// Lowercase filename suffixes mapping to this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ArchiveFormat::SevenZip => &[".7z"],
            ArchiveFormat::Zip => &[".zip"],
            ArchiveFormat::Rar => &[".rar"],
            ArchiveFormat::Tar => &[".tar"],
            ArchiveFormat::TarGz => &[".tar.gz", ".tgz"],
            ArchiveFormat::TarBz2 => &[".tar.bz2", ".tbz2"],
            ArchiveFormat::TarXz => &[".tar.xz", ".txz"],
            ArchiveFormat::Gzip => &[".gz"],
            ArchiveFormat::Bzip2 => &[".bz2"],
            ArchiveFormat::Xz => &[".xz"],
        }
    }

    pub fn compression(self) -> Compression {
        match self {
            ArchiveFormat::TarGz | ArchiveFormat::Gzip => Compression::Gzip,
            ArchiveFormat::TarBz2 | ArchiveFormat::Bzip2 => Compression::Bzip2,
            ArchiveFormat::TarXz | ArchiveFormat::Xz => Compression::Xz,
            _ => Compression::None,
        }
    }

    pub fn is_tar_family(self) -> bool {
        matches!(
            self,
            ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarXz
        )
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

/// Longest known archive suffix of `name`, matched case-insensitively.
pub fn archive_suffix(name: &str) -> Option<(ArchiveFormat, usize)> {
    let lower = name.to_ascii_lowercase();
    ArchiveFormat::ALL
        .iter()
        .flat_map(|fmt| fmt.extensions().iter().map(move |ext| (*fmt, ext.len(), *ext)))
        .filter(|(_, _, ext)| lower.ends_with(ext) && lower.len() > ext.len())
        .max_by_key(|(_, len, _)| *len)
        .map(|(fmt, len, _)| (fmt, len))
}

/// `name` without its archive suffix; unchanged when none matches.
pub fn strip_archive_suffix(name: &str) -> &str {
    match archive_suffix(name) {
        Some((_, len)) => &name[..name.len() - len],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_suffix_wins() {
        assert_eq!(archive_suffix("backup.tar.gz"), Some((ArchiveFormat::TarGz, 7)));
        assert_eq!(archive_suffix("notes.gz"), Some((ArchiveFormat::Gzip, 3)));
        assert_eq!(archive_suffix("BACKUP.TAR.BZ2"), Some((ArchiveFormat::TarBz2, 8)));
    }

    #[test]
    fn bare_extension_is_not_a_suffix() {
        assert_eq!(archive_suffix(".zip"), None);
        assert_eq!(archive_suffix("readme.txt"), None);
    }

    #[test]
    fn strip_suffix() {
        assert_eq!(strip_archive_suffix("photos.tar.xz"), "photos");
        assert_eq!(strip_archive_suffix("Photos.TGZ"), "Photos");
        assert_eq!(strip_archive_suffix("data.7z"), "data");
        assert_eq!(strip_archive_suffix("plain.txt"), "plain.txt");
    }

    #[test]
    fn tags_are_unique() {
        let mut tags: Vec<_> = ArchiveFormat::ALL.iter().map(|f| f.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), ArchiveFormat::ALL.len());
    }
}
