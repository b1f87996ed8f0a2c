use crate::format::ArchiveFormat;

/// One member of an archive as reported by its listing.
///
/// `path` is archive-internal, forward-slash separated and relative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path:            String,
    pub size:            u64,
    pub is_directory:    bool,
    pub compressed_size: Option<u64>,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            is_directory: false,
            compressed_size: None,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path:            path.into(),
            size:            0,
            is_directory:    true,
            compressed_size: None,
        }
    }

    pub fn with_compressed_size(mut self, size: u64) -> Self {
        self.compressed_size = Some(size);
        self
    }

    /// First path component.
    pub fn top_level(&self) -> &str { self.path.split('/').next().unwrap_or(&self.path) }

    pub fn depth(&self) -> usize { self.path.split('/').count() }
}

/// Aggregate of a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub format:          ArchiveFormat,
    pub files:           usize,
    pub folders:         usize,
    pub total_size:      u64,
    /// Size of the archive file itself.
    pub compressed_size: u64,
}

impl ArchiveInfo {
    pub fn summarize(format: ArchiveFormat, entries: &[ArchiveEntry], compressed_size: u64) -> Self {
        let folders = entries.iter().filter(|e| e.is_directory).count();
        Self {
            format,
            files: entries.len() - folders,
            folders,
            total_size: entries.iter().filter(|e| !e.is_directory).map(|e| e.size).sum(),
            compressed_size,
        }
    }
}

/// What an extraction did, entry by entry.
#[derive(Clone, Debug, Default)]
pub struct ExtractReport {
    pub files:       usize,
    pub directories: usize,
    pub bytes:       u64,
    /// Entries refused by the traversal guard or of unsupported kinds.
    pub skipped:     Vec<String>,
    /// `(original, sanitized)` pairs.
    pub renamed:     Vec<(String, String)>,
}

impl ExtractReport {
    pub fn entries(&self) -> usize { self.files + self.directories }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_counts() {
        let entries = vec![
            ArchiveEntry::directory("root"),
            ArchiveEntry::file("root/a.txt", 10).with_compressed_size(4),
            ArchiveEntry::file("root/b.txt", 5),
        ];
        let info = ArchiveInfo::summarize(ArchiveFormat::Zip, &entries, 99);
        assert_eq!(info.files, 2);
        assert_eq!(info.folders, 1);
        assert_eq!(info.total_size, 15);
        assert_eq!(info.compressed_size, 99);
    }

    #[test]
    fn top_level_component() {
        assert_eq!(ArchiveEntry::file("a/b/c", 0).top_level(), "a");
        assert_eq!(ArchiveEntry::file("single", 0).top_level(), "single");
        assert_eq!(ArchiveEntry::file("a/b/c", 0).depth(), 3);
    }
}
