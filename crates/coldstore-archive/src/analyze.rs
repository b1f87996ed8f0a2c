//! Topology of an archive's listing and the flattening decision that follows from it.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::detect::detect_format;
use crate::entry::{ArchiveEntry, ExtractReport};
use crate::error::{Error, Result};
use crate::handler::ArchiveHandler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureKind {
    Empty,
    SingleRoot,
    MultipleRoots,
    SingleFile,
    Error,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StructureKind::Empty => "empty",
            StructureKind::SingleRoot => "single_root",
            StructureKind::MultipleRoots => "multiple_roots",
            StructureKind::SingleFile => "single_file",
            StructureKind::Error => "error",
        })
    }
}

/// Classified listing. `root_folder` is present exactly for [`StructureKind::SingleRoot`].
#[derive(Clone, Debug)]
pub struct StructureInfo {
    kind:        StructureKind,
    description: String,
    root_folder: Option<String>,
    entries:     Vec<ArchiveEntry>,
    format:      String,
}

impl StructureInfo {
    pub fn single_root(root: impl Into<String>, entries: Vec<ArchiveEntry>, format: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            kind: StructureKind::SingleRoot,
            description: format!("Single root folder: {root}"),
            root_folder: Some(root),
            entries,
            format: format.into(),
        }
    }

    /// Any classification other than single-root; the root folder stays unset.
    pub fn other(
        kind: StructureKind,
        description: impl Into<String>,
        entries: Vec<ArchiveEntry>,
        format: impl Into<String>,
    ) -> Self {
        let kind = if kind == StructureKind::SingleRoot {
            StructureKind::Error
        } else {
            kind
        };
        Self {
            kind,
            description: description.into(),
            root_folder: None,
            entries,
            format: format.into(),
        }
    }

    pub fn error(description: impl Into<String>, format: impl Into<String>) -> Self {
        Self::other(StructureKind::Error, description, Vec::new(), format)
    }

    pub fn kind(&self) -> StructureKind { self.kind }

    pub fn description(&self) -> &str { &self.description }

    pub fn root_folder(&self) -> Option<&str> { self.root_folder.as_deref() }

    pub fn entries(&self) -> &[ArchiveEntry] { &self.entries }

    pub fn format(&self) -> &str { &self.format }

    pub fn is_error(&self) -> bool { self.kind == StructureKind::Error }
}

/// Top-level names mapped to whether they are directories.
///
/// A name that only appears as a prefix of deeper paths is an implicit
/// directory.
fn top_level(entries: &[ArchiveEntry]) -> BTreeMap<&str, bool> {
    let mut tops = BTreeMap::new();
    for entry in entries {
        let is_dir = entry.depth() > 1 || entry.is_directory;
        let slot = tops.entry(entry.top_level()).or_insert(false);
        *slot |= is_dir;
    }
    tops
}

/// Classify a listing by its first path components.
pub fn analyze_structure(entries: Vec<ArchiveEntry>, format: &str) -> StructureInfo {
    let tops = top_level(&entries);
    let dirs = tops.values().filter(|is_dir| **is_dir).count();
    let files = tops.len() - dirs;

    match tops.len() {
        0 => StructureInfo::other(StructureKind::Empty, "Archive is empty", entries, format),
        1 if dirs == 1 => {
            let root = tops.keys().next().map(|s| s.to_string()).unwrap_or_default();
            StructureInfo::single_root(root, entries, format)
        }
        1 => {
            let name = tops.keys().next().map(|s| s.to_string()).unwrap_or_default();
            StructureInfo::other(StructureKind::SingleFile, format!("Single file: {name}"), entries, format)
        }
        _ => StructureInfo::other(
            StructureKind::MultipleRoots,
            format!("Multiple top-level entries: {dirs} dirs, {files} files"),
            entries,
            format,
        ),
    }
}

/// Directory to pack after extracting a classified archive into `extracted`.
///
/// A single root folder is used in place of `extracted` when it holds more
/// than one child or exactly one file. A root whose only child is another
/// folder is kept as is.
pub fn handle_nested_structure(extracted: &Path, info: &StructureInfo) -> PathBuf {
    let Some(root) = info.root_folder() else {
        return extracted.to_path_buf();
    };
    let root_path = extracted.join(root);
    let children: Vec<_> = match fs::read_dir(&root_path) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(err) => {
            tracing::warn!(path = %root_path.display(), %err, "cannot inspect root folder");
            return extracted.to_path_buf();
        }
    };
    let flatten = match children.as_slice() {
        [] => false,
        [only] => only.file_type().map(|t| t.is_file()).unwrap_or(false),
        _ => true,
    };
    if flatten {
        tracing::info!(root, "flattening redundant root folder");
        root_path
    } else {
        extracted.to_path_buf()
    }
}

/// Format detection, listing, classification and extraction for one input.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveAnalyzer;

impl ArchiveAnalyzer {
    pub fn new() -> Self { Self }

    /// Classify `path`. Unsupported or unreadable archives yield the error kind.
    pub fn analyze(&self, path: &Path) -> StructureInfo {
        let Some(format) = detect_format(path) else {
            return StructureInfo::error(format!("Unsupported format: {}", path.display()), "unknown");
        };
        let handler = ArchiveHandler::for_format(path, format);
        match handler.try_list() {
            Ok(entries) => {
                let info = analyze_structure(entries, format.tag());
                tracing::info!(archive = %path.display(), kind = %info.kind(), "{}", info.description());
                info
            }
            Err(err) => {
                tracing::error!(archive = %path.display(), %err, "structure analysis failed");
                StructureInfo::error(err.to_string(), format.tag())
            }
        }
    }

    /// Classify, failing on the error kind.
    pub fn try_analyze(&self, path: &Path) -> Result<StructureInfo> {
        let info = self.analyze(path);
        if info.is_error() {
            return Err(Error::StructureAnalysis {
                path:   path.to_path_buf(),
                reason: info.description().to_string(),
            });
        }
        Ok(info)
    }

    pub fn extract(&self, path: &Path, dest: &Path) -> Result<ExtractReport> {
        ArchiveHandler::open(path)?.try_extract_all(dest)
    }

    pub fn handle_nested_structure(&self, extracted: &Path, info: &StructureInfo) -> PathBuf {
        handle_nested_structure(extracted, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(spec: &[(&str, bool)]) -> Vec<ArchiveEntry> {
        spec.iter()
            .map(|(p, dir)| if *dir { ArchiveEntry::directory(*p) } else { ArchiveEntry::file(*p, 1) })
            .collect()
    }

    #[test]
    fn single_root() {
        let info = analyze_structure(entries(&[("root", true), ("root/a.txt", false)]), "zip");
        assert_eq!(info.kind(), StructureKind::SingleRoot);
        assert_eq!(info.root_folder(), Some("root"));
        assert_eq!(info.format(), "zip");
    }

    #[test]
    fn implicit_root_directory() {
        let info = analyze_structure(entries(&[("root/a.txt", false), ("root/b/c.txt", false)]), "tar");
        assert_eq!(info.kind(), StructureKind::SingleRoot);
        assert_eq!(info.root_folder(), Some("root"));
    }

    #[test]
    fn extra_top_level_file_makes_multiple_roots() {
        let info = analyze_structure(
            entries(&[("root", true), ("root/a.txt", false), ("README", false)]),
            "tar",
        );
        assert_eq!(info.kind(), StructureKind::MultipleRoots);
        assert_eq!(info.root_folder(), None);
        assert!(info.description().contains("1 dirs, 1 files"));
    }

    #[test]
    fn single_file_and_empty() {
        assert_eq!(analyze_structure(entries(&[("a.bin", false)]), "gz").kind(), StructureKind::SingleFile);
        let empty = analyze_structure(Vec::new(), "zip");
        assert_eq!(empty.kind(), StructureKind::Empty);
        assert_eq!(empty.root_folder(), None);
    }

    #[test]
    fn other_never_claims_single_root() {
        let info = StructureInfo::other(StructureKind::SingleRoot, "x", Vec::new(), "zip");
        assert_eq!(info.kind(), StructureKind::Error);
    }

    #[test]
    fn analyze_unsupported_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, b"hello").unwrap();
        let info = ArchiveAnalyzer::new().analyze(&path);
        assert!(info.is_error());
        assert!(ArchiveAnalyzer::new().try_analyze(&path).is_err());
    }

    fn single_root_info() -> StructureInfo { StructureInfo::single_root("root", Vec::new(), "zip") }

    #[test]
    fn flattens_root_with_several_children() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("root/sub")).unwrap();
        fs::write(dir.path().join("root/a.txt"), b"a").unwrap();
        assert_eq!(handle_nested_structure(dir.path(), &single_root_info()), dir.path().join("root"));
    }

    #[test]
    fn flattens_root_with_single_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("root")).unwrap();
        fs::write(dir.path().join("root/only.txt"), b"a").unwrap();
        assert_eq!(handle_nested_structure(dir.path(), &single_root_info()), dir.path().join("root"));
    }

    #[test]
    fn keeps_root_whose_only_child_is_a_folder() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("root/inner")).unwrap();
        fs::write(dir.path().join("root/inner/x"), b"x").unwrap();
        assert_eq!(handle_nested_structure(dir.path(), &single_root_info()), dir.path());
    }

    #[test]
    fn non_single_root_is_unchanged() {
        let dir = tempdir().unwrap();
        let info = StructureInfo::other(StructureKind::MultipleRoots, "m", Vec::new(), "zip");
        assert_eq!(handle_nested_structure(dir.path(), &info), dir.path());
    }
}
