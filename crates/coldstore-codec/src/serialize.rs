use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tar::{Builder, EntryType, Header};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Owner and group name stamped on every entry.
const OWNER: &str = "root";

#[derive(Clone, Debug, Default)]
pub struct SerializeReport {
    pub files:       usize,
    pub directories: usize,
    pub bytes:       u64,
    /// Entries that could not be stat'd or opened.
    pub skipped:     Vec<PathBuf>,
}

impl SerializeReport {
    pub fn entries(&self) -> usize { self.files + self.directories }
}

/// Writes canonical tar streams.
///
/// Entries are visited in byte order of their names at every depth and
/// carry uid/gid 0, `root` owner names and an epoch mtime, so the same
/// tree always yields the same bytes. The source root itself is never an
/// entry; a single file becomes one entry named by its base name.
/// Symlinks are followed for metadata but never traversed.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicSerializer;

impl DeterministicSerializer {
    pub fn new() -> Self { Self }

    /// Serialize `source` into the tar file `output`.
    pub fn serialize(&self, source: &Path, output: &Path) -> Result<SerializeReport> {
        let file = File::create(output).map_err(|source| Error::Serialization {
            path: output.to_path_buf(),
            source,
        })?;
        let (writer, report) = self.serialize_to(source, BufWriter::new(file))?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|f| f.sync_all())
            .map_err(|source| Error::Serialization {
                path: output.to_path_buf(),
                source,
            })?;
        if !output.is_file() {
            return Err(Error::MissingOutput {
                path: output.to_path_buf(),
            });
        }
        tracing::info!(
            source = %source.display(),
            files = report.files,
            directories = report.directories,
            skipped = report.skipped.len(),
            "tar written"
        );
        Ok(report)
    }

    /// Serialize `source` into `writer`, returning it once the archive is finished.
    pub fn serialize_to<W: Write>(&self, source: &Path, writer: W) -> Result<(W, SerializeReport)> {
        let ser_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| Error::Serialization { path, source }
        };
        let root_meta = fs::metadata(source).map_err(ser_err(source))?;
        let mut builder = Builder::new(writer);
        let mut report = SerializeReport::default();

        if root_meta.is_file() {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            append_file(&mut builder, source, &name, &root_meta, &mut report)?;
        } else {
            for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
                        tracing::warn!(path = %path.display(), %err, "skipping unreadable entry");
                        report.skipped.push(path);
                        continue;
                    }
                };
                let path = entry.path();
                let Some(name) = relative_name(source, path) else {
                    continue;
                };
                let meta = match fs::metadata(path) {
                    Ok(meta) => meta,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), %err, "skipping entry that cannot be stat'd");
                        report.skipped.push(path.to_path_buf());
                        continue;
                    }
                };
                if meta.is_dir() {
                    let mut header = header_for(EntryType::Directory, 0, &meta).map_err(ser_err(path))?;
                    builder
                        .append_data(&mut header, &name, io::empty())
                        .map_err(ser_err(path))?;
                    report.directories += 1;
                } else if meta.is_file() {
                    append_file(&mut builder, path, &name, &meta, &mut report)?;
                } else {
                    tracing::warn!(path = %path.display(), "skipping special file");
                    report.skipped.push(path.to_path_buf());
                }
            }
        }

        if report.entries() == 0 {
            return Err(Error::NothingSerialized {
                path: source.to_path_buf(),
            });
        }
        let writer = builder.into_inner().map_err(ser_err(source))?;
        Ok((writer, report))
    }
}

fn append_file<W: Write>(
    builder: &mut Builder<W>,
    path: &Path,
    name: &str,
    meta: &Metadata,
    report: &mut SerializeReport,
) -> Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "skipping unreadable file");
            report.skipped.push(path.to_path_buf());
            return Ok(());
        }
    };
    let to_err = |source| Error::Serialization {
        path: path.to_path_buf(),
        source,
    };
    let mut header = header_for(EntryType::Regular, meta.len(), meta).map_err(to_err)?;
    builder.append_data(&mut header, name, file).map_err(to_err)?;
    tracing::trace!(entry = name, size = meta.len(), "added");
    report.files += 1;
    report.bytes += meta.len();
    Ok(())
}

fn header_for(kind: EntryType, size: u64, meta: &Metadata) -> io::Result<Header> {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(size);
    header.set_mode(mode_of(meta));
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username(OWNER)?;
    header.set_groupname(OWNER)?;
    Ok(header)
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 { if meta.is_dir() { 0o755 } else { 0o644 } }

/// `/`-joined path of `path` below `root`.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names(bytes: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(bytes);
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn entries_sorted_per_depth_without_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b/inner/z.txt"), b"z").unwrap();
        fs::write(root.join("a-file"), b"af").unwrap();
        fs::write(root.join("a/x.txt"), b"x").unwrap();

        let (bytes, report) = DeterministicSerializer::new()
            .serialize_to(&root, Vec::new())
            .unwrap();
        assert_eq!(names(&bytes), ["a", "a/x.txt", "a-file", "b", "b/inner", "b/inner/z.txt"]);
        assert_eq!((report.files, report.directories), (3, 3));
    }

    #[test]
    fn headers_are_normalized() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("f"), b"data").unwrap();

        let (bytes, _) = DeterministicSerializer::new().serialize_to(&root, Vec::new()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let header = entry.header();
            assert_eq!(header.mtime().unwrap(), 0);
            assert_eq!(header.uid().unwrap(), 0);
            assert_eq!(header.gid().unwrap(), 0);
            assert_eq!(header.username().unwrap(), Some("root"));
            assert_eq!(header.groupname().unwrap(), Some("root"));
        }
    }

    #[test]
    fn single_file_uses_basename() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("report.pdf");
        fs::write(&file, b"%PDF").unwrap();
        let (bytes, report) = DeterministicSerializer::new().serialize_to(&file, Vec::new()).unwrap();
        assert_eq!(names(&bytes), ["report.pdf"]);
        assert_eq!(report.bytes, 4);
    }

    #[test]
    fn long_names_survive() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        let long = "n".repeat(150);
        fs::create_dir_all(root.join(&long)).unwrap();
        fs::write(root.join(&long).join("leaf.txt"), b"l").unwrap();
        let (bytes, _) = DeterministicSerializer::new().serialize_to(&root, Vec::new()).unwrap();
        assert_eq!(names(&bytes), [long.clone(), format!("{long}/leaf.txt")]);
    }

    #[test]
    fn empty_directory_fails() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("empty");
        fs::create_dir_all(&root).unwrap();
        assert!(matches!(
            DeterministicSerializer::new().serialize_to(&root, Vec::new()),
            Err(Error::NothingSerialized { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("ok.txt"), b"ok").unwrap();
        std::os::unix::fs::symlink(root.join("missing"), root.join("dangling")).unwrap();

        let (bytes, report) = DeterministicSerializer::new().serialize_to(&root, Vec::new()).unwrap();
        assert_eq!(names(&bytes), ["ok.txt"]);
        assert_eq!(report.skipped, vec![root.join("dangling")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_stored_by_content() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        fs::write(dir.path().join("outside.txt"), b"outside").unwrap();
        std::os::unix::fs::symlink(dir.path().join("outside.txt"), root.join("link.txt")).unwrap();

        let (bytes, report) = DeterministicSerializer::new().serialize_to(&root, Vec::new()).unwrap();
        assert_eq!(names(&bytes), ["link.txt"]);
        assert_eq!(report.bytes, 7);
    }
}
