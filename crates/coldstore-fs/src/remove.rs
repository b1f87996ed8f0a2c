use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, retry};

/// Remove a file, retrying while it is locked. A missing file counts as removed.
pub fn remove_file(path: impl AsRef<Path>, policy: &RetryPolicy) -> Result<()> {
    let path = path.as_ref();
    retry(policy, |attempt| {
        if attempt > 0 {
            clear_readonly(path);
        }
        match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    })
    .map_err(|source| Error::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a directory tree, retrying while entries are locked.
pub fn remove_dir(path: impl AsRef<Path>, policy: &RetryPolicy) -> Result<()> {
    let path = path.as_ref();
    retry(policy, |attempt| {
        if attempt > 0 {
            clear_readonly_tree(path);
        }
        match fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    })
    .map_err(|source| Error::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a directory, falling back to deleting whatever entries can be
/// deleted one by one. Returns the paths that survived.
pub fn remove_dir_best_effort(path: impl AsRef<Path>, policy: &RetryPolicy) -> Vec<PathBuf> {
    let path = path.as_ref();
    match remove_dir(path, policy) {
        Ok(()) => Vec::new(),
        Err(err) => {
            tracing::warn!(%err, "directory removal failed, removing entries individually");
            remove_contents(path)
        }
    }
}

fn remove_contents(dir: &Path) -> Vec<PathBuf> {
    let mut remaining = Vec::new();
    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if let Some(path) = err.path() {
                    remaining.push(path.to_path_buf());
                }
                continue;
            }
        };
        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            clear_readonly(path);
            fs::remove_file(path)
        };
        if let Err(err) = result {
            tracing::debug!(path = %path.display(), %err, "could not remove entry");
            remaining.push(path.to_path_buf());
        }
    }
    // A directory only survives because something below it did.
    remaining.retain(|p| p.exists());
    for path in &remaining {
        tracing::warn!(path = %path.display(), "left for the next orphan sweep");
    }
    remaining
}

fn clear_readonly_tree(root: &Path) {
    for entry in WalkDir::new(root).into_iter().flatten() {
        clear_readonly(entry.path());
    }
}

fn clear_readonly(path: &Path) {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if meta.file_type().is_symlink() {
        return;
    }
    let mut perms = meta.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = perms.mode();
        if mode & 0o200 != 0 {
            return;
        }
        perms.set_mode(mode | 0o200);
    }
    #[cfg(not(unix))]
    {
        if !perms.readonly() {
            return;
        }
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
    }
    let _ = fs::set_permissions(path, perms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn remove_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent");
        assert!(remove_file(&path, &RetryPolicy::immediate(1)).is_ok());
    }

    #[test]
    fn remove_readonly_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ro.txt");
        fs::write(&path, b"x").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        remove_file(&path, &RetryPolicy::immediate(2)).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn remove_nested_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/c.txt"), b"c").unwrap();
        fs::write(root.join("top.txt"), b"t").unwrap();

        remove_dir(&root, &RetryPolicy::immediate(1)).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn best_effort_on_clean_tree_leaves_nothing() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("x")).unwrap();
        fs::write(root.join("x/y.bin"), b"y").unwrap();

        let remaining = remove_dir_best_effort(&root, &RetryPolicy::immediate(1));
        assert!(remaining.is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn remove_contents_reports_nothing_for_removable_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("deep/deeper")).unwrap();
        fs::write(root.join("deep/deeper/f"), b"f").unwrap();

        assert!(remove_contents(&root).is_empty());
        assert!(!root.exists());
    }
}
