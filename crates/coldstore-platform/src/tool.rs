use std::path::PathBuf;

/// Resolve `program` on `PATH`.
pub fn locate(program: &str) -> Option<PathBuf> {
    match which::which(program) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::trace!(program, %err, "tool lookup failed");
            None
        }
    }
}

/// Resolve the first of `candidates` present on `PATH`, returning its name and path.
pub fn locate_any<'a>(candidates: &[&'a str]) -> Option<(&'a str, PathBuf)> {
    candidates
        .iter()
        .find_map(|name| locate(name).map(|path| (*name, path)))
}
