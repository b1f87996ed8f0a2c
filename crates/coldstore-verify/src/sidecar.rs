use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::check::CheckOutcome;
use crate::digest::{FileDigests, digest_file};
use crate::error::{Error, Result};
use crate::hasher::Algorithm;

/// `<artifact>.<ext>` next to the artifact.
pub fn sidecar_path(artifact: &Path, algorithm: Algorithm) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(".");
    name.push(algorithm.extension());
    PathBuf::from(name)
}

/// `"<hex>  <filename>\n"`, the coreutils checksum layout.
pub fn format_line(hex_digest: &str, file_name: &str) -> String { format!("{hex_digest}  {file_name}\n") }

/// First whitespace-delimited token of a sidecar.
pub fn parse_digest(contents: &str) -> Option<&str> { contents.split_whitespace().next() }

/// Hash `artifact` once and write both sidecars.
pub fn generate_and_persist(artifact: impl AsRef<Path>) -> Result<FileDigests> {
    let artifact = artifact.as_ref();
    let digests = digest_file(artifact)?;
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for algorithm in Algorithm::ALL {
        let sidecar = sidecar_path(artifact, algorithm);
        coldstore_fs::atomic_write(&sidecar, format_line(digests.get(algorithm), &file_name).as_bytes())?;
        tracing::info!(algorithm = algorithm.name(), digest = digests.get(algorithm), sidecar = %sidecar.display(), "digest written");
    }
    Ok(digests)
}

/// Read the digest recorded for `algorithm`.
pub fn read_sidecar(artifact: &Path, algorithm: Algorithm) -> Result<String> {
    let sidecar = sidecar_path(artifact, algorithm);
    let contents = match fs::read_to_string(&sidecar) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SidecarMissing { algorithm, sidecar });
        }
        Err(source) => return Err(Error::Read { path: sidecar, source }),
    };
    parse_digest(&contents)
        .map(str::to_owned)
        .ok_or(Error::MalformedSidecar { algorithm, sidecar })
}

/// Compare a live digest against the recorded one, ignoring case.
pub fn verify_digest(artifact: &Path, algorithm: Algorithm, digests: &FileDigests) -> Result<()> {
    let expected = read_sidecar(artifact, algorithm)?;
    let actual = digests.get(algorithm);
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(Error::Mismatch {
            algorithm,
            path: artifact.to_path_buf(),
            expected,
            actual: actual.to_string(),
        })
    }
}

/// Per-algorithm outcome of [`verify_against_sidecars`].
#[derive(Clone, Debug)]
pub struct SidecarReport {
    pub sha256: CheckOutcome,
    pub blake3: CheckOutcome,
}

impl SidecarReport {
    pub fn get(&self, algorithm: Algorithm) -> &CheckOutcome {
        match algorithm {
            Algorithm::Sha256 => &self.sha256,
            Algorithm::Blake3 => &self.blake3,
        }
    }
}

/// Re-derive both digests of `artifact` and check them against its sidecars.
///
/// A missing sidecar is indeterminate, a differing digest is a failure. Only
/// an unreadable artifact is an `Err`.
pub fn verify_against_sidecars(artifact: impl AsRef<Path>) -> Result<SidecarReport> {
    let artifact = artifact.as_ref();
    let digests = digest_file(artifact)?;
    let outcome = |algorithm| match verify_digest(artifact, algorithm, &digests) {
        Ok(()) => CheckOutcome::passed(format!("{algorithm} {}", digests.get(algorithm))),
        Err(err @ Error::SidecarMissing { .. }) => {
            tracing::warn!(%err, "digest check skipped");
            CheckOutcome::indeterminate(err.to_string())
        }
        Err(err) => {
            tracing::error!(%err, "digest check failed");
            CheckOutcome::failed(err.to_string())
        }
    };
    Ok(SidecarReport {
        sha256: outcome(Algorithm::Sha256),
        blake3: outcome(Algorithm::Blake3),
    })
}
