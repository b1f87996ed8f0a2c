use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::hasher::{Algorithm, Blake3Hasher, Hasher, Sha256Hasher};

/// Read size per step; bounds memory regardless of artifact size.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Lowercase hex digests of one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigests {
    pub sha256: String,
    pub blake3: String,
}

impl FileDigests {
    pub fn get(&self, algorithm: Algorithm) -> &str {
        match algorithm {
            Algorithm::Sha256 => &self.sha256,
            Algorithm::Blake3 => &self.blake3,
        }
    }
}

/// Feed `reader` through both hashers in a single pass.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<FileDigests> {
    let mut sha = Sha256Hasher::new();
    let mut b3 = Blake3Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sha.update(&buf[..n]);
        b3.update(&buf[..n]);
    }
    Ok(FileDigests {
        sha256: hex::encode(sha.finalize()),
        blake3: hex::encode(b3.finalize()),
    })
}

pub fn digest_file(path: impl AsRef<Path>) -> Result<FileDigests> {
    let path = path.as_ref();
    let read_err = |source| Error::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    digest_reader(file).map_err(read_err)
}
