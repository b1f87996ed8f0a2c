use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::inspect::scan_tar;
use crate::window::{FORMAT_MAX_WINDOW_LOG, FrameHeader, read_frame_header, window_log_for_size, window_memory_mb};

/// Levels accepted by the encoder.
pub const LEVEL_RANGE: std::ops::RangeInclusive<i32> = 1..=22;

/// Long-distance matching is only worth its memory at higher levels.
const LONG_MODE_MIN_LEVEL: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionParameters {
    pub level:     i32,
    /// `0` keeps the single-threaded codec default.
    pub threads:   u32,
    pub long_mode: bool,
}

impl Default for CompressionParameters {
    fn default() -> Self {
        Self {
            level:     19,
            threads:   0,
            long_mode: true,
        }
    }
}

impl CompressionParameters {
    pub fn uses_long_distance_matching(&self) -> bool {
        self.long_mode && self.level >= LONG_MODE_MIN_LEVEL
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionReport {
    pub input_size:  u64,
    pub output_size: u64,
    pub window_log:  u32,
}

impl CompressionReport {
    /// `input / output`; zero for an empty output.
    pub fn ratio(&self) -> f64 {
        if self.output_size == 0 {
            0.0
        } else {
            self.input_size as f64 / self.output_size as f64
        }
    }

    pub fn space_saving_percent(&self) -> f64 {
        if self.input_size == 0 {
            0.0
        } else {
            (1.0 - self.output_size as f64 / self.input_size as f64) * 100.0
        }
    }
}

/// Summary of a compressed tar artifact, gathered without a temp file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub files:              usize,
    pub folders:            usize,
    pub total_size:         u64,
    pub compressed_size:    u64,
    pub window_log:         u32,
    pub memory_required_mb: u64,
}

/// zstd compression with checksummed frames and size-derived windows.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompressionEngine {
    params: CompressionParameters,
}

impl CompressionEngine {
    pub fn new(params: CompressionParameters) -> Self { Self { params } }

    pub fn params(&self) -> &CompressionParameters { &self.params }

    pub fn compress(&self, input: &Path, output: &Path) -> Result<CompressionReport> {
        self.compress_with_progress(input, output, |_| {})
    }

    /// Compress `input` into `output`, reporting consumed input bytes.
    pub fn compress_with_progress(
        &self,
        input: &Path,
        output: &Path,
        on_progress: impl FnMut(u64),
    ) -> Result<CompressionReport> {
        let comp_err = |source: io::Error| Error::Compression {
            path: input.to_path_buf(),
            source,
        };
        let input_size = fs::metadata(input).map_err(comp_err)?.len();
        let window_log = window_log_for_size(input_size);
        let long = self.params.uses_long_distance_matching();
        tracing::info!(
            input = %input.display(),
            size = input_size,
            level = self.params.level,
            window_log,
            long_distance_matching = long,
            threads = self.params.threads,
            "compressing"
        );

        let mut reader = ProgressReader::new(BufReader::new(File::open(input).map_err(comp_err)?), on_progress);
        let out = File::create(output).map_err(comp_err)?;
        let mut encoder = zstd::stream::write::Encoder::new(BufWriter::new(out), self.params.level).map_err(comp_err)?;
        encoder.include_checksum(true).map_err(comp_err)?;
        encoder.window_log(window_log).map_err(comp_err)?;
        encoder.long_distance_matching(long).map_err(comp_err)?;
        if self.params.threads > 0 {
            encoder.multithread(self.params.threads).map_err(comp_err)?;
        }

        io::copy(&mut reader, &mut encoder).map_err(comp_err)?;
        let mut writer = encoder.finish().map_err(comp_err)?;
        writer.flush().map_err(comp_err)?;
        writer
            .into_inner()
            .map_err(|e| comp_err(e.into_error()))?
            .sync_all()
            .map_err(comp_err)?;

        let output_size = match fs::metadata(output) {
            Ok(meta) => meta.len(),
            Err(_) => {
                return Err(Error::MissingOutput {
                    path: output.to_path_buf(),
                });
            }
        };
        let report = CompressionReport {
            input_size,
            output_size,
            window_log,
        };
        tracing::info!(
            output = %output.display(),
            size = output_size,
            "compression ratio {:.2}x ({:.1}% saved)",
            report.ratio(),
            report.space_saving_percent()
        );
        Ok(report)
    }

    /// Streaming decoder sized from the artifact's own frame header.
    pub fn open_decoder(&self, input: &Path) -> Result<(FrameHeader, Box<dyn Read>)> {
        let header = read_frame_header(input)?;
        let dec_err = |source: io::Error| Error::Decompression {
            path: input.to_path_buf(),
            source,
        };
        let file = File::open(input).map_err(dec_err)?;
        let mut decoder = zstd::stream::read::Decoder::new(file).map_err(dec_err)?;
        decoder.window_log_max(header.window_log()).map_err(dec_err)?;
        Ok((header, Box::new(decoder)))
    }

    /// Decompress `input` into `output`, returning the decompressed size.
    pub fn decompress(&self, input: &Path, output: &Path) -> Result<u64> {
        let (header, mut decoder) = self.open_decoder(input)?;
        tracing::info!(input = %input.display(), window_log = header.window_log(), "decompressing");
        let dec_err = |source: io::Error| Error::Decompression {
            path: input.to_path_buf(),
            source,
        };
        let mut out = BufWriter::new(File::create(output).map_err(dec_err)?);
        let written = io::copy(&mut decoder, &mut out).map_err(dec_err)?;
        out.into_inner()
            .map_err(|e| dec_err(e.into_error()))?
            .sync_all()
            .map_err(dec_err)?;
        Ok(written)
    }

    /// Validate the frame header without decoding the payload.
    pub fn check_header(&self, path: &Path) -> Result<FrameHeader> {
        let header = read_frame_header(path)?;
        let invalid = |reason: String| Error::InvalidFrame {
            path: path.to_path_buf(),
            reason,
        };
        if header.window_log() > FORMAT_MAX_WINDOW_LOG {
            return Err(invalid(format!("window log {} exceeds the format limit", header.window_log())));
        }
        if !header.has_checksum {
            return Err(invalid("frame carries no content checksum".to_string()));
        }
        Ok(header)
    }

    /// [`check_header`](Self::check_header) reduced to pass/fail.
    pub fn verify_integrity(&self, path: &Path) -> bool {
        match self.check_header(path) {
            Ok(header) => {
                tracing::debug!(path = %path.display(), window_log = header.window_log(), "frame header valid");
                true
            }
            Err(err) => {
                tracing::warn!(%err, "frame header check failed");
                false
            }
        }
    }

    /// Decode the whole artifact to a sink, validating the frame checksum.
    pub fn verify_stream(&self, path: &Path) -> Result<u64> {
        let (_, mut decoder) = self.open_decoder(path)?;
        io::copy(&mut decoder, &mut io::sink()).map_err(|source| Error::Decompression {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Stream the decompressed tar and summarize it.
    pub fn archive_info(&self, path: &Path) -> Result<ArtifactInfo> {
        let compressed_size = fs::metadata(path)
            .map_err(|source| Error::Decompression {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let (header, decoder) = self.open_decoder(path)?;
        let summary = scan_tar(decoder).map_err(|source| Error::UnreadableTar {
            path: path.to_path_buf(),
            source,
        })?;
        let window_log = header.window_log();
        Ok(ArtifactInfo {
            files: summary.files,
            folders: summary.folders,
            total_size: summary.total_size,
            compressed_size,
            window_log,
            memory_required_mb: window_memory_mb(window_log),
        })
    }
}

struct ProgressReader<R, F> {
    inner:       R,
    on_progress: F,
}

impl<R, F> ProgressReader<R, F> {
    fn new(inner: R, on_progress: F) -> Self { Self { inner, on_progress } }
}

impl<R: Read, F: FnMut(u64)> Read for ProgressReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            (self.on_progress)(n as u64);
        }
        Ok(n)
    }
}
