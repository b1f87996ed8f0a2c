//! Window sizing and zstd frame header parsing.
//!
//! The window log used at compression time is read back from the frame
//! header so decompression allocates exactly what the encoder assumed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

pub const ZSTD_MAGIC: u32 = 0xFD2F_B528;

/// Smallest window the format can describe.
pub const MIN_WINDOW_LOG: u32 = 10;

/// Largest window a conforming decoder accepts.
pub const FORMAT_MAX_WINDOW_LOG: u32 = 31;

/// Magic, descriptor, window byte, 4-byte dictionary id, 8-byte content size.
const MAX_HEADER_LEN: usize = 18;

const MIB: u64 = 1024 * 1024;

/// Largest window log chosen for big inputs on this target.
///
/// Virtual memory limits on Windows and 32-bit targets keep it below the
/// format maximum of 31.
pub const fn max_window_log() -> u32 {
    match (cfg!(target_pointer_width = "64"), cfg!(windows)) {
        (true, false) => 31,
        (true, true) => 30,
        (false, false) => 30,
        (false, true) => 29,
    }
}

/// Window log for an input of `size` bytes.
///
/// # Examples
///
/// ```
/// use coldstore_codec::window_log_for_size;
///
/// assert_eq!(window_log_for_size(512 * 1024), 20);
/// assert_eq!(window_log_for_size(50 * 1024 * 1024), 27);
/// ```
pub const fn window_log_for_size(size: u64) -> u32 {
    if size < 2 * MIB {
        20
    } else if size < 20 * MIB {
        24
    } else if size < 200 * MIB {
        27
    } else {
        max_window_log()
    }
}

/// Memory needed to hold one window, rounded up to whole MiB.
pub const fn window_memory_mb(window_log: u32) -> u64 { (1_u64 << window_log).div_ceil(MIB) }

/// Decoded zstd frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub window_size:    u64,
    pub content_size:   Option<u64>,
    pub single_segment: bool,
    pub has_checksum:   bool,
    pub dictionary_id:  Option<u32>,
}

impl FrameHeader {
    /// Parse the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        let [m0, m1, m2, m3, descriptor, rest @ ..] = bytes else {
            return Err(format!("truncated header ({} bytes)", bytes.len()));
        };
        let magic = u32::from_le_bytes([*m0, *m1, *m2, *m3]);
        if magic != ZSTD_MAGIC {
            return Err(format!("bad magic 0x{magic:08X}"));
        }

        let fcs_flag = descriptor >> 6;
        let single_segment = descriptor & 0x20 != 0;
        if descriptor & 0x08 != 0 {
            return Err("reserved descriptor bit is set".to_string());
        }
        let has_checksum = descriptor & 0x04 != 0;
        let dict_len = match descriptor & 0x03 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        let fcs_len = match (fcs_flag, single_segment) {
            (0, false) => 0,
            (0, true) => 1,
            (1, _) => 2,
            (2, _) => 4,
            _ => 8,
        };
        let window_len = usize::from(!single_segment);

        let needed = window_len + dict_len + fcs_len;
        if rest.len() < needed {
            return Err(format!("truncated header: need {needed} more bytes, have {}", rest.len()));
        }
        let (window_bytes, rest) = rest.split_at(window_len);
        let (dict_bytes, rest) = rest.split_at(dict_len);
        let fcs_bytes = &rest[..fcs_len];

        let dictionary_id = (dict_len > 0).then(|| le_uint(dict_bytes) as u32);
        let content_size = match fcs_len {
            0 => None,
            2 => Some(le_uint(fcs_bytes) + 256),
            _ => Some(le_uint(fcs_bytes)),
        };

        let window_size = match window_bytes {
            [byte] => {
                let exponent = u32::from(byte >> 3);
                let mantissa = u64::from(byte & 0x07);
                let base = 1_u64 << (MIN_WINDOW_LOG + exponent);
                base + (base / 8) * mantissa
            }
            _ => content_size.unwrap_or(0),
        };

        Ok(Self {
            window_size,
            content_size,
            single_segment,
            has_checksum,
            dictionary_id,
        })
    }

    /// Smallest `log2` covering the window, never below [`MIN_WINDOW_LOG`].
    pub fn window_log(&self) -> u32 {
        let bits = if self.window_size <= 1 {
            0
        } else {
            u64::BITS - (self.window_size - 1).leading_zeros()
        };
        bits.max(MIN_WINDOW_LOG)
    }
}

fn le_uint(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// Read and parse the frame header of the file at `path`.
pub fn read_frame_header(path: &Path) -> Result<FrameHeader> {
    let mut buf = Vec::with_capacity(MAX_HEADER_LEN);
    File::open(path)
        .and_then(|f| f.take(MAX_HEADER_LEN as u64).read_to_end(&mut buf))
        .map_err(|source| Error::Decompression {
            path: path.to_path_buf(),
            source,
        })?;
    FrameHeader::parse(&buf).map_err(|reason| Error::InvalidFrame {
        path: path.to_path_buf(),
        reason,
    })
}
