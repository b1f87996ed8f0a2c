//! RAR through an external `unrar`-compatible tool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use coldstore_platform::{Command, CommandOutput, locate_any};

use crate::entry::{ArchiveEntry, ExtractReport};
use crate::error::{Error, Result};
use crate::sanitize::{is_safe_entry_path, normalize_entry_path};

pub const CANDIDATES: [&str; 4] = ["unrar", "rar", "unrar-nonfree", "unrar-free"];

pub const REMEDIATION: &str = "Install a RAR extractor:
  macOS:         brew install unrar
  Ubuntu/Debian: sudo apt install unrar
  Windows:       download from https://www.rarlab.com/
Alternatively extract the archive manually and pack the resulting folder.";

const LIST_TIMEOUT: Duration = Duration::from_secs(120);
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(3600);

struct Tool {
    name: &'static str,
    exe:  PathBuf,
}

fn tool_for(path: &Path) -> Result<Tool> {
    locate_any(&CANDIDATES)
        .map(|(name, exe)| Tool { name, exe })
        .ok_or_else(|| Error::ToolUnavailable {
            path:        path.to_path_buf(),
            remediation: REMEDIATION,
        })
}

fn run(tool: &Tool, path: &Path, args: Vec<String>, limit: Duration) -> Result<CommandOutput> {
    let output = Command::at(tool.name, &tool.exe)
        .args(args)
        .timeout(limit)
        .run()
        .map_err(|err| match err {
            coldstore_platform::Error::CommandNotFound { .. } => Error::ToolUnavailable {
                path:        path.to_path_buf(),
                remediation: REMEDIATION,
            },
            other => Error::ToolFailed {
                tool:        tool.name.to_string(),
                path:        path.to_path_buf(),
                stderr:      other.to_string(),
                remediation: REMEDIATION,
            },
        })?;
    if !output.success() {
        return Err(Error::ToolFailed {
            tool:        tool.name.to_string(),
            path:        path.to_path_buf(),
            stderr:      output.stderr.trim().to_string(),
            remediation: REMEDIATION,
        });
    }
    Ok(output)
}

/// Technical listing (`vt`) of every entry, unsafe ones included.
fn raw_listing(tool: &Tool, path: &Path) -> Result<Vec<ArchiveEntry>> {
    let args = vec!["vt".into(), "-p-".into(), "-y".into(), path.display().to_string()];
    let output = run(tool, path, args, LIST_TIMEOUT)?;
    Ok(parse_technical_listing(&output.stdout))
}

pub(crate) fn list(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let tool = tool_for(path)?;
    tracing::debug!(tool = tool.name, archive = %path.display(), "listing RAR archive");
    raw_listing(&tool, path)
}

pub(crate) fn extract(path: &Path, dest: &Path) -> Result<ExtractReport> {
    let tool = tool_for(path)?;
    let entries = raw_listing(&tool, path)?;

    let mut report = ExtractReport::default();
    let mut args: Vec<String> = vec!["x".into(), "-y".into(), "-o+".into(), "-p-".into()];
    for entry in &entries {
        if is_safe_entry_path(&entry.path) {
            if entry.is_directory {
                report.directories += 1;
            } else {
                report.files += 1;
                report.bytes += entry.size;
            }
        } else {
            tracing::warn!(entry = %entry.path, "excluding unsafe RAR entry");
            args.push(format!("-x{}", entry.path));
            report.skipped.push(entry.path.clone());
        }
    }
    args.push(path.display().to_string());
    // A trailing separator marks the destination as a directory for unrar.
    args.push(format!("{}{}", dest.display(), std::path::MAIN_SEPARATOR));

    run(&tool, path, args, EXTRACT_TIMEOUT)?;
    Ok(report)
}

/// Parse `unrar vt` output into entries.
///
/// Each record starts at a `Name:` line; `Type`, `Size` and `Packed size`
/// lines refine it. Unknown lines are ignored.
pub fn parse_technical_listing(stdout: &str) -> Vec<ArchiveEntry> {
    let mut entries = Vec::new();
    let mut current: Option<ArchiveEntry> = None;

    for line in stdout.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => {
                entries.extend(current.take());
                current = Some(ArchiveEntry::file(normalize_entry_path(value), 0));
            }
            "Type" => {
                if let Some(entry) = current.as_mut() {
                    entry.is_directory = value.eq_ignore_ascii_case("directory");
                }
            }
            "Size" => {
                if let (Some(entry), Ok(size)) = (current.as_mut(), value.parse()) {
                    entry.size = size;
                }
            }
            "Packed size" => {
                if let (Some(entry), Ok(size)) = (current.as_mut(), value.parse()) {
                    entry.compressed_size = Some(size);
                }
            }
            _ => {}
        }
    }
    entries.extend(current);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "
UNRAR 7.00 freeware      Copyright (c) 1993-2024 Alexander Roshal

Archive: photos.rar
Details: RAR 5

        Name: photos
        Type: Directory
       mtime: 2024-01-02 10:00:00,000
  Attributes: drwxr-xr-x

        Name: photos/cat.jpg
        Type: File
        Size: 20480
 Packed size: 19000
       Ratio: 92%
       mtime: 2024-01-02 10:00:00,000
  Attributes: -rw-r--r--
     CRC32: 1234ABCD

        Name: ../outside.txt
        Type: File
        Size: 5
 Packed size: 5
";

    #[test]
    fn parses_records() {
        let entries = parse_technical_listing(LISTING);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ArchiveEntry::directory("photos"));
        assert_eq!(entries[1], ArchiveEntry::file("photos/cat.jpg", 20480).with_compressed_size(19000));
        assert_eq!(entries[2].path, "../outside.txt");
    }

    #[test]
    fn empty_listing() {
        assert!(parse_technical_listing("Archive: empty.rar\n").is_empty());
    }

    #[test]
    fn remediation_mentions_every_platform() {
        for needle in ["brew install unrar", "sudo apt install unrar", "rarlab.com", "manually"] {
            assert!(REMEDIATION.contains(needle), "{needle}");
        }
    }
}
