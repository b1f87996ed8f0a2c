use std::path::{Path, PathBuf};

/// Longest component accepted by common filesystems, in bytes.
pub const MAX_COMPONENT_LEN: usize = 255;

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Result of mapping an archive entry onto the destination.
#[derive(Clone, Debug)]
pub struct SanitizedPath {
    pub original: String,
    pub relative: String,
    pub resolved: PathBuf,
}

impl SanitizedPath {
    pub fn renamed(&self) -> bool { self.original != self.relative }
}

/// Whether Windows filename rules must be applied on this host.
pub fn needs_windows_sanitization() -> bool { cfg!(windows) }

/// Forward slashes, no `.` components, no leading `./` or trailing `/`.
pub fn normalize_entry_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let joined = unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/");
    if absolute { format!("/{joined}") } else { joined }
}

/// Relative, non-empty and free of `..` components.
pub fn is_safe_entry_path(path: &str) -> bool {
    let unified = path.replace('\\', "/");
    if unified.is_empty() || unified.starts_with('/') || has_drive_prefix(&unified) {
        return false;
    }
    let mut parts = unified.split('/').filter(|p| !p.is_empty() && *p != ".").peekable();
    if parts.peek().is_none() {
        return false;
    }
    parts.all(|part| part != "..")
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Make one path component valid on Windows.
///
/// Forbidden and control characters become `_`, trailing dots and spaces are
/// dropped, reserved device names gain a `_file` suffix and the result is
/// capped at [`MAX_COMPONENT_LEN`] bytes keeping the extension.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_ascii_control() { '_' } else { c })
        .collect();
    let mut sanitized = replaced.trim_end_matches(['.', ' ']).to_string();

    let (stem, ext) = split_extension(&sanitized);
    let upper = stem.to_ascii_uppercase();
    if RESERVED.contains(&upper.as_str()) {
        sanitized = format!("{upper}_file{ext}");
    }

    if sanitized.len() > MAX_COMPONENT_LEN {
        let (stem, ext) = split_extension(&sanitized);
        sanitized = if ext.len() < MAX_COMPONENT_LEN {
            format!("{}{ext}", truncate_bytes(stem, MAX_COMPONENT_LEN - ext.len()))
        } else {
            truncate_bytes(&sanitized, MAX_COMPONENT_LEN).to_string()
        };
    }

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        sanitized = "renamed_file".to_string();
    }
    sanitized
}

/// Apply [`sanitize_component`] to every component of a relative path.
pub fn sanitize_relative_path(path: &str) -> String {
    let parts: Vec<String> = path
        .split('/')
        .filter(|p| !p.is_empty())
        .map(sanitize_component)
        .collect();
    if parts.is_empty() {
        "extracted_file".to_string()
    } else {
        parts.join("/")
    }
}

/// Map `raw` under `dest`, or `None` when the traversal guard refuses it.
///
/// Refusals and renames are logged here so every handler reports them the
/// same way.
pub fn sanitize_entry(dest: &Path, raw: &str, windows_rules: bool) -> Option<SanitizedPath> {
    if !is_safe_entry_path(raw) {
        tracing::warn!(entry = raw, "skipping entry outside the extraction root");
        return None;
    }
    let normalized = normalize_entry_path(raw);
    let relative = if windows_rules {
        sanitize_relative_path(&normalized)
    } else {
        normalized.clone()
    };
    if relative != normalized {
        tracing::info!("renamed {normalized} -> {relative}");
    }
    let resolved = relative.split('/').fold(dest.to_path_buf(), |acc, part| acc.join(part));
    Some(SanitizedPath {
        original: normalized,
        relative,
        resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_base_path() -> &'static Path {
        if cfg!(windows) {
            Path::new("C:/opt/extract")
        } else {
            Path::new("/opt/extract")
        }
    }

    #[test]
    fn safe_paths() {
        assert!(is_safe_entry_path("a.txt"));
        assert!(is_safe_entry_path("dir/sub/file"));
        assert!(is_safe_entry_path("./dir/file"));
        assert!(is_safe_entry_path("dir/"));
        assert!(is_safe_entry_path("weird..name"));
    }

    #[test]
    fn unsafe_paths() {
        assert!(!is_safe_entry_path("/etc/passwd"));
        assert!(!is_safe_entry_path("../escape"));
        assert!(!is_safe_entry_path("a/../../b"));
        assert!(!is_safe_entry_path("a\\..\\b"));
        assert!(!is_safe_entry_path("C:/Windows"));
        assert!(!is_safe_entry_path(""));
        assert!(!is_safe_entry_path("./"));
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_entry_path("./a//b/./c/"), "a/b/c");
        assert_eq!(normalize_entry_path("dir\\file.txt"), "dir/file.txt");
    }

    #[test]
    fn forbidden_characters_replaced() {
        assert_eq!(sanitize_component("a<b>c:d\"e|f?g*h"), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_component("tab\there"), "tab_here");
        assert_eq!(sanitize_component("del\u{7f}"), "del_");
    }

    #[test]
    fn trailing_dots_and_spaces_stripped() {
        assert_eq!(sanitize_component("name. . "), "name");
        assert_eq!(sanitize_component("..."), "renamed_file");
    }

    #[test]
    fn reserved_names_suffixed() {
        assert_eq!(sanitize_component("CON"), "CON_file");
        assert_eq!(sanitize_component("con.txt"), "CON_file.txt");
        assert_eq!(sanitize_component("LPT9.log"), "LPT9_file.log");
        assert_eq!(sanitize_component("console.txt"), "console.txt");
    }

    #[test]
    fn long_component_keeps_extension() {
        let long = format!("{}.dat", "x".repeat(300));
        let sanitized = sanitize_component(&long);
        assert_eq!(sanitized.len(), MAX_COMPONENT_LEN);
        assert!(sanitized.ends_with(".dat"));
    }

    #[test]
    fn long_multibyte_component_stays_valid_utf8() {
        let long = "é".repeat(200);
        let sanitized = sanitize_component(&long);
        assert!(sanitized.len() <= MAX_COMPONENT_LEN);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn sanitize_entry_rejects_traversal() {
        assert!(sanitize_entry(test_base_path(), "../../etc/passwd", false).is_none());
        assert!(sanitize_entry(test_base_path(), "/abs", true).is_none());
    }

    #[test]
    fn sanitize_entry_passthrough_without_windows_rules() {
        let out = sanitize_entry(test_base_path(), "dir/aux:1.txt", false).unwrap();
        assert_eq!(out.relative, "dir/aux:1.txt");
        assert!(!out.renamed());
        assert!(out.resolved.starts_with(test_base_path()));
    }

    #[test]
    fn sanitize_entry_with_windows_rules() {
        let out = sanitize_entry(test_base_path(), "dir./AUX.txt", true).unwrap();
        assert_eq!(out.relative, "dir/AUX_file.txt");
        assert!(out.renamed());
        assert_eq!(out.resolved, test_base_path().join("dir").join("AUX_file.txt"));
    }

    proptest! {
        #[test]
        fn sanitized_components_are_windows_valid(name in "\\PC{0,300}") {
            let out = sanitize_component(&name);
            prop_assert!(!out.is_empty());
            prop_assert!(out.len() <= MAX_COMPONENT_LEN);
            prop_assert!(!out.chars().any(|c| FORBIDDEN.contains(&c) || c.is_ascii_control()));
            prop_assert!(!out.ends_with('.') && !out.ends_with(' '));
        }

        #[test]
        fn safe_paths_resolve_under_base(parts in proptest::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6)) {
            let raw = parts.join("/");
            if let Some(out) = sanitize_entry(test_base_path(), &raw, true) {
                prop_assert!(out.resolved.starts_with(test_base_path()));
                prop_assert!(!out.relative.split('/').any(|p| p == ".."));
            }
        }
    }
}
