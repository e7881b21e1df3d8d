//! Path canonicalization and bounded path construction.
//!
//! Browser paths are virtual: `<device>:/<folder>/.../<name>`. They use `/`
//! as the only separator and never exceed [`MAX_PATH_LEN`] bytes.

use crate::device::DEVICE_ROOTS;
use crate::error::{BrowserError, BrowserResult};

/// Longest path, in bytes, the browser will hold or build.
pub const MAX_PATH_LEN: usize = 1024;

/// Path separator used by every device.
pub const SEPARATOR: char = '/';

/// Canonicalize a path.
///
/// - Replaces `\` with `/`
/// - Collapses runs of `/` into one
/// - Silently truncates at [`MAX_PATH_LEN`] bytes
///
/// Truncation is lossy; callers that build paths should go through
/// [`PathBuilder`] so overlong paths are rejected before they get here.
///
/// # Examples
/// ```
/// use romnav_core::path::normalize;
/// assert_eq!(normalize("sd:\\games\\\\nes//"), "sd:/games/nes/");
/// ```
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len().min(MAX_PATH_LEN));
    for ch in path.chars() {
        let ch = if ch == '\\' { SEPARATOR } else { ch };
        if ch == SEPARATOR && out.ends_with(SEPARATOR) {
            continue;
        }
        if out.len() + ch.len_utf8() > MAX_PATH_LEN {
            break;
        }
        out.push(ch);
    }
    out
}

/// True iff `path` names exactly one of the device roots (e.g. `sd:/`).
pub fn is_device_root(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    DEVICE_ROOTS.iter().any(|root| root.prefix == path)
}

/// Everything after the device token (`sd:/games/nes/` -> `games/nes/`).
///
/// Returns `None` when the path carries no device token.
pub fn strip_device(path: &str) -> Option<&str> {
    path.find(":/").map(|pos| &path[pos + 2..])
}

/// Extension of a file name, without the dot.
///
/// Names without a stem (".nes") or without a dot have no extension.
pub fn extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Case-insensitive check of a file name against a list of extensions.
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    extension(name)
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Strip the extension from a file name (`Zelda.nes` -> `Zelda`).
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Bounds-checked path builder.
///
/// Every push computes the resulting length first and fails with
/// [`BrowserError::PathTooLong`] instead of truncating, leaving the builder
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    buf: String,
    limit: usize,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::with_limit(MAX_PATH_LEN)
    }

    /// Builder with a custom length limit.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: String::new(),
            limit,
        }
    }

    /// Start from an existing path.
    pub fn from_path(path: &str) -> BrowserResult<Self> {
        let mut builder = Self::new();
        builder.push(path)?;
        Ok(builder)
    }

    /// Append raw text.
    pub fn push(&mut self, part: &str) -> BrowserResult<&mut Self> {
        let total = self.buf.len() + part.len();
        if total > self.limit {
            return Err(BrowserError::PathTooLong(format!("{}{}", self.buf, part)));
        }
        self.buf.push_str(part);
        Ok(self)
    }

    /// Append a segment followed by a separator (`name/`).
    pub fn push_dir(&mut self, name: &str) -> BrowserResult<&mut Self> {
        let total = self.buf.len() + name.len() + SEPARATOR.len_utf8();
        if total > self.limit {
            return Err(BrowserError::PathTooLong(format!(
                "{}{}{}",
                self.buf, name, SEPARATOR
            )));
        }
        self.buf.push_str(name);
        self.buf.push(SEPARATOR);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Finish and canonicalize.
    pub fn build(self) -> String {
        normalize(&self.buf)
    }
}

/// Split a directory path into its parent and last segment.
///
/// `sd:/games/foo/` -> (`sd:/games/`, `foo`). Trailing separators are
/// ignored, so `sd:/games/foo` gives the same result. Returns `None` when
/// there is no segment left to remove.
pub fn split_last_segment(dir: &str) -> Option<(&str, &str)> {
    let trimmed = dir.trim_end_matches(SEPARATOR);
    let pos = trimmed.rfind(SEPARATOR)?;
    let name = &trimmed[pos + 1..];
    if name.is_empty() {
        return None;
    }
    Some((&dir[..=pos], name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize("sd:\\games\\nes\\"), "sd:/games/nes/");
        assert_eq!(normalize("sd://games///nes//"), "sd:/games/nes/");
        assert_eq!(normalize("usb:/\\/roms"), "usb:/roms");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "sd:/",
            "sd://a//b\\\\c/",
            "\\\\\\",
            "smb:/share/Games (USA)/x.zip",
            "////",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {:?}", input);
            assert!(!once.contains('\\'));
            assert!(!once.contains("//"));
        }
    }

    #[test]
    fn test_normalize_truncates() {
        let long = format!("sd:/{}", "a".repeat(MAX_PATH_LEN * 2));
        let out = normalize(&long);
        assert_eq!(out.len(), MAX_PATH_LEN);
        assert_eq!(normalize(&out), out);
    }

    #[test]
    fn test_is_device_root() {
        assert!(is_device_root("sd:/"));
        assert!(is_device_root("usb:/"));
        assert!(is_device_root("gcloader:/"));
        assert!(!is_device_root("sd:/games/"));
        assert!(!is_device_root("sd:"));
        assert!(!is_device_root(""));
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension("game.nes"), Some("nes"));
        assert_eq!(extension("Game.Name.ZIP"), Some("ZIP"));
        assert_eq!(extension(".nes"), None);
        assert_eq!(extension("noext"), None);
        assert_eq!(strip_extension("Zelda.nes"), "Zelda");
        assert_eq!(strip_extension("Super Game (USA).zip"), "Super Game (USA)");
        assert_eq!(strip_extension("README"), "README");

        let exts = vec!["nes".to_string(), "fds".to_string()];
        assert!(has_extension("GAME.NES", &exts));
        assert!(!has_extension("game.txt", &exts));
    }

    #[test]
    fn test_strip_device() {
        assert_eq!(strip_device("sd:/games/nes/"), Some("games/nes/"));
        assert_eq!(strip_device("sd:/"), Some(""));
        assert_eq!(strip_device("games"), None);
    }

    #[test]
    fn test_path_builder_rejects_overflow() {
        let mut builder = PathBuilder::with_limit(10);
        builder.push("sd:/").unwrap();
        builder.push_dir("abcd").unwrap();
        assert_eq!(builder.as_str(), "sd:/abcd/");

        let err = builder.push_dir("x").unwrap_err();
        assert!(matches!(err, BrowserError::PathTooLong(_)));
        // Unchanged after failure
        assert_eq!(builder.as_str(), "sd:/abcd/");
        builder.push("x").unwrap();
        assert_eq!(builder.len(), 10);
    }

    #[test]
    fn test_split_last_segment() {
        assert_eq!(
            split_last_segment("sd:/games/foo/"),
            Some(("sd:/games/", "foo"))
        );
        assert_eq!(split_last_segment("sd:/games/foo"), Some(("sd:/games/", "foo")));
        assert_eq!(split_last_segment("sd:/games/"), Some(("sd:/", "games")));
        assert_eq!(split_last_segment("sd:/"), None);
    }
}
