//! In-memory host for tests and headless runs.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{self, Cursor};

use super::zip_container::{first_entry_name, zip_bytes, ZipContainer};
use crate::cancel::CancelToken;
use crate::device::{self, DeviceId};
use crate::entry::BrowserEntry;
use crate::error::{BrowserError, BrowserResult};
use crate::path::{normalize, split_last_segment, SEPARATOR};
use crate::rom::ArtifactKind;
use crate::services::{
    ArchiveService, DeviceSwitch, DirectoryLister, FileReader, Notifier, Patcher, RomRunner,
    ZipPeek,
};

/// Every collaborator backed by in-memory maps.
///
/// Files are keyed by their full virtual path (`sd:/games/a.nes`); adding a
/// file creates its folders. Everything the browser reports or hands over is
/// recorded for inspection.
#[derive(Default)]
pub struct MemoryHost {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    offline: HashSet<DeviceId>,
    open_archive: Option<ZipContainer>,
    /// Errors shown to the user.
    pub errors: Vec<String>,
    /// Progress messages shown to the user.
    pub progress: Vec<String>,
    pub progress_active: bool,
    /// Images handed to the emulator.
    pub loaded: Vec<Vec<u8>>,
    /// Save artifacts the emulator was asked to restore.
    pub restored: Vec<(ArtifactKind, String)>,
    pub resets: usize,
    pub halts: usize,
    pub archives_closed: usize,
    pub active_device: Option<DeviceId>,
    /// Make the emulator reject every image.
    pub reject_roms: bool,
    /// Bytes appended by the patcher.
    pub patch: Vec<u8>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its folders.
    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        let path = normalize(path);
        if let Some((parent, _)) = split_last_segment(&path) {
            self.add_dir(parent);
        }
        self.files.insert(path, data.into());
    }

    /// Add an empty folder and its parents.
    pub fn add_dir(&mut self, path: &str) {
        let mut dir = normalize(path);
        if !dir.ends_with(SEPARATOR) {
            dir.push(SEPARATOR);
        }
        loop {
            if !self.dirs.insert(dir.clone()) {
                break;
            }
            match split_last_segment(&dir) {
                Some((parent, _)) => dir = parent.to_string(),
                None => break,
            }
        }
    }

    /// Add a ZIP-format container holding `files`.
    pub fn add_zip(&mut self, path: &str, files: &[(&str, &[u8])]) -> BrowserResult<()> {
        let data = zip_bytes(files)?;
        self.add_file(path, data);
        Ok(())
    }

    /// Drop a file; its folders stay.
    pub fn remove_file(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(&normalize(path))
    }

    /// Make a device fail activation.
    pub fn set_offline(&mut self, device: DeviceId) {
        self.offline.insert(device);
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(&normalize(path)).map(|v| v.as_slice())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(|s| s.as_str())
    }

    fn parent_of(path: &str) -> Option<&str> {
        split_last_segment(path).map(|(parent, _)| parent)
    }
}

impl DirectoryLister for MemoryHost {
    fn list(
        &mut self,
        path: &str,
        include_dot_entries: bool,
        cancel: &CancelToken,
    ) -> BrowserResult<Vec<BrowserEntry>> {
        let mut dir = normalize(path);
        if !dir.ends_with(SEPARATOR) {
            dir.push(SEPARATOR);
        }
        if !self.dirs.contains(&dir) {
            return Err(io::Error::new(io::ErrorKind::NotFound, dir).into());
        }

        let mut entries = Vec::new();
        if include_dot_entries {
            entries.push(BrowserEntry::directory(".."));
        }
        for sub in &self.dirs {
            if cancel.is_cancelled() {
                return Err(BrowserError::Cancelled);
            }
            if Self::parent_of(sub) == Some(dir.as_str()) {
                if let Some((_, name)) = split_last_segment(sub) {
                    entries.push(BrowserEntry::directory(name));
                }
            }
        }
        for (file, data) in &self.files {
            if cancel.is_cancelled() {
                return Err(BrowserError::Cancelled);
            }
            if Self::parent_of(file) == Some(dir.as_str()) {
                if let Some((_, name)) = split_last_segment(file) {
                    entries.push(BrowserEntry::file(name, data.len() as u64));
                }
            }
        }
        Ok(entries)
    }

    fn dir_exists(&mut self, path: &str) -> bool {
        let mut dir = normalize(path);
        if !dir.ends_with(SEPARATOR) {
            dir.push(SEPARATOR);
        }
        self.dirs.contains(&dir)
    }

    fn halt(&mut self) {
        self.halts += 1;
    }
}

impl ArchiveService for MemoryHost {
    fn open_listing(&mut self, path: &str) -> BrowserResult<Vec<BrowserEntry>> {
        let data = self
            .files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| BrowserError::ArchiveOpenFailed(format!("{} not found", path)))?;
        let mut container = ZipContainer::from_bytes(data)?;
        let entries = container.entries()?;
        self.open_archive = Some(container);
        Ok(entries)
    }

    fn extract(&mut self, name: &str) -> BrowserResult<Vec<u8>> {
        match self.open_archive.as_mut() {
            Some(container) => container.extract(name),
            None => Err(BrowserError::ArchiveOpenFailed("no archive open".to_string())),
        }
    }

    fn close(&mut self) {
        if self.open_archive.take().is_some() {
            self.archives_closed += 1;
        }
    }
}

impl ZipPeek for MemoryHost {
    fn first_entry_name(&mut self, path: &str) -> Option<String> {
        let data = self.files.get(&normalize(path))?;
        first_entry_name(Cursor::new(data.as_slice()))
    }
}

impl DeviceSwitch for MemoryHost {
    fn activate(&mut self, device: DeviceId, _silent: bool) -> bool {
        if self.offline.contains(&device) || !self.dirs.contains(device.prefix()) {
            return false;
        }
        self.active_device = Some(device);
        true
    }
}

impl FileReader for MemoryHost {
    fn read(
        &mut self,
        path: &str,
        offset: u64,
        max_bytes: usize,
        silent: bool,
    ) -> BrowserResult<Vec<u8>> {
        let result = if device::resolve(path).is_some_and(|d| self.offline.contains(&d)) {
            Err(BrowserError::DeviceNotFound(path.to_string()))
        } else {
            match self.files.get(&normalize(path)) {
                Some(data) => {
                    let start = (offset as usize).min(data.len());
                    let end = start.saturating_add(max_bytes).min(data.len());
                    Ok(data[start..end].to_vec())
                }
                None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()).into()),
            }
        };
        if let Err(e) = &result {
            if !silent {
                self.show_error(&format!("Unable to read {}: {}", path, e));
            }
        }
        result
    }
}

impl Patcher for MemoryHost {
    fn apply(&mut self, rom: &mut Vec<u8>) {
        rom.extend_from_slice(&self.patch);
    }
}

impl RomRunner for MemoryHost {
    fn load(&mut self, rom: &[u8]) -> bool {
        if self.reject_roms {
            return false;
        }
        self.loaded.push(rom.to_vec());
        true
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn restore(&mut self, kind: ArtifactKind, path: &str) -> bool {
        self.restored.push((kind, path.to_string()));
        self.files.contains_key(path)
    }
}

impl Notifier for MemoryHost {
    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn show_progress(&mut self, message: &str) {
        self.progress.push(message.to_string());
        self.progress_active = true;
    }

    fn cancel_progress(&mut self) {
        self.progress_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[BrowserEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.filename.as_str()).collect()
    }

    #[test]
    fn test_add_file_creates_dirs() {
        let mut host = MemoryHost::new();
        host.add_file("sd:/games/nes/a.nes", vec![1, 2]);

        assert!(host.dir_exists("sd:/"));
        assert!(host.dir_exists("sd:/games"));
        assert!(host.dir_exists("sd:/games/nes/"));
        assert!(!host.dir_exists("usb:/"));
        assert_eq!(host.file("sd:/games/nes/a.nes"), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_list_children() {
        let mut host = MemoryHost::new();
        host.add_file("sd:/games/a.nes", vec![1]);
        host.add_file("sd:/games/sub/b.nes", vec![2]);
        host.add_file("sd:/other.txt", vec![3]);

        let token = CancelToken::new();
        let entries = host.list("sd:/games/", true, &token).unwrap();
        assert_eq!(names(&entries), vec!["..", "sub", "a.nes"]);
        assert!(entries[1].is_directory);
        assert_eq!(entries[2].length, 1);

        assert!(host.list("sd:/missing/", true, &token).is_err());
    }

    #[test]
    fn test_list_cancelled() {
        let mut host = MemoryHost::new();
        host.add_file("sd:/a.nes", vec![1]);
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            host.list("sd:/", false, &token),
            Err(BrowserError::Cancelled)
        ));
    }

    #[test]
    fn test_activate() {
        let mut host = MemoryHost::new();
        host.add_dir("usb:/");
        assert!(host.activate(DeviceId::Usb, true));
        assert_eq!(host.active_device, Some(DeviceId::Usb));
        assert!(!host.activate(DeviceId::Sd, true));

        host.set_offline(DeviceId::Usb);
        assert!(!host.activate(DeviceId::Usb, true));
    }

    #[test]
    fn test_read_bounded() {
        let mut host = MemoryHost::new();
        host.add_file("sd:/big.nes", vec![7u8; 100]);
        assert_eq!(host.read("sd:/big.nes", 0, 10, true).unwrap().len(), 10);
        assert_eq!(host.read("sd:/big.nes", 95, 10, true).unwrap().len(), 5);
        assert!(host.read("sd:/none.nes", 0, 10, true).is_err());
        assert!(host.errors.is_empty());

        assert!(host.read("sd:/none.nes", 0, 10, false).is_err());
        assert_eq!(host.errors.len(), 1);
    }

    #[test]
    fn test_archive_roundtrip() {
        let mut host = MemoryHost::new();
        host.add_zip("sd:/pack.7z", &[("a.nes", &b"NES\x1Aa"[..]), ("b.nes", &b"NES\x1Ab"[..])])
            .unwrap();

        let entries = host.open_listing("sd:/pack.7z").unwrap();
        assert_eq!(names(&entries), vec!["a.nes", "b.nes"]);
        assert_eq!(host.extract("b.nes").unwrap(), b"NES\x1Ab");

        host.close();
        assert_eq!(host.archives_closed, 1);
        assert!(host.extract("a.nes").is_err());
    }
}
