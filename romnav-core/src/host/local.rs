//! Host directories mounted as devices.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use super::zip_container::{first_entry_name, ZipContainer};
use crate::cancel::CancelToken;
use crate::device::{self, DeviceId};
use crate::entry::BrowserEntry;
use crate::error::{BrowserError, BrowserResult};
use crate::path::strip_device;
use crate::rom::ArtifactKind;
use crate::services::{
    ArchiveService, DeviceSwitch, DirectoryLister, FileReader, Notifier, Patcher, RomRunner,
    ZipPeek,
};

/// File name the last loaded image is written to in the output directory.
pub const LOADED_ROM_FILE: &str = "loaded.rom";

/// Maps each device to a host directory.
///
/// Archives are read as ZIP-format containers. Loaded images are written to
/// an optional output directory in place of an emulator.
#[derive(Default)]
pub struct LocalHost {
    mounts: HashMap<DeviceId, PathBuf>,
    open_archive: Option<ZipContainer>,
    output_dir: Option<PathBuf>,
    status: Option<String>,
    progress: Option<String>,
    loaded: Option<Vec<u8>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `device` from `root`.
    pub fn mount(&mut self, device: DeviceId, root: impl Into<PathBuf>) {
        self.mounts.insert(device, root.into());
    }

    pub fn mounted(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self.mounts.keys().copied().collect();
        devices.sort_by_key(|d| d.prefix());
        devices
    }

    /// Where loaded images are written.
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = Some(dir.into());
    }

    /// Last error shown, cleared on read.
    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    /// Image handed over by the last successful load.
    pub fn loaded(&self) -> Option<&[u8]> {
        self.loaded.as_deref()
    }

    /// Host path behind a virtual path.
    pub fn host_path(&self, path: &str) -> Option<PathBuf> {
        let device = device::resolve(path)?;
        let root = self.mounts.get(&device)?;
        let rest = strip_device(path).unwrap_or("").trim_matches('/');
        if rest.is_empty() {
            Some(root.clone())
        } else {
            Some(root.join(rest))
        }
    }

    fn require_host_path(&self, path: &str) -> BrowserResult<PathBuf> {
        self.host_path(path)
            .ok_or_else(|| BrowserError::DeviceNotFound(path.to_string()))
    }
}

impl DirectoryLister for LocalHost {
    fn list(
        &mut self,
        path: &str,
        include_dot_entries: bool,
        cancel: &CancelToken,
    ) -> BrowserResult<Vec<BrowserEntry>> {
        let dir = self.require_host_path(path)?;
        debug!("Listing {} ({})", path, dir.display());

        let mut entries = Vec::new();
        if include_dot_entries {
            entries.push(BrowserEntry::directory(".."));
        }
        for item in std::fs::read_dir(&dir)? {
            if cancel.is_cancelled() {
                return Err(BrowserError::Cancelled);
            }
            let item = item?;
            let name = item.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let meta = item.metadata()?;
            entries.push(if meta.is_dir() {
                BrowserEntry::directory(name)
            } else {
                BrowserEntry::file(name, meta.len())
            });
        }
        Ok(entries)
    }

    fn dir_exists(&mut self, path: &str) -> bool {
        self.host_path(path).map(|p| p.is_dir()).unwrap_or(false)
    }
}

impl ArchiveService for LocalHost {
    fn open_listing(&mut self, path: &str) -> BrowserResult<Vec<BrowserEntry>> {
        let file = self.require_host_path(path)?;
        let data = std::fs::read(&file)
            .map_err(|e| BrowserError::ArchiveOpenFailed(format!("{}: {}", path, e)))?;
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
        self.open_archive = None;
    }
}

impl ZipPeek for LocalHost {
    fn first_entry_name(&mut self, path: &str) -> Option<String> {
        let file = File::open(self.host_path(path)?).ok()?;
        first_entry_name(BufReader::new(file))
    }
}

impl DeviceSwitch for LocalHost {
    fn activate(&mut self, device: DeviceId, silent: bool) -> bool {
        let ok = self.mounts.get(&device).map(|root| root.is_dir()).unwrap_or(false);
        if !ok && !silent {
            self.show_error(&format!("Unable to mount {}", device.root().label));
        }
        ok
    }
}

impl FileReader for LocalHost {
    fn read(
        &mut self,
        path: &str,
        offset: u64,
        max_bytes: usize,
        silent: bool,
    ) -> BrowserResult<Vec<u8>> {
        let host_path = self.require_host_path(path)?;
        let result = read_bounded(&host_path, offset, max_bytes);
        if let Err(e) = &result {
            if !silent {
                self.show_error(&format!("Unable to read {}: {}", path, e));
            }
        }
        result
    }
}

fn read_bounded(path: &Path, offset: u64, max_bytes: usize) -> BrowserResult<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut data = Vec::new();
    file.take(max_bytes as u64).read_to_end(&mut data)?;
    Ok(data)
}

impl Patcher for LocalHost {
    fn apply(&mut self, _rom: &mut Vec<u8>) {}
}

impl RomRunner for LocalHost {
    fn load(&mut self, rom: &[u8]) -> bool {
        if let Some(dir) = &self.output_dir {
            let target = dir.join(LOADED_ROM_FILE);
            if let Err(e) = std::fs::write(&target, rom) {
                error!("Failed to write {}: {}", target.display(), e);
                return false;
            }
            info!("Wrote {} bytes to {}", rom.len(), target.display());
        }
        self.loaded = Some(rom.to_vec());
        true
    }

    fn reset(&mut self) {
        debug!("Reset requested");
    }

    fn restore(&mut self, kind: ArtifactKind, path: &str) -> bool {
        let exists = self.host_path(path).map(|p| p.is_file()).unwrap_or(false);
        info!("Restore {:?} from {}: {}", kind, path, if exists { "found" } else { "none" });
        exists
    }
}

impl Notifier for LocalHost {
    fn show_error(&mut self, message: &str) {
        self.status = Some(message.to_string());
    }

    fn show_progress(&mut self, message: &str) {
        self.progress = Some(message.to_string());
    }

    fn cancel_progress(&mut self) {
        self.progress = None;
    }
}
