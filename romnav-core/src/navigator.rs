//! Navigation state machine.
//!
//! The browser is always in one of three states:
//! - `DeviceSelect`: no directory, the listing shows device roots
//! - `Directory`: a real directory on one device
//! - `Archive`: the contents of an open archive container
//!
//! Every directory change halts the previous listing, canonicalizes the new
//! path, relists, re-selects the last loaded file and records the location in
//! the session configuration. A listing that comes back empty falls back to
//! the device roots, so the browser never ends up on an empty screen.

use log::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::{BrowserOptions, SessionConfig};
use crate::device::{self, DeviceId, DeviceKind};
use crate::entry::{BrowserEntry, EntryStore};
use crate::error::{BrowserError, BrowserResult};
use crate::path::{
    has_extension, is_device_root, normalize, split_last_segment, strip_device, strip_extension,
    PathBuilder, SEPARATOR,
};
use crate::rom::LoadedRom;
use crate::services::Host;

/// Where the browser currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    DeviceSelect,
    Directory,
    Archive,
}

/// How to leave an open archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveContext {
    /// Full path of the container file.
    pub source_path: String,
    /// Container file name (`Games.7z`).
    pub file_name: String,
    /// Container file name without extension.
    pub base_name: String,
    /// Directory that was open before entering.
    pub parent_directory: String,
}

/// The single navigation context.
#[derive(Debug, Clone, Default)]
pub struct BrowserState {
    /// Canonical path; empty while selecting a device.
    pub current_directory: String,
    pub listing: EntryStore,
    pub archive: Option<ArchiveContext>,
}

/// Result of activating the selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A new listing is shown; holds its entry count.
    Listed(usize),
    /// A ROM was handed to the emulator.
    Loaded(LoadedRom),
}

/// File browser over a [`Host`].
pub struct Browser<H: Host> {
    pub(crate) host: H,
    pub(crate) options: BrowserOptions,
    pub(crate) config: SessionConfig,
    pub(crate) config_changed: bool,
    pub(crate) state: BrowserState,
    /// Token of the listing started last.
    listing_token: Option<CancelToken>,
    /// Name of the loaded ROM without extension; names save artifacts.
    pub(crate) rom_base_name: String,
}

impl<H: Host> Browser<H> {
    pub fn new(host: H, options: BrowserOptions, config: SessionConfig) -> Self {
        let state = BrowserState {
            listing: EntryStore::with_capacity(options.max_entries),
            ..BrowserState::default()
        };
        Self {
            host,
            options,
            config,
            config_changed: false,
            state,
            listing_token: None,
            rom_base_name: String::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Mutable configuration; marks it changed.
    pub fn config_mut(&mut self) -> &mut SessionConfig {
        self.config_changed = true;
        &mut self.config
    }

    /// Whether the configuration changed since the last call.
    pub fn take_config_changed(&mut self) -> bool {
        std::mem::take(&mut self.config_changed)
    }

    pub fn current_directory(&self) -> &str {
        &self.state.current_directory
    }

    pub fn entries(&self) -> &[BrowserEntry] {
        self.state.listing.entries()
    }

    pub fn selected_index(&self) -> usize {
        self.state.listing.selected_index
    }

    pub fn page_index(&self) -> usize {
        self.state.listing.page_index
    }

    pub fn selected(&self) -> Option<&BrowserEntry> {
        self.state.listing.selected()
    }

    pub fn in_archive_mode(&self) -> bool {
        self.state.archive.is_some()
    }

    pub fn nav_state(&self) -> NavState {
        if self.state.archive.is_some() {
            NavState::Archive
        } else if self.state.current_directory.is_empty() {
            NavState::DeviceSelect
        } else {
            NavState::Directory
        }
    }

    /// Base name of the last loaded ROM.
    pub fn rom_base_name(&self) -> &str {
        &self.rom_base_name
    }

    /// Put the cursor on `index` (clamped).
    pub fn select_index(&mut self, index: usize) {
        self.state.listing.select(index);
    }

    /// Move the cursor by `delta` entries (clamped).
    pub fn move_selection(&mut self, delta: isize) {
        let current = self.state.listing.selected_index;
        let target = current.saturating_add_signed(delta);
        self.state.listing.select(target);
    }

    /// Clear the listing and cursor.
    pub fn reset(&mut self) {
        self.state.listing.reset();
    }

    /// Log and show an error, handing it back for propagation.
    pub(crate) fn report(&mut self, err: BrowserError) -> BrowserError {
        warn!("{}", err);
        self.host.show_error(&err.to_string());
        err
    }

    pub(crate) fn set_last_loaded(&mut self, name: &str) {
        self.config.last_file_loaded = name.to_string();
        self.config_changed = true;
    }

    /// Act on the selected entry: open it, leave through it, or load it.
    pub fn activate(&mut self) -> BrowserResult<Activation> {
        let Some(entry) = self.state.listing.selected().cloned() else {
            return Ok(Activation::Listed(0));
        };

        if self.state.archive.is_some() {
            if self.state.listing.selected_index == 0 {
                return self.leave_archive().map(Activation::Listed);
            }
            return self.load_selected().map(Activation::Loaded);
        }

        if entry.is_directory {
            self.change_folder().map(Activation::Listed)
        } else if has_extension(&entry.filename, &self.options.archive_extensions) {
            self.enter_archive().map(Activation::Listed)
        } else {
            self.load_selected().map(Activation::Loaded)
        }
    }

    /// Follow the selected directory entry (`.`, `..`, a child or a device).
    ///
    /// Inside an archive, index 0 leaves it. Returns the new entry count.
    pub fn change_folder(&mut self) -> BrowserResult<usize> {
        if self.state.archive.is_some() && self.state.listing.selected_index == 0 {
            return self.leave_archive();
        }

        let Some(entry) = self.state.listing.selected().cloned() else {
            return Ok(self.relist());
        };

        if entry.is_current() {
            return Ok(self.state.listing.len());
        }

        if entry.is_parent() {
            self.ascend();
        } else {
            let child = match self.child_dir(&entry.filename) {
                Ok(child) => child,
                Err(e) => return Err(self.report(e)),
            };
            self.state.current_directory = child;
        }
        Ok(self.relist())
    }

    /// Go up one level regardless of the listing contents.
    pub fn go_up(&mut self) -> BrowserResult<usize> {
        match self.nav_state() {
            NavState::Archive => self.leave_archive(),
            NavState::DeviceSelect => Ok(self.state.listing.len()),
            NavState::Directory => {
                self.ascend();
                Ok(self.relist())
            }
        }
    }

    /// Strip the last segment of the current directory, remembering it as
    /// the entry to re-select. From a device root, go to device selection.
    fn ascend(&mut self) {
        let dir = normalize(&self.state.current_directory);
        if is_device_root(&dir) {
            self.set_last_loaded(&dir);
            self.state.current_directory.clear();
            return;
        }

        match split_last_segment(&dir) {
            Some((parent, name)) => {
                let (parent, name) = (parent.to_string(), name.to_string());
                self.set_last_loaded(&name);
                self.state.current_directory = parent;
            }
            None => self.state.current_directory.clear(),
        }
    }

    /// `current_directory` + `name` + `/`, bounds-checked.
    fn child_dir(&self, name: &str) -> BrowserResult<String> {
        let mut builder = PathBuilder::from_path(&self.state.current_directory)?;
        builder.push_dir(name)?;
        Ok(builder.build())
    }

    /// Open the selected archive container as a pseudo-directory.
    ///
    /// On failure the current directory listing stays as it was.
    pub fn enter_archive(&mut self) -> BrowserResult<usize> {
        let Some(entry) = self.state.listing.selected().cloned() else {
            return Ok(0);
        };

        let paths = PathBuilder::from_path(&self.state.current_directory).and_then(|mut b| {
            b.push(&entry.filename)?;
            let source = b.as_str().to_string();
            b.push(&SEPARATOR.to_string())?;
            Ok((normalize(&source), b.build()))
        });
        let (source_path, archive_dir) = match paths {
            Ok(paths) => paths,
            Err(e) => return Err(self.report(e)),
        };

        // Only one archive may be open at a time.
        if self.state.archive.take().is_some() {
            self.host.close();
        }
        self.halt_listing();

        let files = match self.open_archive_listing(&source_path) {
            Ok(files) => files,
            Err(e) => return Err(self.report(e)),
        };

        let context = ArchiveContext {
            base_name: strip_extension(&entry.filename).to_string(),
            file_name: entry.filename.clone(),
            source_path,
            parent_directory: self.state.current_directory.clone(),
        };
        info!("Entered archive {}", context.source_path);

        self.state.current_directory = archive_dir;
        self.state.listing.reset();
        self.fill_archive_listing(files, context);
        self.select_last_loaded();
        self.persist_location();
        Ok(self.state.listing.len())
    }

    /// Close the open archive and return to the directory that held it.
    pub fn leave_archive(&mut self) -> BrowserResult<usize> {
        let Some(context) = self.state.archive.take() else {
            return Ok(self.state.listing.len());
        };
        self.host.close();
        info!("Left archive {}", context.source_path);

        self.set_last_loaded(&context.file_name);
        self.state.current_directory = context.parent_directory;
        Ok(self.relist())
    }

    fn open_archive_listing(&mut self, source_path: &str) -> BrowserResult<Vec<BrowserEntry>> {
        let files = self.host.open_listing(source_path)?;
        if files.is_empty() {
            self.host.close();
            return Err(BrowserError::ArchiveOpenFailed(format!(
                "{} contains no files",
                source_path
            )));
        }
        Ok(files)
    }

    /// Leave pseudo-entry at index 0, then the archive's files.
    fn fill_archive_listing(&mut self, files: Vec<BrowserEntry>, context: ArchiveContext) {
        let mut leave = BrowserEntry::directory("..");
        leave.display_name = format!("Leave {}", context.file_name);
        let filled = self
            .state
            .listing
            .push(leave)
            .and_then(|_| self.state.listing.extend_bounded(files));
        self.state.listing.sort();
        self.state.archive = Some(context);
        if let Err(e) = filled {
            self.report(e);
        }
    }

    /// Cancel the listing started last and wait for it to stop.
    fn halt_listing(&mut self) {
        if let Some(token) = self.listing_token.take() {
            token.cancel();
            self.host.halt();
        }
    }

    /// Rebuild the listing for `current_directory`. Returns the entry count.
    ///
    /// Errors are reported, not returned: the caller always gets a usable
    /// listing, falling back to device selection.
    pub(crate) fn relist(&mut self) -> usize {
        self.halt_listing();
        self.state.current_directory = normalize(&self.state.current_directory);
        self.state.listing.reset();

        if !self.state.current_directory.is_empty() {
            let result = if self.is_archive_path(&self.state.current_directory) {
                self.reopen_archive()
            } else {
                self.list_directory()
            };
            if let Err(e) = result {
                self.report(e);
            }
            self.select_last_loaded();
        }

        if self.state.listing.is_empty() {
            if self.state.archive.take().is_some() {
                self.host.close();
            }
            self.state.current_directory.clear();
            self.fill_device_listing();
            self.select_last_loaded();
        }

        self.persist_location();
        debug!(
            "Listing {:?}: {} entries",
            self.state.current_directory,
            self.state.listing.len()
        );
        self.state.listing.len()
    }

    fn is_archive_path(&self, dir: &str) -> bool {
        split_last_segment(dir)
            .map(|(_, name)| has_extension(name, &self.options.archive_extensions))
            .unwrap_or(false)
    }

    /// Reopen an archive named by the current directory itself.
    fn reopen_archive(&mut self) -> BrowserResult<()> {
        let dir = self.state.current_directory.clone();
        let Some((parent, name)) = split_last_segment(&dir) else {
            return Ok(());
        };
        let source_path = dir.trim_end_matches(SEPARATOR).to_string();
        if self.state.archive.take().is_some() {
            self.host.close();
        }
        let files = self.open_archive_listing(&source_path)?;
        let context = ArchiveContext {
            source_path,
            file_name: name.to_string(),
            base_name: strip_extension(name).to_string(),
            parent_directory: parent.to_string(),
        };
        self.fill_archive_listing(files, context);
        Ok(())
    }

    fn list_directory(&mut self) -> BrowserResult<()> {
        let dir = self.state.current_directory.clone();
        let device =
            device::resolve(&dir).ok_or_else(|| BrowserError::DeviceNotFound(dir.clone()))?;
        if !self.host.activate(device, false) {
            return Err(BrowserError::DeviceNotFound(device.prefix().to_string()));
        }

        let token = CancelToken::new();
        self.listing_token = Some(token.clone());
        let entries = self.host.list(&dir, true, &token)?;

        let filled = self.state.listing.extend_bounded(entries);
        self.state.listing.sort();
        filled
    }

    /// Synthetic listing of the platform's device roots.
    fn fill_device_listing(&mut self) {
        for root in self.options.platform.device_roots() {
            let entry = BrowserEntry {
                filename: root.prefix.to_string(),
                display_name: root.label.to_string(),
                length: 0,
                is_directory: true,
                icon: root.icon,
            };
            if let Err(e) = self.state.listing.push(entry) {
                self.report(e);
                break;
            }
        }
    }

    fn select_last_loaded(&mut self) {
        if self.config.last_file_loaded.is_empty() {
            return;
        }
        if let Some(index) = self.state.listing.position(&self.config.last_file_loaded) {
            self.state.listing.select(index);
        }
    }

    /// Record the current folder and device as the place to reopen.
    fn persist_location(&mut self) {
        let dir = &self.state.current_directory;
        if dir.is_empty() {
            self.config.load_folder.clear();
            self.config.load_device = None;
        } else {
            let folder = strip_device(dir).unwrap_or("").trim_end_matches(SEPARATOR);
            self.config.load_folder = folder.to_string();
            self.config.load_device = device::resolve(dir);
        }
        self.config_changed = true;
    }

    /// Determine a device by probing candidates in priority order.
    ///
    /// The result is written to the configuration if that device is still
    /// set to auto.
    pub fn auto_detect(&mut self, kind: DeviceKind, silent: bool) -> BrowserResult<DeviceId> {
        let what = match kind {
            DeviceKind::Load => "load",
            DeviceKind::Save => "save",
        };
        if !silent {
            self.host
                .show_progress(&format!("Attempting to determine {} device...", what));
        }
        let found = device::detect(&mut self.host, kind);
        if !silent {
            self.host.cancel_progress();
        }

        let Some(device) = found else {
            let err = BrowserError::DeviceNotFound(format!("Unable to locate a {} device!", what));
            return Err(if silent { err } else { self.report(err) });
        };

        info!("Detected {} device {}", what, device);
        let slot = match kind {
            DeviceKind::Load => &mut self.config.load_device,
            DeviceKind::Save => &mut self.config.save_device,
        };
        if slot.is_none() {
            *slot = Some(device);
            self.config_changed = true;
        }
        Ok(device)
    }

    /// Open the remembered load folder (or device selection).
    ///
    /// With the load device on auto and a folder remembered, the device is
    /// detected first; if the folder is gone from it, its root is opened.
    pub fn open_game_list(&mut self) -> usize {
        let mut device = self.config.load_device;
        let mut detected = false;
        if device.is_none() && !self.config.load_folder.is_empty() {
            device = self.auto_detect(DeviceKind::Load, true).ok();
            detected = true;
        }

        if self.state.archive.take().is_some() {
            self.host.close();
        }

        let dir = match device {
            Some(device) => {
                let prefix = device.prefix();
                let folder = self.config.load_folder.clone();
                let built = PathBuilder::from_path(prefix).and_then(|mut b| {
                    b.push_dir(&folder)?;
                    Ok(b.build())
                });
                match built {
                    Ok(dir) if detected && !self.host.dir_exists(&dir) => prefix.to_string(),
                    Ok(dir) => dir,
                    Err(e) => {
                        self.report(e);
                        prefix.to_string()
                    }
                }
            }
            None => String::new(),
        };
        self.state.current_directory = dir;
        self.relist()
    }
}
