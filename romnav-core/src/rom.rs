//! ROM validation, load-path construction and loading.

use log::{debug, info};

use crate::bundle;
use crate::config::{AutoLoadMode, SessionConfig};
use crate::device::{DeviceId, DeviceKind};
use crate::entry::BrowserEntry;
use crate::error::{BrowserError, BrowserResult};
use crate::navigator::Browser;
use crate::path::{extension, has_extension, strip_extension, PathBuilder};
use crate::services::Host;

/// Kind of file a path is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Rom,
    /// Battery-backed RAM snapshot.
    Ram,
    /// Save state.
    State,
    /// Cheat list.
    Cheat,
}

impl ArtifactKind {
    /// Extension appended to save artifacts.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ArtifactKind::Rom => None,
            ArtifactKind::Ram => Some("sav"),
            ArtifactKind::State => Some("fcs"),
            ArtifactKind::Cheat => Some("cht"),
        }
    }

    /// Configured folder this kind lives in.
    pub fn folder(self, config: &SessionConfig) -> &str {
        match self {
            ArtifactKind::Rom => &config.load_folder,
            ArtifactKind::Ram | ArtifactKind::State => &config.save_folder,
            ArtifactKind::Cheat => &config.cheat_folder,
        }
    }
}

/// Which slot of a save artifact to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSlot {
    /// Base name used as is, no extension.
    Verbatim,
    /// `<base>.<ext>`
    Exact,
    /// `<base> Auto.<ext>` when auto-naming is on, else `<base>.<ext>`
    Auto,
    /// `<base> <n>.<ext>`
    Numbered(u32),
}

impl SaveSlot {
    /// Slot from its numeric variant: -1 exact, 0 auto, n>0 numbered,
    /// anything lower verbatim.
    pub fn from_variant(variant: i32) -> Self {
        match variant {
            -1 => SaveSlot::Exact,
            0 => SaveSlot::Auto,
            n if n > 0 => SaveSlot::Numbered(n as u32),
            _ => SaveSlot::Verbatim,
        }
    }
}

/// File name of a save artifact.
pub fn artifact_file_name(
    kind: ArtifactKind,
    base: &str,
    slot: SaveSlot,
    append_auto: bool,
) -> String {
    let Some(ext) = kind.extension() else {
        return base.to_string();
    };
    if kind == ArtifactKind::Cheat {
        return format!("{}.{}", base, ext);
    }
    match slot {
        SaveSlot::Verbatim => base.to_string(),
        SaveSlot::Exact => format!("{}.{}", base, ext),
        SaveSlot::Auto if append_auto => format!("{} Auto.{}", base, ext),
        SaveSlot::Auto => format!("{}.{}", base, ext),
        SaveSlot::Numbered(n) => format!("{} {}.{}", base, n, ext),
    }
}

/// `<device-prefix><folder>/<file>`, bounds-checked and canonical.
pub fn compose_save_path(device: DeviceId, folder: &str, file: &str) -> BrowserResult<String> {
    let mut builder = PathBuilder::new();
    builder.push(device.prefix())?;
    builder.push_dir(folder)?;
    builder.push(file)?;
    Ok(builder.build())
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRom {
    /// Entry name as listed.
    pub name: String,
    /// Name without extension, used for save artifacts.
    pub base_name: String,
    /// Size of the image handed to the emulator.
    pub size: usize,
}

impl<H: Host> Browser<H> {
    /// Check that `entry` looks like something the emulator can run.
    ///
    /// Containers are accepted outright. A zip outside archive mode is judged
    /// by the first file inside it.
    pub fn validate_candidate(&mut self, entry: &BrowserEntry) -> BrowserResult<()> {
        if has_extension(&entry.filename, &self.options.container_extensions) {
            return Ok(());
        }

        let mut candidate = entry.filename.clone();
        let is_zip = extension(&entry.filename)
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if is_zip && !self.in_archive_mode() {
            let path = match self.entry_path(&entry.filename) {
                Ok(path) => path,
                Err(e) => return Err(self.report(e)),
            };
            candidate = self.host.first_entry_name(&path).unwrap_or_default();
            debug!("{} starts with {:?}", path, candidate);
        }

        if has_extension(&candidate, &self.options.rom_extensions) {
            Ok(())
        } else {
            let err = BrowserError::UnknownFileType(entry.filename.clone());
            Err(self.report(err))
        }
    }

    fn entry_path(&self, name: &str) -> BrowserResult<String> {
        let mut builder = PathBuilder::from_path(&self.state.current_directory)?;
        builder.push(name)?;
        Ok(builder.build())
    }

    /// Path for the selected ROM or one of its save artifacts.
    ///
    /// Save artifacts go to the save device, detected on first use.
    pub fn build_load_path(&mut self, kind: ArtifactKind, slot: SaveSlot) -> BrowserResult<String> {
        if kind == ArtifactKind::Rom {
            let name = match self.state.listing.selected() {
                Some(entry) => entry.filename.clone(),
                None => return Err(BrowserError::LoadFailed("nothing selected".to_string())),
            };
            return self.entry_path(&name).map_err(|e| self.report(e));
        }

        let device = match self.config.save_device {
            Some(device) => device,
            None => self.auto_detect(DeviceKind::Save, true)?,
        };
        let file = artifact_file_name(kind, &self.rom_base_name, slot, self.config.append_auto);
        compose_save_path(device, kind.folder(&self.config), &file).map_err(|e| self.report(e))
    }

    /// Load the selected entry into the emulator.
    ///
    /// On failure the browser stays where it is (an open archive stays
    /// open). On success the listing is cleared and any archive closed.
    pub fn load_selected(&mut self) -> BrowserResult<LoadedRom> {
        let Some(entry) = self.state.listing.selected().cloned() else {
            let err = BrowserError::LoadFailed("nothing selected".to_string());
            return Err(self.report(err));
        };
        if entry.is_directory {
            let err = BrowserError::UnknownFileType(entry.filename);
            return Err(self.report(err));
        }
        self.validate_candidate(&entry)?;

        self.host.show_progress("Loading...");
        let read = self.read_rom(&entry);
        self.host.cancel_progress();
        let mut rom = read.map_err(|e| self.report(e))?;

        // Archive members may carry folders.
        let leaf = entry.filename.rsplit('/').next().unwrap_or(&entry.filename);
        self.rom_base_name = strip_extension(leaf).to_string();
        self.set_last_loaded(&entry.filename);

        self.host.apply(&mut rom);
        if !self.host.load(&rom) {
            let err = BrowserError::LoadFailed(format!("{} was rejected", entry.filename));
            return Err(self.report(err));
        }
        info!("Loaded {} ({} bytes)", entry.filename, rom.len());

        self.restore_auto_artifact();
        self.host.reset();
        self.reset_after_load();

        Ok(LoadedRom {
            name: entry.filename,
            base_name: self.rom_base_name.clone(),
            size: rom.len(),
        })
    }

    fn read_rom(&mut self, entry: &BrowserEntry) -> BrowserResult<Vec<u8>> {
        let load_failed =
            |e: BrowserError| BrowserError::LoadFailed(format!("{}: {}", entry.filename, e));
        let rom = if self.in_archive_mode() {
            self.host.extract(&entry.filename).map_err(load_failed)?
        } else {
            let path = self.build_load_path(ArtifactKind::Rom, SaveSlot::Exact)?;
            // The browser reports the failure itself.
            let mut rom = self
                .host
                .read(&path, 0, self.options.max_rom_size, true)
                .map_err(load_failed)?;
            if !rom.is_empty() && has_extension(&path, &self.options.container_extensions) {
                let found = bundle::unwrap_single(&mut rom)?;
                debug!("Unwrapped {:?} from {}", found.name, path);
            }
            rom
        };

        if rom.is_empty() {
            return Err(BrowserError::LoadFailed(entry.filename.clone()));
        }
        Ok(rom)
    }

    fn restore_auto_artifact(&mut self) {
        let kind = match self.config.auto_load {
            AutoLoadMode::Off => return,
            AutoLoadMode::Ram => ArtifactKind::Ram,
            AutoLoadMode::State => ArtifactKind::State,
        };
        let device = match self.config.save_device {
            Some(device) => Ok(device),
            None => self.auto_detect(DeviceKind::Save, true),
        };
        let path = device.and_then(|device| {
            let base = &self.rom_base_name;
            let file = artifact_file_name(kind, base, SaveSlot::Auto, self.config.append_auto);
            compose_save_path(device, kind.folder(&self.config), &file)
        });
        match path {
            Ok(path) => {
                let restored = self.host.restore(kind, &path);
                debug!("Auto restore {} -> {}", path, restored);
            }
            Err(e) => debug!("Auto restore skipped: {}", e),
        }
    }

    /// Back to the directory baseline after handing a ROM to the emulator.
    fn reset_after_load(&mut self) {
        if let Some(context) = self.state.archive.take() {
            self.host.close();
            self.state.current_directory = context.parent_directory;
        }
        self.state.listing.reset();
    }
}
