//! Session configuration and browser options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceId, Platform};
use crate::entry::MAX_BROWSER_SIZE;
use crate::error::BrowserResult;

/// Largest ROM image the browser will read.
pub const MAX_ROM_SIZE: usize = 4 * 1024 * 1024;

/// What to restore automatically after a ROM loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoLoadMode {
    #[default]
    Off,
    Ram,
    State,
}

/// Persisted session settings.
///
/// A device of `None` means "auto": it is detected on first use and the
/// result is written back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub load_device: Option<DeviceId>,
    pub save_device: Option<DeviceId>,
    /// Last browsed folder, without device and trailing separator.
    pub load_folder: String,
    pub save_folder: String,
    pub cheat_folder: String,
    /// Name of the entry to re-select after the next listing.
    pub last_file_loaded: String,
    pub auto_load: AutoLoadMode,
    /// Suffix the auto save slot with ` Auto`.
    pub append_auto: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            load_device: None,
            save_device: None,
            load_folder: String::new(),
            save_folder: "romnav/saves".to_string(),
            cheat_folder: "romnav/cheats".to_string(),
            last_file_loaded: String::new(),
            auto_load: AutoLoadMode::Off,
            append_auto: true,
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> BrowserResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> BrowserResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Fixed browser behavior, chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub platform: Platform,
    /// Maximum entries in one listing.
    pub max_entries: usize,
    /// Extensions browsed as archive directories.
    pub archive_extensions: Vec<String>,
    /// Containers accepted without inspection (may hold a ROM bundle).
    pub container_extensions: Vec<String>,
    /// Playable ROM extensions.
    pub rom_extensions: Vec<String>,
    pub max_rom_size: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            platform: Platform::default(),
            max_entries: MAX_BROWSER_SIZE,
            archive_extensions: list(&["7z"]),
            container_extensions: list(&["gba"]),
            rom_extensions: list(&["nes", "fds", "nsf", "unf", "nez", "unif"]),
            max_rom_size: MAX_ROM_SIZE,
        }
    }
}
