//! Non-interactive startup: find one ROM by name and load it.

use log::info;

use crate::device;
use crate::error::{BrowserError, BrowserResult};
use crate::navigator::Browser;
use crate::path::{has_extension, normalize, strip_device, SEPARATOR};
use crate::rom::LoadedRom;
use crate::services::Host;

impl<H: Host> Browser<H> {
    /// Open the folder named by `full_path` and load the first entry whose
    /// name contains `target` (case-insensitive).
    ///
    /// A matching archive is opened and its first file loaded. Without a
    /// match nothing is loaded and the configuration only records the
    /// scanned folder.
    pub fn auto_load(&mut self, full_path: &str, target: &str) -> BrowserResult<LoadedRom> {
        self.reset();

        let path = normalize(full_path);
        let folder = strip_device(&path).unwrap_or(&path).trim_matches(SEPARATOR);
        self.config.load_folder = folder.to_string();
        if let Some(device) = device::resolve(&path) {
            self.config.load_device = Some(device);
        }
        self.config_changed = true;
        self.open_game_list();

        let needle = target.to_lowercase();
        let found = self
            .state
            .listing
            .entries()
            .iter()
            .position(|e| !e.is_dot_entry() && e.filename.to_lowercase().contains(&needle));
        let Some(index) = found else {
            let err = BrowserError::NoMatch(target.to_string());
            return Err(self.report(err));
        };

        self.state.listing.select(index);
        let name = self.state.listing.entries()[index].filename.clone();
        info!("Auto-loading {} from {}", name, self.state.current_directory);

        if has_extension(&name, &self.options.archive_extensions) {
            self.enter_archive()?;
            // Skip the leave entry.
            self.state.listing.select(1);
        }
        self.load_selected()
    }
}
