//! Contracts for the collaborators the browser drives.
//!
//! The browser never touches storage, decompression or the emulator
//! directly. A [`Host`] bundles one implementation of every contract:
//! - `MemoryHost` for tests and headless runs
//! - `LocalHost` for host directories mounted as devices

use crate::cancel::CancelToken;
use crate::device::DeviceId;
use crate::entry::BrowserEntry;
use crate::error::BrowserResult;
use crate::rom::ArtifactKind;

/// Enumerates real directories.
pub trait DirectoryLister {
    /// List the children of `path`.
    ///
    /// With `include_dot_entries` the listing carries a `..` entry. Listers
    /// should stop early with `BrowserError::Cancelled` once `cancel` fires.
    fn list(
        &mut self,
        path: &str,
        include_dot_entries: bool,
        cancel: &CancelToken,
    ) -> BrowserResult<Vec<BrowserEntry>>;

    /// Check whether a directory exists.
    fn dir_exists(&mut self, path: &str) -> bool;

    /// Wait until any listing still running in the background has observed
    /// its cancellation. Synchronous listers have nothing to wait for.
    fn halt(&mut self) {}
}

/// Opens a compressed container as a pseudo-directory.
pub trait ArchiveService {
    /// Open the container at `path` and list its files.
    fn open_listing(&mut self, path: &str) -> BrowserResult<Vec<BrowserEntry>>;

    /// Extract one file from the open container.
    fn extract(&mut self, name: &str) -> BrowserResult<Vec<u8>>;

    /// Close the open container, if any.
    fn close(&mut self);
}

/// Peeks into zip files without opening them as a directory.
pub trait ZipPeek {
    /// Name of the first file inside the zip at `path`.
    fn first_entry_name(&mut self, path: &str) -> Option<String>;
}

/// Mounts and verifies storage devices.
pub trait DeviceSwitch {
    /// Make `device` the active interface. Returns false if it is unavailable.
    fn activate(&mut self, device: DeviceId, silent: bool) -> bool;
}

/// Reads whole files.
pub trait FileReader {
    /// Read at most `max_bytes` of `path`, starting at `offset`.
    fn read(
        &mut self,
        path: &str,
        offset: u64,
        max_bytes: usize,
        silent: bool,
    ) -> BrowserResult<Vec<u8>>;
}

/// Applies a pending binary patch to freshly loaded ROM bytes.
pub trait Patcher {
    fn apply(&mut self, rom: &mut Vec<u8>);
}

/// Hands ROM images to the emulator.
pub trait RomRunner {
    /// Start executing `rom`. Returns false if the emulator rejects it.
    fn load(&mut self, rom: &[u8]) -> bool;

    /// Reset the emulated machine.
    fn reset(&mut self);

    /// Restore a save artifact for the running ROM.
    fn restore(&mut self, _kind: ArtifactKind, _path: &str) -> bool {
        false
    }
}

/// User-facing notifications. Fire-and-forget.
pub trait Notifier {
    fn show_error(&mut self, message: &str);

    fn show_progress(&mut self, message: &str);

    fn cancel_progress(&mut self);
}

/// Everything the browser needs from the outside world.
pub trait Host:
    DirectoryLister
    + ArchiveService
    + ZipPeek
    + DeviceSwitch
    + FileReader
    + Patcher
    + RomRunner
    + Notifier
{
}

impl<T> Host for T where
    T: DirectoryLister
        + ArchiveService
        + ZipPeek
        + DeviceSwitch
        + FileReader
        + Patcher
        + RomRunner
        + Notifier
{
}
