//! Multi-device ROM browser core
//!
//! This crate provides a navigable listing spanning several storage devices
//! (SD, USB, optical disc, network share), with archive containers browsed as
//! if they were folders:
//! - Path canonicalization and bounded path building
//! - Device prefix resolution and auto-detection
//! - A bounded, sorted entry listing
//! - The navigation state machine (devices, folders, archives)
//! - ROM validation, save-artifact naming and loading
//!
//! # Architecture
//!
//! The browser drives its collaborators through narrow traits:
//! - `DirectoryLister`, `ArchiveService`, `ZipPeek`: listing sources
//! - `DeviceSwitch`, `FileReader`: storage access
//! - `Patcher`, `RomRunner`: the emulator side
//! - `Notifier`: user-facing messages
//!
//! `Host` bundles all of them; `MemoryHost` and `LocalHost` implement it.

pub mod autoload;
pub mod bundle;
pub mod cancel;
pub mod config;
pub mod device;
pub mod entry;
pub mod error;
pub mod host;
pub mod navigator;
pub mod path;
pub mod rom;
pub mod services;

pub use cancel::CancelToken;
pub use config::{AutoLoadMode, BrowserOptions, SessionConfig};
pub use device::{DeviceId, DeviceKind, Platform};
pub use entry::{BrowserEntry, EntryStore, IconKind};
pub use error::{BrowserError, BrowserResult};
pub use host::{LocalHost, MemoryHost};
pub use navigator::{Activation, ArchiveContext, Browser, BrowserState, NavState};
pub use rom::{ArtifactKind, LoadedRom, SaveSlot};
pub use services::{
    ArchiveService, DeviceSwitch, DirectoryLister, FileReader, Host, Notifier, Patcher, RomRunner,
    ZipPeek,
};
