//! Host implementations of the collaborator contracts.
//!
//! - `MemoryHost`: in-memory maps, records every interaction
//! - `LocalHost`: host directories mounted as devices

mod local;
mod memory;
mod zip_container;

pub use local::{LocalHost, LOADED_ROM_FILE};
pub use memory::MemoryHost;
pub use zip_container::{first_entry_name, zip_bytes, ZipContainer};
