//! ZIP-format containers read into memory.

use std::io::{Cursor, Read, Seek, Write};

use zip::{ZipArchive, ZipWriter};

use crate::entry::BrowserEntry;
use crate::error::{BrowserError, BrowserResult};

/// An open ZIP container.
pub struct ZipContainer {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ZipContainer {
    pub fn from_bytes(data: Vec<u8>) -> BrowserResult<Self> {
        let archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| BrowserError::ArchiveOpenFailed(e.to_string()))?;
        Ok(Self { archive })
    }

    /// Files in the container, in stored order. Folders are skipped.
    pub fn entries(&mut self) -> BrowserResult<Vec<BrowserEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self.archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut entry = BrowserEntry::file(file.name(), file.size());
            entry.display_name = leaf_name(file.name()).to_string();
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Decompress one file by its stored name.
    pub fn extract(&mut self, name: &str) -> BrowserResult<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| BrowserError::ArchiveOpenFailed(format!("{}: {}", name, e)))?;
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        Ok(content)
    }
}

/// Last path component of a stored name.
fn leaf_name(name: &str) -> &str {
    name.trim_end_matches('/').rsplit('/').next().unwrap_or(name)
}

/// Name of the first file in a ZIP, without its folder.
pub fn first_entry_name<R: Read + Seek>(reader: R) -> Option<String> {
    let mut archive = ZipArchive::new(reader).ok()?;
    for i in 0..archive.len() {
        let file = archive.by_index(i).ok()?;
        if !file.is_dir() {
            return Some(leaf_name(file.name()).to_string());
        }
    }
    None
}

/// Build ZIP bytes from `(name, content)` pairs, in order.
pub fn zip_bytes(files: &[(&str, &[u8])]) -> BrowserResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file::<_, ()>(*name, Default::default())?;
        zip.write_all(content)?;
    }
    Ok(zip.finish()?.into_inner())
}
