//! Multi-ROM bundles: handheld-cartridge images carrying embedded NES ROMs.
//!
//! Each embedded image is a 48-byte header followed by an iNES image:
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 32   | name (NUL padded)             |
//! | 32     | 4    | image size (little endian)    |
//! | 36     | 4    | flags                         |
//! | 40     | 4    | sprite follow                 |
//! | 44     | 4    | reserved                      |
//! | 48     | size | iNES image, starts `NES\x1A`  |
//!
//! Images are 4-byte aligned and packed back to back.

use crate::error::{BrowserError, BrowserResult};

/// Size of the header preceding each embedded image.
pub const HEADER_SIZE: usize = 48;

/// iNES magic.
pub const INES_MAGIC: [u8; 4] = *b"NES\x1A";

/// One embedded ROM, located inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedRom {
    pub name: String,
    /// Offset of the header within the bundle.
    pub header_offset: usize,
    /// Size of the iNES image following the header.
    pub size: usize,
}

impl EmbeddedRom {
    pub fn data_offset(&self) -> usize {
        self.header_offset + HEADER_SIZE
    }

    /// Offset where the next image would start.
    fn end(&self) -> usize {
        align4(self.data_offset() + self.size)
    }
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Parse a header at `offset`, if a valid image starts there.
fn header_at(data: &[u8], offset: usize) -> Option<EmbeddedRom> {
    let header = data.get(offset..offset + HEADER_SIZE)?;
    let magic = data.get(offset + HEADER_SIZE..offset + HEADER_SIZE + INES_MAGIC.len())?;
    if magic != INES_MAGIC {
        return None;
    }

    let size = u32::from_le_bytes([header[32], header[33], header[34], header[35]]) as usize;
    if size < INES_MAGIC.len() || offset + HEADER_SIZE + size > data.len() {
        return None;
    }

    let name_len = header[..32].iter().position(|&b| b == 0).unwrap_or(32);
    let name = String::from_utf8_lossy(&header[..name_len]).trim().to_string();

    Some(EmbeddedRom {
        name,
        header_offset: offset,
        size,
    })
}

/// First embedded ROM, scanning 4-byte aligned offsets.
pub fn first_rom(data: &[u8]) -> Option<EmbeddedRom> {
    (0..data.len())
        .step_by(4)
        .find_map(|offset| header_at(data, offset))
}

/// ROM packed directly after `prev`, if any.
pub fn next_rom(data: &[u8], prev: &EmbeddedRom) -> Option<EmbeddedRom> {
    header_at(data, prev.end())
}

/// Replace a bundle with the single ROM it carries.
///
/// Zero or several embedded ROMs are an error rather than a default pick.
pub fn unwrap_single(data: &mut Vec<u8>) -> BrowserResult<EmbeddedRom> {
    let Some(first) = first_rom(data) else {
        return Err(BrowserError::InvalidArchiveContent(
            "No NES ROMs found in this file.".to_string(),
        ));
    };
    if next_rom(data, &first).is_some() {
        return Err(BrowserError::InvalidArchiveContent(
            "More than one NES ROM found in this file. Only files with one ROM are supported."
                .to_string(),
        ));
    }

    let start = first.data_offset();
    data.copy_within(start..start + first.size, 0);
    data.truncate(first.size);
    Ok(first)
}

/// Build a bundle image. Test fixture helper.
#[cfg(test)]
pub(crate) fn build_bundle(preamble: usize, roms: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = vec![0xEA; align4(preamble)];
    for (name, image) in roms {
        let mut header = [0u8; HEADER_SIZE];
        let n = name.len().min(32);
        header[..n].copy_from_slice(&name.as_bytes()[..n]);
        header[32..36].copy_from_slice(&(image.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(image);
        out.resize(align4(out.len()), 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ines(tag: u8, len: usize) -> Vec<u8> {
        let mut rom = INES_MAGIC.to_vec();
        rom.resize(len, tag);
        rom
    }

    #[test]
    fn test_single_rom_unwraps() {
        let rom = ines(0x11, 37);
        let mut bundle = build_bundle(192, &[("Zelda", &rom)]);

        let found = unwrap_single(&mut bundle).unwrap();
        assert_eq!(found.name, "Zelda");
        assert_eq!(found.header_offset, 192);
        assert_eq!(bundle, rom);
    }

    #[test]
    fn test_no_rom_fails() {
        let mut data = vec![0u8; 512];
        let err = unwrap_single(&mut data).unwrap_err();
        assert!(matches!(err, BrowserError::InvalidArchiveContent(_)));
        assert!(err.to_string().contains("No NES ROMs"));
        assert_eq!(data.len(), 512);
    }

    #[test]
    fn test_two_roms_fail() {
        let a = ines(0x22, 64);
        let b = ines(0x33, 30);
        let mut bundle = build_bundle(0, &[("A", &a), ("B", &b)]);
        let original = bundle.clone();

        let err = unwrap_single(&mut bundle).unwrap_err();
        assert!(err.to_string().contains("More than one NES ROM"));
        assert_eq!(bundle, original);
    }

    #[test]
    fn test_first_and_next() {
        let a = ines(0x22, 61);
        let b = ines(0x33, 30);
        let bundle = build_bundle(8, &[("A", &a), ("B", &b)]);

        let first = first_rom(&bundle).unwrap();
        assert_eq!(first.name, "A");
        let second = next_rom(&bundle, &first).unwrap();
        assert_eq!(second.name, "B");
        assert_eq!(second.size, 30);
        assert!(next_rom(&bundle, &second).is_none());
    }

    #[test]
    fn test_truncated_image_rejected() {
        let rom = ines(0x44, 100);
        let mut bundle = build_bundle(0, &[("Cut", &rom)]);
        bundle.truncate(HEADER_SIZE + 50);
        assert!(first_rom(&bundle).is_none());
    }
}
