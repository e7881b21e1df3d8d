//! Browser entries and the bounded listing that holds them.

use std::cmp::Ordering;

use crate::error::{BrowserError, BrowserResult};

/// Default maximum number of entries in one listing.
pub const MAX_BROWSER_SIZE: usize = 10000;

/// Number of entries visible on one page of the listing.
pub const PAGE_SIZE: usize = 10;

/// Presentation hint for a listing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconKind {
    /// Ordinary file or folder.
    #[default]
    None,
    Sd,
    Usb,
    Dvd,
    Smb,
}

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrowserEntry {
    /// Name as known to the backing store (or a device root token).
    pub filename: String,
    /// Label shown to the user.
    pub display_name: String,
    /// Size in bytes; 0 for directories and devices.
    pub length: u64,
    pub is_directory: bool,
    pub icon: IconKind,
}

impl BrowserEntry {
    pub fn file(name: impl Into<String>, length: u64) -> Self {
        let filename = name.into();
        Self {
            display_name: filename.clone(),
            filename,
            length,
            is_directory: false,
            icon: IconKind::None,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        let filename = name.into();
        Self {
            display_name: filename.clone(),
            filename,
            length: 0,
            is_directory: true,
            icon: IconKind::None,
        }
    }

    /// The `.` entry.
    pub fn is_current(&self) -> bool {
        self.filename == "."
    }

    /// The `..` entry.
    pub fn is_parent(&self) -> bool {
        self.filename == ".."
    }

    /// Either of the implicit `.`/`..` entries.
    pub fn is_dot_entry(&self) -> bool {
        self.is_current() || self.is_parent()
    }
}

/// Listing order: `.`, `..`, directories, files; names compare
/// case-insensitively within each class.
pub fn compare_entries(a: &BrowserEntry, b: &BrowserEntry) -> Ordering {
    fn rank(e: &BrowserEntry) -> u8 {
        if e.is_current() {
            0
        } else if e.is_parent() {
            1
        } else if e.is_directory {
            2
        } else {
            3
        }
    }

    rank(a).cmp(&rank(b)).then_with(|| {
        let a = a.filename.chars().flat_map(char::to_lowercase);
        let b = b.filename.chars().flat_map(char::to_lowercase);
        a.cmp(b)
    })
}

/// Bounded, growable listing plus the cursor into it.
#[derive(Debug, Clone)]
pub struct EntryStore {
    entries: Vec<BrowserEntry>,
    capacity: usize,
    /// Selected entry.
    pub selected_index: usize,
    /// First entry of the visible page.
    pub page_index: usize,
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::with_capacity(MAX_BROWSER_SIZE)
    }
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that holds at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            selected_index: 0,
            page_index: 0,
        }
    }

    /// Drop all entries and zero the cursor. Allocated space is kept.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.selected_index = 0;
        self.page_index = 0;
    }

    /// Grow the listing by one blank entry.
    ///
    /// Fails with [`BrowserError::OutOfCapacity`] once the store is full;
    /// existing entries are untouched.
    pub fn append(&mut self) -> BrowserResult<&mut BrowserEntry> {
        if self.entries.len() >= self.capacity {
            return Err(BrowserError::OutOfCapacity(self.capacity));
        }
        self.entries.push(BrowserEntry::default());
        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last])
    }

    /// Append a filled-in entry.
    pub fn push(&mut self, entry: BrowserEntry) -> BrowserResult<()> {
        *self.append()? = entry;
        Ok(())
    }

    /// Append entries until the store is full.
    ///
    /// Entries that fit are kept even when the rest are rejected.
    pub fn extend_bounded<I>(&mut self, entries: I) -> BrowserResult<()>
    where
        I: IntoIterator<Item = BrowserEntry>,
    {
        for entry in entries {
            self.push(entry)?;
        }
        Ok(())
    }

    /// Re-establish listing order. Stable.
    pub fn sort(&mut self) {
        self.entries.sort_by(compare_entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> &[BrowserEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&BrowserEntry> {
        self.entries.get(index)
    }

    /// Entry under the cursor.
    pub fn selected(&self) -> Option<&BrowserEntry> {
        self.entries.get(self.selected_index)
    }

    /// Move the cursor, keeping the page index such that it stays visible.
    pub fn select(&mut self, index: usize) {
        if self.entries.is_empty() {
            self.selected_index = 0;
            self.page_index = 0;
            return;
        }
        self.selected_index = index.min(self.entries.len() - 1);
        if self.selected_index < self.page_index {
            self.page_index = self.selected_index;
        } else if self.selected_index >= self.page_index + PAGE_SIZE {
            self.page_index = self.selected_index + 1 - PAGE_SIZE;
        }
    }

    /// Index of the first entry named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.filename == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(store: &EntryStore) -> Vec<&str> {
        store.entries().iter().map(|e| e.filename.as_str()).collect()
    }

    #[test]
    fn test_sort_order() {
        let mut store = EntryStore::new();
        store.push(BrowserEntry::file("beta.nes", 10)).unwrap();
        store.push(BrowserEntry::directory("Zeta")).unwrap();
        store.push(BrowserEntry::directory("..")).unwrap();
        store.push(BrowserEntry::file("Alpha.nes", 10)).unwrap();
        store.push(BrowserEntry::directory("alpha")).unwrap();
        store.push(BrowserEntry::directory(".")).unwrap();
        store.sort();

        assert_eq!(
            names(&store),
            vec![".", "..", "alpha", "Zeta", "Alpha.nes", "beta.nes"]
        );
    }

    #[test]
    fn test_sort_adjacent_pairs_ordered() {
        let mut store = EntryStore::new();
        for name in ["b.NES", "A.nes", "c", "..", "B", "a.fds", "C.zip"] {
            let entry = if name.contains('.') && name != ".." {
                BrowserEntry::file(name, 1)
            } else {
                BrowserEntry::directory(name)
            };
            store.push(entry).unwrap();
        }
        store.sort();

        for pair in store.entries().windows(2) {
            assert_ne!(compare_entries(&pair[0], &pair[1]), Ordering::Greater);
        }
        assert_eq!(store.entries()[0].filename, "..");
    }

    #[test]
    fn test_sort_is_stable_for_equal_names() {
        let mut store = EntryStore::new();
        let mut first = BrowserEntry::file("GAME.nes", 1);
        first.display_name = "first".to_string();
        let mut second = BrowserEntry::file("game.NES", 2);
        second.display_name = "second".to_string();
        store.push(first).unwrap();
        store.push(second).unwrap();
        store.sort();

        assert_eq!(store.entries()[0].display_name, "first");
    }

    #[test]
    fn test_capacity_bound() {
        let mut store = EntryStore::with_capacity(2);
        store.push(BrowserEntry::file("a.nes", 1)).unwrap();
        store.append().unwrap().filename = "b.nes".to_string();

        let err = store.push(BrowserEntry::file("c.nes", 1)).unwrap_err();
        assert!(matches!(err, BrowserError::OutOfCapacity(2)));
        assert_eq!(names(&store), vec!["a.nes", "b.nes"]);
    }

    #[test]
    fn test_extend_bounded_keeps_prefix() {
        let mut store = EntryStore::with_capacity(3);
        let entries = (0..5).map(|i| BrowserEntry::file(format!("{i}.nes"), 1));
        let result = store.extend_bounded(entries);
        assert!(result.is_err());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut store = EntryStore::with_capacity(4);
        store.push(BrowserEntry::file("a.nes", 1)).unwrap();
        store.select(0);
        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.selected_index, 0);
        assert_eq!(store.capacity(), 4);
    }

    #[test]
    fn test_select_moves_page() {
        let mut store = EntryStore::new();
        for i in 0..25 {
            store.push(BrowserEntry::file(format!("{i:02}.nes"), 1)).unwrap();
        }
        store.select(14);
        assert_eq!(store.page_index, 5);
        store.select(3);
        assert_eq!(store.page_index, 3);
        store.select(100);
        assert_eq!(store.selected_index, 24);
        assert_eq!(store.selected().unwrap().filename, "24.nes");
    }
}
