//! Storage seam for mapping rows.
//!
//! The pipeline stages never talk to a database directly; they operate on
//! any [`MappingStore`]. The trait mirrors the handful of relational
//! operations the stages need: insert-or-ignore, replace, delete, rename
//! and column updates on a table unique by `(charcode, representation)`.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and small
//! tools; the SQLite backend lives in the `texmap-sqlite` crate.

use std::collections::BTreeMap;

use crate::error::MappingError;
use crate::types::{Category, MappingRow};

/// A table of [`MappingRow`]s unique by `(charcode, representation)`.
///
/// Implementations must keep the uniqueness constraint: inserting an
/// existing key through [`insert_or_ignore`](Self::insert_or_ignore) is a
/// no-op, and [`replace`](Self::replace) overwrites the row for the key.
pub trait MappingStore {
    /// Backend error; pipeline failures convert into it.
    type Error: From<MappingError>;

    /// Returns all rows ordered by `(charcode, representation)`.
    fn rows(&self) -> Result<Vec<MappingRow>, Self::Error>;

    /// Inserts `row` unless its key exists. Returns `true` if a row was added.
    fn insert_or_ignore(&mut self, row: &MappingRow) -> Result<bool, Self::Error>;

    /// Inserts `row`, overwriting any row with the same key.
    fn replace(&mut self, row: &MappingRow) -> Result<(), Self::Error>;

    /// Deletes the row for the key. Returns `true` if a row was removed.
    fn delete(&mut self, charcode: u32, representation: &str) -> Result<bool, Self::Error>;

    /// Deletes every row of `charcode` and returns how many were removed.
    fn delete_charcode(&mut self, charcode: u32) -> Result<usize, Self::Error>;

    /// Changes the representation of a row in place.
    ///
    /// Leaves the store untouched and returns `false` when the target key
    /// already exists or the source row is missing.
    fn rename(&mut self, charcode: u32, from: &str, to: &str) -> Result<bool, Self::Error>;

    /// Sets the preference of a row.
    fn set_preference(
        &mut self,
        charcode: u32,
        representation: &str,
        preference: u32,
    ) -> Result<(), Self::Error>;

    /// Sets the category of a row.
    fn set_category(
        &mut self,
        charcode: u32,
        representation: &str,
        category: Category,
    ) -> Result<(), Self::Error>;
}

/// In-memory [`MappingStore`] backed by an ordered map.
///
/// # Examples
///
/// ```
/// use texmap_core::{MappingRow, MappingStore, MemoryStore, Mode};
///
/// let mut store = MemoryStore::new();
/// assert!(store.insert_or_ignore(&MappingRow::new(0x2003, "\\quad", Mode::Text)).unwrap());
/// assert!(!store.insert_or_ignore(&MappingRow::new(0x2003, "\\quad", Mode::Math)).unwrap());
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: BTreeMap<(u32, String), MappingRow>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up the row for a key.
    pub fn get(&self, charcode: u32, representation: &str) -> Option<&MappingRow> {
        self.rows.get(&(charcode, representation.to_string()))
    }

    /// Returns the rows of one charcode ordered by preference.
    pub fn rows_for(&self, charcode: u32) -> Vec<&MappingRow> {
        let mut rows: Vec<&MappingRow> = self
            .rows
            .range((charcode, String::new())..)
            .take_while(|((code, _), _)| *code == charcode)
            .map(|(_, row)| row)
            .collect();
        rows.sort_by_key(|row| row.preference);
        rows
    }
}

impl MappingStore for MemoryStore {
    type Error = MappingError;

    fn rows(&self) -> Result<Vec<MappingRow>, MappingError> {
        Ok(self.rows.values().cloned().collect())
    }

    fn insert_or_ignore(&mut self, row: &MappingRow) -> Result<bool, MappingError> {
        let key = (row.charcode, row.representation.clone());
        if self.rows.contains_key(&key) {
            return Ok(false);
        }
        self.rows.insert(key, row.clone());
        Ok(true)
    }

    fn replace(&mut self, row: &MappingRow) -> Result<(), MappingError> {
        self.rows
            .insert((row.charcode, row.representation.clone()), row.clone());
        Ok(())
    }

    fn delete(&mut self, charcode: u32, representation: &str) -> Result<bool, MappingError> {
        Ok(self
            .rows
            .remove(&(charcode, representation.to_string()))
            .is_some())
    }

    fn delete_charcode(&mut self, charcode: u32) -> Result<usize, MappingError> {
        let before = self.rows.len();
        self.rows.retain(|(code, _), _| *code != charcode);
        Ok(before - self.rows.len())
    }

    fn rename(&mut self, charcode: u32, from: &str, to: &str) -> Result<bool, MappingError> {
        if self.rows.contains_key(&(charcode, to.to_string())) {
            return Ok(false);
        }
        let Some(mut row) = self.rows.remove(&(charcode, from.to_string())) else {
            return Ok(false);
        };
        row.representation = to.to_string();
        self.rows.insert((charcode, to.to_string()), row);
        Ok(true)
    }

    fn set_preference(
        &mut self,
        charcode: u32,
        representation: &str,
        preference: u32,
    ) -> Result<(), MappingError> {
        if let Some(row) = self.rows.get_mut(&(charcode, representation.to_string())) {
            row.preference = preference;
        }
        Ok(())
    }

    fn set_category(
        &mut self,
        charcode: u32,
        representation: &str,
        category: Category,
    ) -> Result<(), MappingError> {
        if let Some(row) = self.rows.get_mut(&(charcode, representation.to_string())) {
            row.category = category;
        }
        Ok(())
    }
}
