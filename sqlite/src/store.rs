//! [`MappingStore`] over a SQLite connection.
//!
//! [`SqliteStore`] borrows any [`Connection`], including an open
//! transaction (which dereferences to one), so a whole pipeline run can be
//! made atomic by the caller.
//!
//! # Example
//!
//! ```no_run
//! use rusqlite::Connection;
//! use texmap_core::{MappingRow, MappingStore, Mode};
//! use texmap_sqlite::SqliteStore;
//!
//! let mut conn = Connection::open("texmap.sqlite").unwrap();
//! let tx = conn.transaction().unwrap();
//! let mut store = SqliteStore::new(&tx, "texmap_").unwrap();
//! store.insert_or_ignore(&MappingRow::new(0x2003, "\\quad{}", Mode::Text)).unwrap();
//! tx.commit().unwrap();
//! ```

use rusqlite::{Connection, params};
use texmap_core::{Category, MappingRow, MappingStore};

use crate::convert;
use crate::error::{Result, SqliteError};
use crate::schema::validate_prefix;

/// Mapping table access for one connection and table prefix.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
    prefix: String,
}

impl<'a> SqliteStore<'a> {
    /// Creates a store for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
    pub fn new(conn: &'a Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { conn, prefix })
    }

    /// Number of rows in the mapping table.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}mapping", self.prefix),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Removes every mapping row.
    pub fn clear(&self) -> Result<usize> {
        Ok(self
            .conn
            .execute(&format!("DELETE FROM {}mapping", self.prefix), [])?)
    }
}

impl MappingStore for SqliteStore<'_> {
    type Error = SqliteError;

    fn rows(&self) -> Result<Vec<MappingRow>> {
        convert::load_rows(self.conn, &self.prefix)
    }

    fn insert_or_ignore(&mut self, row: &MappingRow) -> Result<bool> {
        Ok(convert::insert_row(self.conn, &self.prefix, "IGNORE", row)? > 0)
    }

    fn replace(&mut self, row: &MappingRow) -> Result<()> {
        convert::insert_row(self.conn, &self.prefix, "REPLACE", row)?;
        Ok(())
    }

    fn delete(&mut self, charcode: u32, representation: &str) -> Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {}mapping WHERE charcode = ?1 AND representation = ?2",
                self.prefix
            ),
            params![charcode, representation],
        )?;
        Ok(changed > 0)
    }

    fn delete_charcode(&mut self, charcode: u32) -> Result<usize> {
        Ok(self.conn.execute(
            &format!("DELETE FROM {}mapping WHERE charcode = ?1", self.prefix),
            params![charcode],
        )?)
    }

    fn rename(&mut self, charcode: u32, from: &str, to: &str) -> Result<bool> {
        // OR IGNORE turns a uniqueness conflict into a no-op.
        let changed = self.conn.execute(
            &format!(
                "UPDATE OR IGNORE {}mapping SET representation = ?3 \
                 WHERE charcode = ?1 AND representation = ?2",
                self.prefix
            ),
            params![charcode, from, to],
        )?;
        Ok(changed > 0)
    }

    fn set_preference(&mut self, charcode: u32, representation: &str, preference: u32) -> Result<()> {
        self.conn.execute(
            &format!(
                "UPDATE {}mapping SET preference = ?3 WHERE charcode = ?1 AND representation = ?2",
                self.prefix
            ),
            params![charcode, representation, preference],
        )?;
        Ok(())
    }

    fn set_category(&mut self, charcode: u32, representation: &str, category: Category) -> Result<()> {
        self.conn.execute(
            &format!(
                "UPDATE {}mapping SET category = ?3 WHERE charcode = ?1 AND representation = ?2",
                self.prefix
            ),
            params![charcode, representation, category.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generate_schema_sql;
    use texmap_core::Mode;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&generate_schema_sql("t_").unwrap()).unwrap();
        conn
    }

    #[test]
    fn test_store_validates_prefix() {
        let conn = conn();
        assert!(SqliteStore::new(&conn, "t_").is_ok());
        assert!(matches!(
            SqliteStore::new(&conn, "t;--"),
            Err(SqliteError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_insert_or_ignore_and_replace() {
        let conn = conn();
        let mut store = SqliteStore::new(&conn, "t_").unwrap();
        assert!(store.insert_or_ignore(&MappingRow::new(0x26, "\\&", Mode::Math)).unwrap());
        assert!(!store.insert_or_ignore(&MappingRow::new(0x26, "\\&", Mode::Text)).unwrap());
        assert_eq!(store.rows().unwrap()[0].mode, Mode::Math);

        store.replace(&MappingRow::new(0x26, "\\&", Mode::Text)).unwrap();
        assert_eq!(store.rows().unwrap()[0].mode, Mode::Text);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let conn = conn();
        let mut store = SqliteStore::new(&conn, "t_").unwrap();
        store.insert_or_ignore(&MappingRow::new(0xDF, "\\ss ", Mode::Text)).unwrap();
        store.insert_or_ignore(&MappingRow::new(0xDF, "\\ss", Mode::Text)).unwrap();

        assert!(!store.rename(0xDF, "\\ss ", "\\ss").unwrap());
        assert!(!store.rename(0xDF, "\\missing", "\\other").unwrap());
        assert!(store.delete(0xDF, "\\ss").unwrap());
        assert!(store.rename(0xDF, "\\ss ", "\\ss").unwrap());
        let reps: Vec<String> = store.rows().unwrap().into_iter().map(|r| r.representation).collect();
        assert_eq!(reps, vec!["\\ss".to_string()]);
    }

    #[test]
    fn test_updates_and_deletes() {
        let conn = conn();
        let mut store = SqliteStore::new(&conn, "t_").unwrap();
        for representation in ["\\ldots", "\\ldots{}", "{\\ldots}"] {
            store
                .insert_or_ignore(&MappingRow::new(0x2026, representation, Mode::Text))
                .unwrap();
        }
        store.insert_or_ignore(&MappingRow::new(0x3B1, "\\alpha", Mode::Math)).unwrap();

        store.set_preference(0x2026, "\\ldots{}", 0).unwrap();
        store.set_preference(0x2026, "\\ldots", 2).unwrap();
        store.set_category(0x2026, "\\ldots", Category::AsciiFallback).unwrap();
        let rows = store.rows().unwrap();
        let ldots = rows.iter().find(|r| r.representation == "\\ldots").unwrap();
        assert_eq!(ldots.preference, 2);
        assert_eq!(ldots.category, Category::AsciiFallback);

        assert_eq!(store.delete_charcode(0x2026).unwrap(), 3);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.clear().unwrap(), 1);
    }

    #[test]
    fn test_rows_match_memory_store_order() {
        let conn = conn();
        let mut sqlite = SqliteStore::new(&conn, "t_").unwrap();
        let mut memory = texmap_core::MemoryStore::new();
        for (charcode, representation) in [(0xE9, "{\\'e}"), (0xE9, "\\'e"), (0x41, "A"), (0xE9, "\\'{e}")] {
            let row = MappingRow::new(charcode, representation, Mode::Text);
            sqlite.insert_or_ignore(&row).unwrap();
            memory.insert_or_ignore(&row).unwrap();
        }
        assert_eq!(sqlite.rows().unwrap(), memory.rows().unwrap());
    }

    #[test]
    fn test_store_works_inside_transaction() {
        let mut conn = conn();
        {
            let tx = conn.transaction().unwrap();
            let mut store = SqliteStore::new(&tx, "t_").unwrap();
            store.insert_or_ignore(&MappingRow::new(0x3B1, "\\alpha", Mode::Math)).unwrap();
            // dropped without commit
        }
        let store = SqliteStore::new(&conn, "t_").unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
