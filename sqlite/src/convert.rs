//! Conversion between mapping types and SQL rows.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use texmap_core::{Category, MappingRow, Mode};
use texmap_sources::SourceFingerprint;

use crate::error::{Result, SqliteError};

/// Columns selected by [`load_rows`], in tuple order.
const MAPPING_COLUMNS: &str = "charcode, representation, mode, category, preference, description";

type RawRow = (u32, String, String, String, u32, Option<String>);

/// Parses a stored mode name.
pub(crate) fn string_to_mode(s: &str) -> Result<Mode> {
    Mode::parse(s).ok_or_else(|| SqliteError::ConversionError(format!("unknown mode: {s}")))
}

/// Parses a stored category name.
pub(crate) fn string_to_category(s: &str) -> Result<Category> {
    Category::parse(s).ok_or_else(|| SqliteError::ConversionError(format!("unknown category: {s}")))
}

fn into_mapping_row(raw: RawRow) -> Result<MappingRow> {
    let (charcode, representation, mode, category, preference, description) = raw;
    Ok(MappingRow {
        charcode,
        representation,
        mode: string_to_mode(&mode)?,
        category: string_to_category(&category)?,
        preference,
        description,
    })
}

/// Loads every mapping row ordered by `(charcode, representation)`.
pub fn load_rows(conn: &Connection, prefix: &str) -> Result<Vec<MappingRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MAPPING_COLUMNS} FROM {prefix}mapping ORDER BY charcode, representation"
    ))?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<RawRow>>>()?;
    raw.into_iter().map(into_mapping_row).collect()
}

/// Inserts a mapping row with the given conflict clause (`IGNORE` or `REPLACE`).
pub fn insert_row(conn: &Connection, prefix: &str, conflict: &str, row: &MappingRow) -> Result<usize> {
    let changed = conn.execute(
        &format!(
            "INSERT OR {conflict} INTO {prefix}mapping ({MAPPING_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        ),
        params![
            row.charcode,
            row.representation,
            row.mode.as_str(),
            row.category.as_str(),
            row.preference,
            row.description,
        ],
    )?;
    Ok(changed)
}

/// Metadata of the last successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastBuild {
    /// Version of the tool that produced the table.
    pub tool_version: String,
    /// RFC 3339 UTC timestamp of the build.
    pub built_at: String,
    /// Rows in the mapping table after the build.
    pub row_count: usize,
    /// Digests of the sources the build read.
    pub fingerprints: Vec<SourceFingerprint>,
}

/// Writes the build metadata row, replacing any previous one.
pub fn store_build_meta(conn: &Connection, prefix: &str, meta: &LastBuild) -> Result<()> {
    let fingerprints = serde_json::to_string(&meta.fingerprints)
        .map_err(|e| SqliteError::ConversionError(format!("cannot encode fingerprints: {e}")))?;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {prefix}build_meta (id, tool_version, built_at, row_count, fingerprints) \
             VALUES (1, ?1, ?2, ?3, ?4)"
        ),
        params![meta.tool_version, meta.built_at, meta.row_count as i64, fingerprints],
    )?;
    Ok(())
}

/// Reads the build metadata row, if a build completed.
pub fn load_build_meta(conn: &Connection, prefix: &str) -> Result<Option<LastBuild>> {
    let raw: Option<(String, String, i64, String)> = conn
        .query_row(
            &format!(
                "SELECT tool_version, built_at, row_count, fingerprints FROM {prefix}build_meta WHERE id = 1"
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    raw.map(|(tool_version, built_at, row_count, fingerprints)| {
        let fingerprints = serde_json::from_str(&fingerprints)
            .map_err(|e| SqliteError::ConversionError(format!("invalid fingerprints: {e}")))?;
        Ok(LastBuild {
            tool_version,
            built_at,
            row_count: usize::try_from(row_count)
                .map_err(|_| SqliteError::ConversionError(format!("invalid row count: {row_count}")))?,
            fingerprints,
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generate_schema_sql;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&generate_schema_sql("t_").unwrap()).unwrap();
        conn
    }

    #[test]
    fn test_unknown_mode_and_category() {
        assert!(matches!(string_to_mode("display"), Err(SqliteError::ConversionError(_))));
        assert!(matches!(string_to_category("maybe"), Err(SqliteError::ConversionError(_))));
    }

    #[test]
    fn test_insert_and_load_rows() {
        let conn = conn();
        let mut row = MappingRow::new(0xE9, "\\'e", Mode::Text).with_description("LATIN SMALL LETTER E WITH ACUTE");
        row.category = Category::AsciiFallback;
        row.preference = 2;
        assert_eq!(insert_row(&conn, "t_", "IGNORE", &row).unwrap(), 1);
        assert_eq!(insert_row(&conn, "t_", "IGNORE", &row).unwrap(), 0);
        assert_eq!(load_rows(&conn, "t_").unwrap(), vec![row]);
    }

    #[test]
    fn test_build_meta_round_trip() {
        let conn = conn();
        assert_eq!(load_build_meta(&conn, "t_").unwrap(), None);

        let meta = LastBuild {
            tool_version: "0.1.0".into(),
            built_at: "2026-01-01T00:00:00Z".into(),
            row_count: 42,
            fingerprints: vec![SourceFingerprint {
                path: "unimathsymbols.txt".into(),
                sha256: "abc".into(),
            }],
        };
        store_build_meta(&conn, "t_", &meta).unwrap();
        store_build_meta(&conn, "t_", &meta).unwrap();
        assert_eq!(load_build_meta(&conn, "t_").unwrap(), Some(meta));
    }

    #[test]
    fn test_corrupt_mode_is_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t_mapping (charcode INTEGER, representation TEXT, mode TEXT, category TEXT, preference INTEGER, description TEXT);
             INSERT INTO t_mapping VALUES (65, 'A', 'display', 'direct', 0, NULL);",
        )
        .unwrap();
        assert!(matches!(load_rows(&conn, "t_"), Err(SqliteError::ConversionError(_))));
    }
}
