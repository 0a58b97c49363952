//! SQL schema generation with customizable table prefixes.
//!
//! # Table structure
//!
//! - `{prefix}mapping`: one row per `(charcode, representation)` spelling
//! - `{prefix}build_meta`: a single row describing the last build
//!
//! Prefixes must contain only alphanumeric characters and underscores, so
//! several mapping tables (e.g., `prod_`, `test_`) can share one database.

use crate::error::{Result, SqliteError};

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the SQL creating every table and index for `prefix`.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is empty or contains
/// characters other than alphanumerics and underscores.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}mapping (
    charcode INTEGER NOT NULL CHECK (charcode BETWEEN 0 AND 1114111),
    representation TEXT NOT NULL CHECK (length(representation) > 0),
    mode TEXT NOT NULL CHECK (mode IN ('text', 'math')),
    category TEXT NOT NULL DEFAULT 'direct' CHECK (category IN ('direct', 'translate', 'ascii_fallback')),
    preference INTEGER NOT NULL DEFAULT 0 CHECK (preference >= 0),
    description TEXT,
    UNIQUE (charcode, representation)
);

CREATE TABLE IF NOT EXISTS {prefix}build_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    tool_version TEXT NOT NULL,
    built_at TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    fingerprints TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{prefix}mapping_representation ON {prefix}mapping(representation);
"#
    );

    Ok(sql)
}

/// Generates SQL to drop every table for `prefix`.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
DROP TABLE IF EXISTS {prefix}build_meta;
DROP TABLE IF EXISTS {prefix}mapping;
"#
    );

    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefix() {
        assert!(validate_prefix("texmap_").is_ok());
        assert!(validate_prefix("test123").is_ok());
        assert!(validate_prefix("A_B_C").is_ok());
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("drop;--").is_err());
        assert!(validate_prefix("hello world").is_err());
        assert!(validate_prefix("test-prefix").is_err());
        assert!(validate_prefix("tëst").is_err());
    }

    #[test]
    fn test_generate_schema_sql_contains_tables() {
        let sql = generate_schema_sql("tm_").unwrap();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS tm_mapping"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS tm_build_meta"));
        assert!(sql.contains("idx_tm_mapping_representation"));
    }

    #[test]
    fn test_generate_drop_sql_contains_all_tables() {
        let sql = generate_drop_sql("tm_").unwrap();
        assert!(sql.contains("DROP TABLE IF EXISTS tm_mapping"));
        assert!(sql.contains("DROP TABLE IF EXISTS tm_build_meta"));
        assert!(generate_drop_sql("").is_err());
    }

    #[test]
    fn test_mapping_constraints() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&generate_schema_sql("t_").unwrap()).unwrap();
        let insert = |charcode: i64, representation: &str, mode: &str| {
            conn.execute(
                "INSERT INTO t_mapping (charcode, representation, mode) VALUES (?1, ?2, ?3)",
                rusqlite::params![charcode, representation, mode],
            )
        };

        assert!(insert(0xE9, "\\'e", "text").is_ok());
        // duplicate key
        assert!(insert(0xE9, "\\'e", "math").is_err());
        assert!(insert(0xE9, "", "text").is_err());
        assert!(insert(0x110000, "x", "text").is_err());
        assert!(insert(0xE9, "{\\'e}", "display").is_err());
    }
}
