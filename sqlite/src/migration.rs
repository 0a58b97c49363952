//! Lifecycle of the mapping tables.
//!
//! Provides [`MappingDatabase`] for creating and dropping the tables,
//! rebuilding the mapping table from raw associations, and inspecting the
//! result. A build runs the whole pipeline inside one transaction: a fatal
//! error leaves the previous table untouched.
//!
//! # Example
//!
//! ```no_run
//! use rusqlite::Connection;
//! use texmap_sources::{BuildConfig, fingerprint_sources};
//! use texmap_sqlite::MappingDatabase;
//!
//! let config = BuildConfig::load("texmap.yml").unwrap();
//! let conn = Connection::open(&config.database).unwrap();
//! let mut db = MappingDatabase::new(conn, &config.prefix).unwrap();
//!
//! let fingerprints = fingerprint_sources(&config).unwrap();
//! if !db.is_current(&fingerprints).unwrap() {
//!     let records = config.read_sources().unwrap();
//!     db.build(&records, &fingerprints).unwrap();
//! }
//! println!("{} rows", db.status().unwrap().mapping_count);
//! ```

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Serialize;
use texmap_core::pipeline::{self, PipelineReport};
use texmap_core::{DEFAULT_OVERRIDES, MappingRow, PatternCatalog, RawMapping};
use texmap_sources::{BuildConfig, SourceFingerprint, fingerprint_sources};
use tracing::{debug, info};

use crate::convert::{self, LastBuild};
use crate::error::{Result, SqliteError};
use crate::schema::{generate_drop_sql, generate_schema_sql, validate_prefix};
use crate::store::SqliteStore;

/// Version recorded with every build.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Owns a connection and manages the mapping tables under one prefix.
pub struct MappingDatabase {
    conn: Connection,
    prefix: String,
}

impl MappingDatabase {
    /// Creates a manager for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix contains invalid characters.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { conn, prefix })
    }

    /// Table prefix in use.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creates all tables and indexes.
    ///
    /// Uses `CREATE TABLE IF NOT EXISTS` so it is safe to call multiple times.
    pub fn up(&mut self) -> Result<()> {
        let sql = generate_schema_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to create tables: {e}")))?;
        tx.commit()?;
        Ok(())
    }

    /// Drops all tables.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        Ok(())
    }

    /// Returns table existence, row counts and the last build.
    pub fn status(&self) -> Result<MigrationStatus> {
        if !self.tables_exist()? {
            return Ok(MigrationStatus {
                tables_exist: false,
                mapping_count: 0,
                charcode_count: 0,
                last_build: None,
            });
        }

        let mapping_count = self.count(&format!("SELECT COUNT(*) FROM {}mapping", self.prefix))?;
        let charcode_count = self.count(&format!(
            "SELECT COUNT(DISTINCT charcode) FROM {}mapping",
            self.prefix
        ))?;

        Ok(MigrationStatus {
            tables_exist: true,
            mapping_count,
            charcode_count,
            last_build: self.last_build()?,
        })
    }

    /// Returns `true` if the last build read sources with exactly these
    /// fingerprints using this tool version.
    pub fn is_current(&self, fingerprints: &[SourceFingerprint]) -> Result<bool> {
        if !self.tables_exist()? {
            return Ok(false);
        }
        Ok(self.last_build()?.is_some_and(|last| {
            last.tool_version == TOOL_VERSION && last.fingerprints.as_slice() == fingerprints
        }))
    }

    /// Rebuilds the mapping table from raw associations.
    ///
    /// Creates the tables if needed, clears the mapping table, runs the full
    /// pipeline and records `fingerprints`, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Mapping`] for fatal pipeline conditions; the
    /// transaction is rolled back and the previous table is kept.
    pub fn build(
        &mut self,
        records: &[RawMapping],
        fingerprints: &[SourceFingerprint],
    ) -> Result<PipelineReport> {
        self.up()?;

        let tx = self.conn.transaction()?;
        let report = {
            let mut store = SqliteStore::new(&tx, self.prefix.as_str())?;
            let cleared = store.clear()?;
            debug!(cleared, "Cleared mapping table");

            let report = pipeline::build(
                &mut store,
                records,
                &DEFAULT_OVERRIDES,
                PatternCatalog::builtin(),
            )?;

            convert::store_build_meta(
                &tx,
                &self.prefix,
                &LastBuild {
                    tool_version: TOOL_VERSION.to_string(),
                    built_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                    row_count: store.count()?,
                    fingerprints: fingerprints.to_vec(),
                },
            )?;
            report
        };
        tx.commit()?;

        info!(
            prefix = %self.prefix,
            rows = report.ranked,
            sources = fingerprints.len(),
            "Built mapping table"
        );
        Ok(report)
    }

    /// Reads the configured sources and rebuilds, unless the table is
    /// already current for them. Returns `None` when the build was skipped.
    pub fn build_from_config(
        &mut self,
        config: &BuildConfig,
        force: bool,
    ) -> Result<Option<PipelineReport>> {
        let fingerprints = fingerprint_sources(config)?;
        if !force && self.is_current(&fingerprints)? {
            debug!(sources = fingerprints.len(), "Sources unchanged since last build");
            return Ok(None);
        }
        let records = config.read_sources()?;
        self.build(&records, &fingerprints).map(Some)
    }

    /// Returns every mapping row ordered by `(charcode, representation)`.
    pub fn rows(&self) -> Result<Vec<MappingRow>> {
        convert::load_rows(&self.conn, &self.prefix)
    }

    /// Returns the metadata of the last successful build.
    pub fn last_build(&self) -> Result<Option<LastBuild>> {
        if !self.tables_exist()? {
            return Ok(None);
        }
        convert::load_build_meta(&self.conn, &self.prefix)
    }

    /// Checks whether the mapping and metadata tables exist.
    fn tables_exist(&self) -> Result<bool> {
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN (?1, ?2)",
        )?;
        let count: i64 = stmt.query_row(
            [
                format!("{}mapping", self.prefix),
                format!("{}build_meta", self.prefix),
            ],
            |row| row.get(0),
        )?;
        Ok(count == 2)
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Snapshot returned by [`MappingDatabase::status`].
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Whether the tables exist in the database.
    pub tables_exist: bool,
    /// Number of mapping rows.
    pub mapping_count: usize,
    /// Number of distinct charcodes.
    pub charcode_count: usize,
    /// Metadata of the last successful build.
    pub last_build: Option<LastBuild>,
}
