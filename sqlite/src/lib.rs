//! SQLite storage backend for texmap mapping tables.
//!
//! This crate stores the mapping table built by
//! [`texmap_core::pipeline`] in SQLite. It provides table lifecycle
//! management, a [`MappingStore`](texmap_core::MappingStore) implementation
//! that runs the pipeline directly against the database, and conversion
//! between mapping types and SQL rows.
//!
//! # Architecture
//!
//! - **`schema`**: SQL generation with customizable table prefixes
//! - **`store`**: [`SqliteStore`], the pipeline's view of one mapping table
//! - **`migration`**: [`MappingDatabase`], create/drop/build/status
//! - **`convert`**: row conversion and build metadata
//!
//! # Quick start
//!
//! ```no_run
//! use rusqlite::Connection;
//! use texmap_core::export::{Encoding, to_latex};
//! use texmap_sources::BuildConfig;
//! use texmap_sqlite::MappingDatabase;
//!
//! let config = BuildConfig::load("texmap.yml").unwrap();
//! let conn = Connection::open(&config.database).unwrap();
//! let mut db = MappingDatabase::new(conn, &config.prefix).unwrap();
//!
//! db.build_from_config(&config, false).unwrap();
//! let table = to_latex(&db.rows().unwrap(), Encoding::Unicode);
//! println!("{} math entries", table.math.len());
//! ```
//!
//! # Table prefix customization
//!
//! All table and index names are prefixed with a configurable string,
//! allowing several isolated mapping tables within the same SQLite database.
//! Prefixes must contain only alphanumeric characters and underscores.

mod convert;
mod error;
mod migration;
mod schema;
mod store;

pub use convert::LastBuild;
pub use error::{Result, SqliteError};
pub use migration::{MappingDatabase, MigrationStatus, TOOL_VERSION};
pub use schema::{generate_drop_sql, generate_schema_sql};
pub use store::SqliteStore;
