//! Source documents and build configuration for texmap.
//!
//! - [`unimath`] reads the caret-separated `unimathsymbols.txt` table into
//!   raw associations.
//! - [`BuildConfig`] names the database, table prefix and sources of a
//!   build.
//! - [`fingerprint_sources`] digests the sources so unchanged inputs can
//!   skip a rebuild.
//!
//! # Quick start
//!
//! ```no_run
//! use texmap_sources::{BuildConfig, fingerprint_sources};
//!
//! let config = BuildConfig::load("texmap.yml").unwrap();
//! let records = config.read_sources().unwrap();
//! let fingerprints = fingerprint_sources(&config).unwrap();
//! println!("{} records from {} sources", records.len(), fingerprints.len());
//! ```

mod config;
mod error;
mod fingerprint;

pub mod unimath;

pub use config::{BuildConfig, DEFAULT_PREFIX, SourceConfig, SourceFormat};
pub use error::{Result, SourceError};
pub use fingerprint::{SourceFingerprint, calculate_checksum, fingerprint_sources};
