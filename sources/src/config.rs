//! Build configuration.
//!
//! Names the SQLite database, its table prefix and the source documents a
//! build reads, in order.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! database: build/texmap.sqlite
//! prefix: texmap_
//! sources:
//!   - format: unimath
//!     path: data/unimathsymbols.txt
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use texmap_core::RawMapping;

use crate::error::Result;
use crate::unimath;

/// Default table prefix.
pub const DEFAULT_PREFIX: &str = "texmap_";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Caret-separated `unimathsymbols.txt`.
    Unimath,
}

/// One source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub format: SourceFormat,
    pub path: PathBuf,
}

impl SourceConfig {
    /// Reads the raw associations of this source.
    pub fn read(&self) -> Result<Vec<RawMapping>> {
        match self.format {
            SourceFormat::Unimath => unimath::read_file(&self.path),
        }
    }
}

/// Top-level build configuration.
///
/// # Examples
///
/// ```
/// # let yaml = r#"
/// # version: "1.0"
/// # database: texmap.sqlite
/// # sources:
/// #   - { format: unimath, path: unimathsymbols.txt }
/// # "#;
/// let config: texmap_sources::BuildConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.prefix, "texmap_");
/// assert_eq!(config.sources.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// SQLite database file.
    pub database: PathBuf,
    /// Table name prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Source documents, read in order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl BuildConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Relative database and source paths are resolved against the
    /// directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::SourceError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::SourceError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: Self = serde_yaml::from_reader(reader)?;
        if let Some(base) = path.parent() {
            config.resolve(base);
        }
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Makes relative paths absolute with respect to `base`.
    pub fn resolve(&mut self, base: &Path) {
        if self.database.is_relative() {
            self.database = base.join(&self.database);
        }
        for source in &mut self.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
    }

    /// Reads every source, concatenated in configuration order.
    pub fn read_sources(&self) -> Result<Vec<RawMapping>> {
        let mut records = Vec::new();
        for source in &self.sources {
            records.extend(source.read()?);
        }
        Ok(records)
    }
}
