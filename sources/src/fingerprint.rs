//! Content fingerprints of source documents.
//!
//! A build records the SHA-256 digest of every source it read. A later
//! build compares digests to decide whether the table is stale.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::BuildConfig;
use crate::error::Result;

/// Digest of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    /// Path as given in the configuration, after resolution.
    pub path: String,
    /// SHA-256 hex digest of the file contents.
    pub sha256: String,
}

/// Computes the SHA-256 hex digest of a file.
///
/// # Errors
///
/// Returns [`IoError`](crate::SourceError::IoError) if the file cannot be
/// read.
pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{:x}", hash))
}

/// Fingerprints every source of `config`, in configuration order.
pub fn fingerprint_sources(config: &BuildConfig) -> Result<Vec<SourceFingerprint>> {
    config
        .sources
        .iter()
        .map(|source| {
            Ok(SourceFingerprint {
                path: source.path.display().to_string(),
                sha256: calculate_checksum(&source.path)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SourceConfig, SourceFormat};

    #[test]
    fn test_checksum_calculation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(
            calculate_checksum(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unimathsymbols.txt");
        std::fs::write(&path, "a").unwrap();

        let config = BuildConfig {
            version: "1.0".into(),
            database: dir.path().join("texmap.sqlite"),
            prefix: "texmap_".into(),
            sources: vec![SourceConfig {
                format: SourceFormat::Unimath,
                path: path.clone(),
            }],
        };
        let before = fingerprint_sources(&config).unwrap();
        assert_eq!(before, fingerprint_sources(&config).unwrap());

        std::fs::write(&path, "b").unwrap();
        let after = fingerprint_sources(&config).unwrap();
        assert_ne!(before, after);
        assert_eq!(before[0].path, after[0].path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = calculate_checksum("/nonexistent/texmap/source.txt").unwrap_err();
        assert!(matches!(err, crate::SourceError::IoError(_)));
    }
}
