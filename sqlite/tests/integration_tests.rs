//! Integration tests for the texmap-sqlite crate.

use rusqlite::Connection;
use texmap_core::export::{self, Encoding};
use texmap_core::{
    DEFAULT_OVERRIDES, MappingStore, MemoryStore, Mode, PatternCatalog, RawMapping, pipeline,
};
use texmap_sources::{BuildConfig, SourceFingerprint};
use texmap_sqlite::{MappingDatabase, SqliteError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const UNIMATH: &str = "\
# no.^chr^LaTeX^unicode-math^cls^category^requirements^comments
00024^$^\\textdollar^\\mathdollar^N^mathord^^DOLLAR SIGN
000B1^±^\\pm^^v^mathbin^^PLUS-MINUS SIGN
000E9^é^\\'e^^^^^LATIN SMALL LETTER E WITH ACUTE
003B1^α^\\alpha^^A^mathalpha^^GREEK SMALL LETTER ALPHA
0201C^“^\\textquotedblleft^^^^^LEFT DOUBLE QUOTATION MARK
0201D^”^\\textquotedblright^^^^^RIGHT DOUBLE QUOTATION MARK
";

fn records() -> Vec<RawMapping> {
    texmap_sources::unimath::parse(UNIMATH).unwrap()
}

fn fingerprints() -> Vec<SourceFingerprint> {
    vec![SourceFingerprint {
        path: "unimathsymbols.txt".into(),
        sha256: "0".repeat(64),
    }]
}

fn write_project(dir: &std::path::Path, data: &str) -> BuildConfig {
    std::fs::write(dir.join("unimathsymbols.txt"), data).unwrap();
    let path = dir.join("texmap.yml");
    std::fs::write(
        &path,
        "version: \"1.0\"\ndatabase: texmap.sqlite\nprefix: tm_\nsources:\n  - format: unimath\n    path: unimathsymbols.txt\n",
    )
    .unwrap();
    BuildConfig::load(path).unwrap()
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

#[test]
fn test_sqlite_build_matches_memory_build() {
    let mut db = MappingDatabase::new(Connection::open_in_memory().unwrap(), "tm_").unwrap();
    db.build(&records(), &fingerprints()).unwrap();

    let mut memory = MemoryStore::new();
    pipeline::build(
        &mut memory,
        &records(),
        &DEFAULT_OVERRIDES,
        PatternCatalog::builtin(),
    )
    .unwrap();

    assert_eq!(db.rows().unwrap(), memory.rows().unwrap());
}

#[test]
fn test_build_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("texmap.sqlite");
    {
        let mut db = MappingDatabase::new(Connection::open(&path).unwrap(), "tm_").unwrap();
        db.build(&records(), &fingerprints()).unwrap();
    }

    let db = MappingDatabase::new(Connection::open(&path).unwrap(), "tm_").unwrap();
    let status = db.status().unwrap();
    assert!(status.tables_exist);
    assert!(status.mapping_count > 6);
    assert_eq!(status.last_build.unwrap().fingerprints, fingerprints());
    assert!(db.is_current(&fingerprints()).unwrap());
}

#[test]
fn test_fatal_error_leaves_no_partial_state() {
    let mut db = MappingDatabase::new(Connection::open_in_memory().unwrap(), "tm_").unwrap();

    // No quotation mark rows: the override substitutions have no source.
    let broken = vec![
        RawMapping::new('$' as u32, "\\textdollar", Mode::Math),
        RawMapping::new(0x3B1, "\\alpha", Mode::Math),
    ];
    let err = db.build(&broken, &fingerprints()).unwrap_err();
    assert!(matches!(err, SqliteError::Mapping(_)));

    let status = db.status().unwrap();
    assert!(status.tables_exist);
    assert_eq!(status.mapping_count, 0);
    assert!(status.last_build.is_none());
}

#[test]
fn test_prefixes_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite");

    let mut first = MappingDatabase::new(Connection::open(&path).unwrap(), "first_").unwrap();
    first.build(&records(), &fingerprints()).unwrap();

    let mut second = MappingDatabase::new(Connection::open(&path).unwrap(), "second_").unwrap();
    assert!(!second.status().unwrap().tables_exist);
    second.up().unwrap();
    assert_eq!(second.status().unwrap().mapping_count, 0);

    second.down().unwrap();
    assert!(first.status().unwrap().mapping_count > 0);
}

// ---------------------------------------------------------------------------
// Config-driven rebuilds
// ---------------------------------------------------------------------------

#[test]
fn test_build_from_config_skips_unchanged_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), UNIMATH);
    let conn = Connection::open(&config.database).unwrap();
    let mut db = MappingDatabase::new(conn, &config.prefix).unwrap();

    assert!(db.build_from_config(&config, false).unwrap().is_some());
    assert!(db.build_from_config(&config, false).unwrap().is_none());
    assert!(db.build_from_config(&config, true).unwrap().is_some());

    // Editing a source invalidates the fingerprint.
    let extra = format!("{UNIMATH}02200^∀^\\forall^^^mathord^^FOR ALL\n");
    std::fs::write(dir.path().join("unimathsymbols.txt"), extra).unwrap();
    let report = db.build_from_config(&config, false).unwrap().unwrap();
    assert_eq!(report.ingest.inserted, 7);
}

#[test]
fn test_build_from_config_reports_source_errors() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), "00041^A^A\n");
    let conn = Connection::open(&config.database).unwrap();
    let mut db = MappingDatabase::new(conn, &config.prefix).unwrap();

    let err = db.build_from_config(&config, false).unwrap_err();
    assert!(matches!(err, SqliteError::Source(_)));
    assert!(!db.status().unwrap().tables_exist);
}

// ---------------------------------------------------------------------------
// Exports from stored rows
// ---------------------------------------------------------------------------

#[test]
fn test_exports_from_stored_rows() {
    let mut db = MappingDatabase::new(Connection::open_in_memory().unwrap(), "tm_").unwrap();
    db.build(&records(), &fingerprints()).unwrap();
    let rows = db.rows().unwrap();

    let unicode = export::to_latex(&rows, Encoding::Unicode);
    assert_eq!(unicode.text[&('$' as u32)].representation, "\\$");
    assert!(!unicode.math.contains_key(&0x3B1));

    let ascii = export::to_latex(&rows, Encoding::Ascii);
    assert_eq!(ascii.math[&0x3B1].representation, "\\alpha{}");
    assert!(ascii.len() > unicode.len());

    let reverse = export::to_unicode(&rows);
    let alpha = reverse
        .iter()
        .find(|entry| entry.representation == "\\alpha")
        .unwrap();
    assert_eq!(alpha.character, "α");
}
