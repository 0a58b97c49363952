//! Read-only export views over a fully built mapping table.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grammar::{self, RecognizerRule};
use crate::patterns::PatternCatalog;
use crate::types::{Category, MappingRow, Mode};

/// Target character set of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Unicode-capable output: only characters that must be escaped translate.
    #[default]
    Unicode,
    /// ASCII-only output: every non-ASCII character translates.
    Ascii,
}

impl Encoding {
    /// Returns `true` if rows of `category` are part of the export.
    pub fn admits(self, category: Category) -> bool {
        match category {
            Category::Direct => false,
            Category::Translate => true,
            Category::AsciiFallback => self == Encoding::Ascii,
        }
    }
}

/// One translated character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatexEntry {
    /// Preferred LaTeX spelling.
    pub representation: String,
    /// Character name from the source, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Character to LaTeX translation table, split by mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatexTable {
    /// Entries whose preferred spelling is text mode.
    pub text: BTreeMap<u32, LatexEntry>,
    /// Entries whose preferred spelling is math mode.
    pub math: BTreeMap<u32, LatexEntry>,
}

impl LatexTable {
    /// Number of translated characters over both modes.
    pub fn len(&self) -> usize {
        self.text.len() + self.math.len()
    }

    /// Returns `true` if nothing translates.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.math.is_empty()
    }
}

/// Builds the character to LaTeX table.
///
/// Only the preferred spelling (`preference == 0`) of each charcode is
/// exported, under its own mode.
pub fn to_latex(rows: &[MappingRow], encoding: Encoding) -> LatexTable {
    let mut ordered: Vec<&MappingRow> = rows
        .iter()
        .filter(|row| row.preference == 0 && encoding.admits(row.category))
        .collect();
    ordered.sort_by(|a, b| a.charcode.cmp(&b.charcode).then_with(|| a.mode.cmp(&b.mode)));

    let mut table = LatexTable::default();
    let mut seen = HashSet::new();
    for row in ordered {
        if !seen.insert(row.charcode) {
            continue;
        }
        let entry = LatexEntry {
            representation: row.representation.clone(),
            description: row.description.clone(),
        };
        match row.mode {
            Mode::Text => table.text.insert(row.charcode, entry),
            Mode::Math => table.math.insert(row.charcode, entry),
        };
    }
    table
}

/// One LaTeX spelling mapped back to its character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseEntry {
    /// Trimmed LaTeX spelling.
    pub representation: String,
    /// Owning charcode.
    pub charcode: u32,
    /// The character itself.
    pub character: String,
}

/// Builds the LaTeX to character table.
///
/// Each trimmed spelling appears once, owned by the first charcode that
/// lists it in `(charcode, preference)` order.
pub fn to_unicode(rows: &[MappingRow]) -> Vec<ReverseEntry> {
    let mut ordered: Vec<&MappingRow> = rows.iter().collect();
    ordered.sort_by_key(|row| (row.charcode, row.preference));

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for row in ordered {
        let representation = row.representation.trim_ascii();
        if representation.is_empty() || representation.chars().all(|ch| ch.is_ascii_alphabetic()) {
            continue;
        }
        let Some(character) = char::from_u32(row.charcode) else {
            continue;
        };
        if row.charcode < 256 && representation.chars().eq(std::iter::once(character)) {
            continue;
        }
        if seen.insert(representation.to_string()) {
            entries.push(ReverseEntry {
                representation: representation.to_string(),
                charcode: row.charcode,
                character: character.to_string(),
            });
        }
    }
    entries
}

// SAFETY: These regexes are compile-time constants and are validated by tests.
static EMBRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\[a-z]\{[^}]+\}$").expect("static regex must compile"));

/// Lists single-letter commands with one braced argument, such as `\k{a}`.
///
/// Consumers wrap these in an extra brace pair so case protection does not
/// split the command from its argument.
pub fn embrace(rows: &[MappingRow]) -> Vec<String> {
    rows.iter()
        .map(|row| row.representation.as_str())
        .filter(|representation| EMBRACE_RE.is_match(representation))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Lowers the recognizer rules of `catalog` for the spellings in `rows`.
///
/// # Errors
///
/// Returns [`MappingError::UnclassifiedRepresentation`](crate::MappingError::UnclassifiedRepresentation)
/// if a stored spelling matches no descriptor, since the recognizer could
/// not parse it back.
pub fn recognizer_rules(catalog: &PatternCatalog, rows: &[MappingRow]) -> Result<Vec<RecognizerRule>> {
    catalog.classify_rows(rows)?;
    grammar::recognizer_rules(catalog)
}
