//! Manual corrections applied after expansion.
//!
//! Some mappings cannot be derived mechanically: a few source entries are
//! wrong, markup-significant characters need their escaped spelling, and
//! some commands have a shorter equivalent the sources never list. The
//! corrections live in a declarative [`OverrideCatalog`]; [`apply_overrides`]
//! runs deletions, then insertions, then substitutions, and hands back the
//! [`PreferredSet`] the preference ranking consults.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::MappingError;
use crate::store::MappingStore;
use crate::types::{MappingRow, Mode};

/// A known-bad row removed unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deletion {
    /// Character of the removed row.
    pub charcode: u32,
    /// Spelling of the removed row.
    pub representation: &'static str,
    /// Mode of the removed row.
    pub mode: Mode,
}

/// A row written with replace-on-conflict semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Character of the written row.
    pub charcode: u32,
    /// Spelling of the written row.
    pub representation: &'static str,
    /// Mode of the written row.
    pub mode: Mode,
    /// Whether the representation joins the preferred set.
    pub preferred: bool,
}

/// Duplicates every row spelled `existing` under `preferred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    /// Spelling whose rows are duplicated.
    pub existing: &'static str,
    /// Spelling the duplicates carry; joins the preferred set.
    pub preferred: &'static str,
}

impl Substitution {
    /// Spellings of `existing` accepted as a source: bare, space- and
    /// empty-group-terminated.
    pub fn source_spellings(&self) -> [String; 3] {
        [
            self.existing.to_string(),
            format!("{} ", self.existing),
            format!("{}{{}}", self.existing),
        ]
    }
}

/// The hand-maintained correction lists.
#[derive(Debug, Clone, Copy)]
pub struct OverrideCatalog {
    /// Rows removed first.
    pub deletions: &'static [Deletion],
    /// Rows written after the deletions.
    pub insertions: &'static [Insertion],
    /// Spelling duplications applied last.
    pub substitutions: &'static [Substitution],
}

const fn preferred(charcode: char, representation: &'static str, mode: Mode) -> Insertion {
    Insertion {
        charcode: charcode as u32,
        representation,
        mode,
        preferred: true,
    }
}

const fn plain(charcode: char, representation: &'static str, mode: Mode) -> Insertion {
    Insertion {
        charcode: charcode as u32,
        representation,
        mode,
        preferred: false,
    }
}

/// Corrections shipped with the tool.
pub static DEFAULT_OVERRIDES: OverrideCatalog = OverrideCatalog {
    deletions: &[Deletion {
        charcode: 0x219C,
        representation: "\\arrowwaveleft",
        mode: Mode::Math,
    }],
    insertions: &[
        preferred('\\', "\\backslash{}", Mode::Math),
        preferred('&', "\\&", Mode::Text),
        preferred('$', "\\$", Mode::Text),
        preferred('\u{00A0}', "~", Mode::Text),
        preferred('\u{2003}', "\\quad{}", Mode::Text),
        preferred('\u{2004}', "\\;", Mode::Text),
        preferred('\u{2009}', "\\,", Mode::Text),
        preferred('\u{200B}', "\\hspace{0pt}", Mode::Text),
        preferred('\u{205F}', "\\:", Mode::Text),
        preferred('\u{FFFD}', "\\dbend{}", Mode::Text),
        preferred('\u{219C}', "\\arrowwaveleft{}", Mode::Math),
        preferred('\u{00B0}', "^\\circ{}", Mode::Math),
        preferred('_', "\\_", Mode::Text),
        preferred('}', "\\}", Mode::Text),
        preferred('{', "\\{", Mode::Text),
        plain('`', "\\textasciigrave", Mode::Text),
        plain('\'', "\\textquotesingle", Mode::Text),
        plain(' ', "\\space", Mode::Text),
    ],
    substitutions: &[
        Substitution {
            existing: "\\textdollar",
            preferred: "\\$",
        },
        Substitution {
            existing: "\\textquotedblleft",
            preferred: "``",
        },
        Substitution {
            existing: "\\textquotedblright",
            preferred: "''",
        },
        Substitution {
            existing: "\\textasciigrave",
            preferred: "`",
        },
        Substitution {
            existing: "\\textquotesingle",
            preferred: "'",
        },
    ],
};

/// Representations that outrank every mechanically ranked spelling.
///
/// Produced by [`apply_overrides`] and consumed by the preference ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreferredSet(BTreeSet<String>);

impl PreferredSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a representation.
    pub fn insert(&mut self, representation: impl Into<String>) -> bool {
        self.0.insert(representation.into())
    }

    /// Returns `true` if `representation` is preferred.
    pub fn contains(&self, representation: &str) -> bool {
        self.0.contains(representation)
    }

    /// Number of preferred representations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is preferred.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the representations in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PreferredSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Counts gathered by [`apply_overrides`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideReport {
    /// Rows removed by the deletion list.
    pub deleted: usize,
    /// Rows written by the insertion list.
    pub inserted: usize,
    /// Rows written by substitutions.
    pub substituted: usize,
}

/// Applies `catalog` to the store.
///
/// # Errors
///
/// Returns [`MappingError::MissingSubstitutionSource`] when a substitution
/// finds no row spelled like its source. Store failures propagate.
pub fn apply_overrides<S: MappingStore>(
    store: &mut S,
    catalog: &OverrideCatalog,
) -> Result<(PreferredSet, OverrideReport), S::Error> {
    let mut preferred = PreferredSet::new();
    let mut report = OverrideReport::default();

    for deletion in catalog.deletions {
        let matches = store.rows()?.into_iter().any(|row| {
            row.charcode == deletion.charcode
                && row.representation == deletion.representation
                && row.mode == deletion.mode
        });
        if matches && store.delete(deletion.charcode, deletion.representation)? {
            report.deleted += 1;
        }
    }

    for insertion in catalog.insertions {
        if insertion.preferred {
            preferred.insert(insertion.representation);
        }
        store.replace(&MappingRow::new(
            insertion.charcode,
            insertion.representation,
            insertion.mode,
        ))?;
        report.inserted += 1;
    }

    for substitution in catalog.substitutions {
        preferred.insert(substitution.preferred);
        let spellings = substitution.source_spellings();
        let charcodes: BTreeSet<u32> = store
            .rows()?
            .into_iter()
            .filter(|row| spellings.contains(&row.representation))
            .map(|row| row.charcode)
            .collect();

        if charcodes.is_empty() {
            return Err(MappingError::MissingSubstitutionSource {
                existing: substitution.existing.to_string(),
            }
            .into());
        }

        for charcode in charcodes {
            debug!(
                charcode,
                existing = substitution.existing,
                preferred = substitution.preferred,
                "Substituting representation"
            );
            store.replace(&MappingRow::new(charcode, substitution.preferred, Mode::Text))?;
            report.substituted += 1;
        }
    }

    info!(
        deleted = report.deleted,
        inserted = report.inserted,
        substituted = report.substituted,
        preferred = preferred.len(),
        "Applied overrides"
    );
    Ok((preferred, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Rows every default substitution needs as a source.
    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (charcode, representation) in [
            ('$' as u32, "\\textdollar"),
            (0x201C, "\\textquotedblleft"),
            (0x201D, "\\textquotedblright{}"),
        ] {
            store
                .insert_or_ignore(&MappingRow::new(charcode, representation, Mode::Text))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_default_catalog_shape() {
        assert_eq!(DEFAULT_OVERRIDES.deletions.len(), 1);
        assert_eq!(DEFAULT_OVERRIDES.substitutions.len(), 5);
        let preferred_count = DEFAULT_OVERRIDES
            .insertions
            .iter()
            .filter(|insertion| insertion.preferred)
            .count();
        assert_eq!(preferred_count, 15);
    }

    #[test]
    fn test_textdollar_substitution() {
        let mut store = seeded_store();
        let (preferred, _) = apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap();

        let row = store.get('$' as u32, "\\$").unwrap();
        assert_eq!(row.mode, Mode::Text);
        assert!(preferred.contains("\\$"));
        assert!(store.get('$' as u32, "\\textdollar").is_some());
    }

    #[test]
    fn test_substitution_accepts_terminated_spellings() {
        let mut store = seeded_store();
        apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap();
        assert!(store.get(0x201D, "''").is_some());
        assert!(store.get(0x201C, "``").is_some());
    }

    #[test]
    fn test_plain_insertions_feed_substitutions() {
        let mut store = seeded_store();
        let (preferred, _) = apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap();
        assert!(store.get('`' as u32, "`").is_some());
        assert!(store.get('\'' as u32, "'").is_some());
        assert!(!preferred.contains("\\textasciigrave"));
        assert!(preferred.contains("`"));
    }

    #[test]
    fn test_missing_substitution_source_is_fatal() {
        let mut store = MemoryStore::new();
        let err = apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap_err();
        assert_eq!(
            err,
            MappingError::MissingSubstitutionSource {
                existing: "\\textdollar".to_string()
            }
        );
    }

    #[test]
    fn test_deletion_requires_matching_mode() {
        let mut store = seeded_store();
        store
            .insert_or_ignore(&MappingRow::new(0x219C, "\\arrowwaveleft", Mode::Text))
            .unwrap();
        let (_, report) = apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap();
        assert_eq!(report.deleted, 0);
        assert!(store.get(0x219C, "\\arrowwaveleft").is_some());

        let mut store = seeded_store();
        store
            .insert_or_ignore(&MappingRow::new(0x219C, "\\arrowwaveleft", Mode::Math))
            .unwrap();
        let (_, report) = apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap();
        assert_eq!(report.deleted, 1);
        assert!(store.get(0x219C, "\\arrowwaveleft").is_none());
        assert!(store.get(0x219C, "\\arrowwaveleft{}").is_some());
    }

    #[test]
    fn test_insertion_replaces_existing_row() {
        let mut store = seeded_store();
        store
            .insert_or_ignore(&MappingRow::new('&' as u32, "\\&", Mode::Math).with_description("old"))
            .unwrap();
        apply_overrides(&mut store, &DEFAULT_OVERRIDES).unwrap();
        let row = store.get('&' as u32, "\\&").unwrap();
        assert_eq!(row.mode, Mode::Text);
        assert_eq!(row.description, None);
    }
}
