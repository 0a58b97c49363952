//! Structural shape classification.
//!
//! Every distinct representation in the store must fall into one of the
//! shapes of [`SHAPE_CATALOG`]. The catalog is ordered: matching is
//! first-match-wins, so earlier descriptors take precedence over later,
//! broader ones. A representation that matches nothing is a fatal error;
//! the catalog is maintained by hand to stay exhaustive over the corpus.
//!
//! Each descriptor records whether the shape is self-delimiting
//! (`terminated`) and whether it is left out of the generated recognizer
//! (`exclude`), usually because it is rare or ambiguous.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MappingError, Result};
use crate::types::MappingRow;

/// One structural shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeDescriptor {
    /// Anchored regular expression over the normalized representation.
    pub pattern: &'static str,
    /// Whether the shape ends unambiguously without a terminator.
    pub terminated: bool,
    /// Whether the shape is validated but omitted from the recognizer.
    pub exclude: bool,
}

const fn shape(pattern: &'static str, terminated: bool) -> ShapeDescriptor {
    ShapeDescriptor {
        pattern,
        terminated,
        exclude: false,
    }
}

const fn excluded(pattern: &'static str, terminated: bool) -> ShapeDescriptor {
    ShapeDescriptor {
        pattern,
        terminated,
        exclude: true,
    }
}

/// The shape catalog, in precedence order.
pub static SHAPE_CATALOG: &[ShapeDescriptor] = &[
    shape(r"^\\fontencoding\{[^\}]+\}\\selectfont\\char[0-9]+$", false),
    shape(r"^\\acute\{\\ddot\{\\[a-z]+\}\}$", true),
    shape(r"^\\cyrchar\{\\'\\[a-zA-Z]+\}$", true),
    shape(r"^\\u \\i$", false),
    shape(r#"^\\[~\^'`"]\\[ij]$"#, false),
    shape(r"^\\=\{\\i\}$", true),
    shape(r"^\\[Huvc] [a-zA-Z]$", false),
    shape(r"^\\mathrm\{[^\}]+\}$", true),
    shape(r"^\\[a-zA-Z]+\{\\?[0-9a-zA-Z]+\}(\{\\?[0-9a-zA-Z]+\})?$", true),
    shape(r"^\\[a-z]+\\[a-zA-Z]+$", false),
    shape(r"^\\[a-z]+\{[,\.a-z0-9]+\}$", true),
    shape(r"^\\[0-9a-zA-Z]+$", false),
    shape(r"^\^[123] ?$", true),
    shape(r"^\^\{[123]\}$", true),
    shape(r#"^\\[\.~\^'`"]\{[a-zA-Z]\}$"#, true),
    shape(r"^\\[=kr]\{[a-zA-Z]\}$", true),
    shape(r"^\\[\.=][a-zA-Z]$", false),
    shape(r"^\^\\circ$", false),
    shape(r"^''+$", true),
    shape(r#"^\\[~\^'`"][a-zA-Z] ?$"#, true),
    shape(r"^\\[^a-zA-Z0-9]$", true),
    shape(r"^\\ddot\{\\[a-z]+\}$", true),
    shape(r"^~$", true),
    shape(r"^\\sqrt\[[234]\]$", true),
    // unterminated
    excluded(r"^\\sim\\joinrel\\leadsto$", false),
    excluded(r#"^\\mathchar"2208$"#, false),
    excluded(r"^\\'\{\}[a-zA-Z]$", false),
    excluded(r"^_\\ast$", false),
    excluded(r"^'n$", false),
    excluded(r"^\\int(\\!\\int)+$", false),
    excluded(r"^\\not\\kern-0.3em\\times$", false),
    // terminated
    excluded(r"^\\Pisymbol\{[a-z0-9]+\}\{[0-9]+\}$", true),
    excluded(r"^\{/\}\\!\\!\{/\}$", true),
    excluded(r"^\\stackrel\{\*\}\{=\}$", true),
    excluded(r"^<\\kern-0.58em\($", true),
    excluded(r"^\\fbox\{~~\}$", true),
    excluded(r"^\\not[<>]$", true),
    excluded(r"^\\ensuremath\{\\[a-zA-Z0-9]+\}$", true),
    excluded(r"^[-`,\.]+$", true),
    excluded(r"^\\rule\{1em\}\{1pt\}$", true),
    excluded(r"^\\'\$\\alpha\$$", true),
    excluded(r"^\\mathrm\{\\ddot\{[A-Z]\}\}$", true),
    excluded(r"^\\'\{\}\{[a-zA-Z]\}$", true),
    excluded(r"^'$", true),
    excluded(r"^\\mathbin\{\{:\}\\!\\!\{-\}\\!\\!\{:\}\}$", true),
    excluded(r"^\\not =$", true),
    excluded(r"^=:$", true),
    excluded(r"^:=$", true),
    excluded(r"^:$", true),
];

/// A compiled, ordered list of shape descriptors.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    descriptors: &'static [ShapeDescriptor],
    compiled: Vec<Regex>,
}

static BUILTIN: LazyLock<PatternCatalog> = LazyLock::new(|| {
    PatternCatalog::new(SHAPE_CATALOG).expect("built-in shape catalog must compile")
});

impl PatternCatalog {
    /// Compiles a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidShapePattern`] if a pattern does not
    /// compile.
    pub fn new(descriptors: &'static [ShapeDescriptor]) -> Result<Self> {
        let compiled = descriptors
            .iter()
            .map(|descriptor| {
                Regex::new(descriptor.pattern).map_err(|e| MappingError::InvalidShapePattern {
                    pattern: descriptor.pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            descriptors,
            compiled,
        })
    }

    /// Returns the compiled [`SHAPE_CATALOG`].
    pub fn builtin() -> &'static PatternCatalog {
        &BUILTIN
    }

    /// Descriptors in precedence order.
    pub fn descriptors(&self) -> &'static [ShapeDescriptor] {
        self.descriptors
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the index of the first descriptor matching `shape`.
    pub fn classify(&self, shape: &str) -> Option<usize> {
        self.compiled.iter().position(|re| re.is_match(shape))
    }

    /// Returns the indices of every descriptor matching `shape`.
    pub fn all_matches(&self, shape: &str) -> Vec<usize> {
        self.compiled
            .iter()
            .enumerate()
            .filter(|(_, re)| re.is_match(shape))
            .map(|(index, _)| index)
            .collect()
    }

    /// Classifies every row of a fully populated store.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnclassifiedRepresentation`] for the first
    /// shape no descriptor matches.
    pub fn classify_rows(&self, rows: &[MappingRow]) -> Result<ClassificationReport> {
        let mut report = ClassificationReport {
            counts: vec![0; self.len()],
            classified: 0,
            skipped: 0,
        };

        for row in rows {
            let Some(shape) = normalize_shape(row.charcode, &row.representation) else {
                report.skipped += 1;
                continue;
            };
            let index = self
                .classify(shape)
                .ok_or_else(|| MappingError::UnclassifiedRepresentation {
                    charcode: row.charcode,
                    representation: shape.to_string(),
                })?;
            report.counts[index] += 1;
            report.classified += 1;
        }

        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if report.counts[index] == 0 {
                debug!(index, pattern = descriptor.pattern, "Shape descriptor matched nothing");
            }
        }
        info!(
            classified = report.classified,
            skipped = report.skipped,
            "Classified representation shapes"
        );
        Ok(report)
    }
}

/// Per-descriptor match counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationReport {
    /// Matches per descriptor, indexed like the catalog.
    pub counts: Vec<usize>,
    /// Rows that were classified.
    pub classified: usize,
    /// Rows skipped by the pre-filter.
    pub skipped: usize,
}

/// Reduces a representation to the shape the catalog is matched against.
///
/// Trims the representation (a lone space is kept), unwraps a single outer
/// brace pair, and drops a trailing empty group. Returns `None` for shapes
/// that need no classification: identity spellings of Latin-1 characters,
/// plain words and blanks.
///
/// # Examples
///
/// ```
/// use texmap_core::patterns::normalize_shape;
///
/// assert_eq!(normalize_shape(0xE9, "{\\'e}"), Some("\\'e"));
/// assert_eq!(normalize_shape(0x3B1, "\\alpha{}"), Some("\\alpha"));
/// assert_eq!(normalize_shape(0x2260, "{\\ne}{}"), Some("{\\ne}"));
/// assert_eq!(normalize_shape(0xE9, "é"), None);
/// assert_eq!(normalize_shape(0x2192, "to"), None);
/// ```
pub fn normalize_shape(charcode: u32, representation: &str) -> Option<&str> {
    let mut shape = if representation == " " {
        representation
    } else {
        representation.trim_ascii()
    };

    if shape.len() > 2 && shape.starts_with('{') && shape.ends_with('}') && !shape.contains("}{") {
        shape = &shape[1..shape.len() - 1];
    }
    if let Some(stripped) = shape.strip_suffix("{}") {
        shape = stripped;
    }

    if charcode < 256 && char::from_u32(charcode).is_some_and(|ch| shape.chars().eq(std::iter::once(ch))) {
        return None;
    }
    if !shape.is_empty() && shape.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }
    if shape.trim_ascii().is_empty() {
        return None;
    }
    Some(shape)
}
