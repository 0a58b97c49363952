//! Mapping type definitions.
//!
//! This module defines the data model shared by every stage of the
//! pipeline: the [`MappingRow`] stored per `(charcode, representation)` key
//! and the small enums describing its typesetting [`Mode`] and translation
//! [`Category`]. The types serialize with [`serde`] and round-trip through
//! SQLite via their [`as_str`](Mode::as_str) / [`parse`](Mode::parse) forms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};

/// Highest valid Unicode scalar value.
pub const MAX_CHARCODE: u32 = 0x10FFFF;

/// Non-breaking space, the one non-ASCII code point that always translates.
pub const NO_BREAK_SPACE: u32 = 0x00A0;

/// Typesetting context a representation is valid in.
///
/// The derived ordering (`Math < Text`) matches the lexical order of the
/// stored names, which the preference ranking relies on.
///
/// # Examples
///
/// ```
/// use texmap_core::Mode;
///
/// assert_eq!(Mode::parse("math"), Some(Mode::Math));
/// assert_eq!(Mode::Text.as_str(), "text");
/// assert!(Mode::Math < Mode::Text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Math mode (`$...$`).
    Math,
    /// Running text (the default).
    #[default]
    Text,
}

impl Mode {
    /// Returns the stored name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Math => "math",
            Mode::Text => "text",
        }
    }

    /// Parses a stored mode name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "math" => Some(Mode::Math),
            "text" => Some(Mode::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether and how a code point is translated into markup.
///
/// # Examples
///
/// ```
/// use texmap_core::Category;
///
/// assert_eq!(Category::default(), Category::Direct);
/// assert_eq!(Category::parse("ascii_fallback"), Some(Category::AsciiFallback));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Identity; the character is emitted as-is and no translation is recorded.
    #[default]
    Direct,
    /// Full round-trip translation.
    Translate,
    /// Degraded translation, only used when the output must be pure ASCII.
    AsciiFallback,
}

impl Category {
    /// Returns the stored name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Direct => "direct",
            Category::Translate => "translate",
            Category::AsciiFallback => "ascii_fallback",
        }
    }

    /// Parses a stored category name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(Category::Direct),
            "translate" => Some(Category::Translate),
            "ascii_fallback" => Some(Category::AsciiFallback),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(charcode, representation)` association.
///
/// Rows are unique by `(charcode, representation)`. `preference` and
/// `category` are meaningful only after the classifiers have run; freshly
/// created rows carry the defaults.
///
/// # Examples
///
/// ```
/// use texmap_core::{MappingRow, Mode};
///
/// let row = MappingRow::new(0x00E9, "\\'e", Mode::Text).with_description("LATIN SMALL LETTER E WITH ACUTE");
/// assert_eq!(row.character(), Some('é'));
/// assert_eq!(row.preference, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    /// Unicode scalar value.
    pub charcode: u32,
    /// Command-string spelling.
    pub representation: String,
    /// Context the spelling is valid in.
    pub mode: Mode,
    /// Translation category.
    pub category: Category,
    /// Rank among rows of the same charcode; 0 is most preferred.
    pub preference: u32,
    /// Free-text annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MappingRow {
    /// Creates a row with default category and preference.
    pub fn new(charcode: u32, representation: impl Into<String>, mode: Mode) -> Self {
        Self {
            charcode,
            representation: representation.into(),
            mode,
            category: Category::default(),
            preference: 0,
            description: None,
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a copy of this row under a different representation.
    ///
    /// Charcode, mode and description carry over; category and preference
    /// are reset.
    pub fn derive(&self, representation: impl Into<String>) -> Self {
        Self {
            charcode: self.charcode,
            representation: representation.into(),
            mode: self.mode,
            category: Category::default(),
            preference: 0,
            description: self.description.clone(),
        }
    }

    /// Returns the character for this row's charcode, if it is a valid scalar value.
    pub fn character(&self) -> Option<char> {
        char::from_u32(self.charcode)
    }

    /// Returns the `(charcode, representation)` uniqueness key.
    pub fn key(&self) -> (u32, &str) {
        (self.charcode, self.representation.as_str())
    }
}

/// A raw association as produced by a source reader, before ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMapping {
    /// Unicode scalar value.
    pub charcode: u32,
    /// Spelling as found in the source.
    pub representation: String,
    /// Context the spelling is valid in.
    pub mode: Mode,
    /// Optional annotation from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawMapping {
    /// Creates a raw association without description.
    pub fn new(charcode: u32, representation: impl Into<String>, mode: Mode) -> Self {
        Self {
            charcode,
            representation: representation.into(),
            mode,
            description: None,
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Returns `true` if `charcode` is printable ASCII (`0x20..=0x7E`).
pub fn is_printable_ascii(charcode: u32) -> bool {
    (0x20..=0x7E).contains(&charcode)
}

/// Validates that `charcode` is a Unicode scalar value.
///
/// # Errors
///
/// Returns [`MappingError::InvalidCodepoint`] for values above
/// [`MAX_CHARCODE`] and for surrogates.
pub fn validate_charcode(charcode: u32) -> Result<()> {
    if char::from_u32(charcode).is_none() {
        return Err(MappingError::InvalidCodepoint(charcode));
    }
    Ok(())
}

/// Returns `true` if `representation` spells exactly the character `charcode`.
pub(crate) fn is_identity(charcode: u32, representation: &str) -> bool {
    let mut chars = representation.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => ch as u32 == charcode,
        _ => false,
    }
}
