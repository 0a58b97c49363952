//! Ingestion of raw associations (`addchar`).
//!
//! Applies the minimal identity filtering and accent-bracket normalization
//! before a raw association becomes a [`MappingRow`]. Ingestion is
//! last-writer-wins per charcode: every existing row of the charcode is
//! removed before the new one is inserted.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::store::MappingStore;
use crate::types::{MappingRow, RawMapping, is_identity, is_printable_ascii, validate_charcode};

/// Printable ASCII characters that are ingested despite being plain ASCII,
/// because they carry meaning in the markup language.
pub const MARKUP_SIGNIFICANT: &[char] = &[
    '#', '$', '%', '&', '~', '_', '^', '{', '}', '>', '<', '\\',
];

/// Why a raw association was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The representation was empty or whitespace.
    EmptyRepresentation,
    /// Printable ASCII without markup significance.
    PlainAscii,
    /// A text-mode spelling identical to the character itself.
    Identity,
}

/// Result of ingesting one raw association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The row was stored, after removing `replaced` earlier rows of the charcode.
    Inserted {
        /// Number of rows removed for the charcode.
        replaced: usize,
    },
    /// The association was filtered out.
    Skipped(SkipReason),
}

/// Counts gathered while ingesting a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Rows stored.
    pub inserted: usize,
    /// Rows removed because a later association reused their charcode.
    pub replaced: usize,
    /// Associations skipped for an empty representation.
    pub skipped_empty: usize,
    /// Associations skipped as plain ASCII.
    pub skipped_ascii: usize,
    /// Associations skipped as identity spellings.
    pub skipped_identity: usize,
}

impl IngestReport {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Inserted { replaced } => {
                self.inserted += 1;
                self.replaced += replaced;
            }
            IngestOutcome::Skipped(SkipReason::EmptyRepresentation) => self.skipped_empty += 1,
            IngestOutcome::Skipped(SkipReason::PlainAscii) => self.skipped_ascii += 1,
            IngestOutcome::Skipped(SkipReason::Identity) => self.skipped_identity += 1,
        }
    }
}

/// Decides whether a raw association is filtered out before storage.
pub fn skip_reason(raw: &RawMapping) -> Option<SkipReason> {
    if raw.representation.trim_ascii().is_empty() {
        return Some(SkipReason::EmptyRepresentation);
    }
    if is_printable_ascii(raw.charcode) {
        let significant = char::from_u32(raw.charcode).is_some_and(|ch| MARKUP_SIGNIFICANT.contains(&ch));
        if !significant {
            return Some(SkipReason::PlainAscii);
        }
        if raw.mode == crate::types::Mode::Text && is_identity(raw.charcode, &raw.representation) {
            return Some(SkipReason::Identity);
        }
    }
    None
}

/// Moves accent arguments inside an outer brace pair.
///
/// `\"{a}` becomes `{\"a}`; the letter accents `\c`, `\u`, `\H` and `\v`
/// keep a separating space, so `\c{c}` becomes `{\c c}`.
///
/// # Examples
///
/// ```
/// use texmap_core::ingest::normalize_accent;
///
/// assert_eq!(normalize_accent("\\\"{a}"), "{\\\"a}");
/// assert_eq!(normalize_accent("\\c{c}"), "{\\c c}");
/// assert_eq!(normalize_accent("\\alpha"), "\\alpha");
/// ```
pub fn normalize_accent(representation: &str) -> Cow<'_, str> {
    // SAFETY: These regexes are compile-time constants and are validated by tests.
    static SYMBOL_ACCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"^\\(["^`.'~])\{([^}]+)\}$"#).expect("static regex must compile")
    });
    static LETTER_ACCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\\([cuHv])\{([^}]+)\}$").expect("static regex must compile")
    });

    if let Some(caps) = SYMBOL_ACCENT_RE.captures(representation) {
        return Cow::Owned(format!("{{\\{}{}}}", &caps[1], &caps[2]));
    }
    if let Some(caps) = LETTER_ACCENT_RE.captures(representation) {
        return Cow::Owned(format!("{{\\{} {}}}", &caps[1], &caps[2]));
    }
    Cow::Borrowed(representation)
}

/// Ingests one raw association (`addchar`).
///
/// # Errors
///
/// Returns [`MappingError::InvalidCodepoint`](crate::MappingError::InvalidCodepoint)
/// for charcodes that are not Unicode scalar values, and propagates store
/// failures.
pub fn add_char<S: MappingStore>(store: &mut S, raw: &RawMapping) -> Result<IngestOutcome, S::Error> {
    validate_charcode(raw.charcode)?;
    if let Some(reason) = skip_reason(raw) {
        return Ok(IngestOutcome::Skipped(reason));
    }

    let representation = normalize_accent(&raw.representation).into_owned();
    let replaced = store.delete_charcode(raw.charcode)?;
    if replaced > 0 {
        debug!(charcode = raw.charcode, replaced, "Replacing earlier mapping");
    }

    let mut row = MappingRow::new(raw.charcode, representation, raw.mode);
    row.description = raw
        .description
        .as_deref()
        .map(str::trim)
        .filter(|desc| !desc.is_empty())
        .map(String::from);
    store.insert_or_ignore(&row)?;
    Ok(IngestOutcome::Inserted { replaced })
}

/// Ingests a batch of raw associations in order.
pub fn ingest_all<'a, S, I>(store: &mut S, records: I) -> Result<IngestReport, S::Error>
where
    S: MappingStore,
    I: IntoIterator<Item = &'a RawMapping>,
{
    let mut report = IngestReport::default();
    for raw in records {
        let outcome = add_char(store, raw)?;
        report.record(&outcome);
    }
    Ok(report)
}
