//! Preference ranking.
//!
//! Orders the spellings of each code point so the canonical one can be
//! picked when only one is wanted. Every representation falls into the
//! first matching tier of [`TIER_RULES`]; text mode beats math mode within
//! a tier. Ties are broken by mode name, length, the representation itself
//! and finally the charcode, which makes the ranking a total order.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::overrides::PreferredSet;
use crate::store::MappingStore;
use crate::types::{MappingRow, Mode};

/// One preference tier.
pub struct TierRule {
    /// Short identifier used in logs and tests.
    pub name: &'static str,
    matches: fn(&str, &PreferredSet) -> bool,
}

impl std::fmt::Debug for TierRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierRule").field("name", &self.name).finish()
    }
}

// SAFETY: These regexes are compile-time constants and are validated by tests.
static SINGLE_SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\[^a-zA-Z0-9]$").expect("static regex must compile"));
static SUPERSCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\\^[1-3]$").expect("static regex must compile"));
static TERMINATED_COMMANDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\\[0-9a-zA-Z]+)+\{\}$").expect("static regex must compile"));
static WRAPPED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{.+\}$").expect("static regex must compile"));

fn is_simple(representation: &str) -> bool {
    !representation.contains('\\')
        || representation == "\\$"
        || SINGLE_SYMBOL_RE.is_match(representation)
        || SUPERSCRIPT_RE.is_match(representation)
}

/// Ordered tiers; the first match wins and lower is better.
pub static TIER_RULES: &[TierRule] = &[
    TierRule {
        name: "preferred",
        matches: |representation, preferred| preferred.contains(representation),
    },
    TierRule {
        name: "simple",
        matches: |representation, _| is_simple(representation),
    },
    TierRule {
        name: "terminated-commands",
        matches: |representation, _| TERMINATED_COMMANDS_RE.is_match(representation),
    },
    TierRule {
        name: "wrapped",
        matches: |representation, _| WRAPPED_RE.is_match(representation),
    },
    TierRule {
        name: "braced",
        matches: |representation, _| representation.contains('}'),
    },
    TierRule {
        name: "fallback",
        matches: |_, _| true,
    },
];

/// Returns the index of the tier `representation` falls into.
///
/// # Examples
///
/// ```
/// use texmap_core::{PreferredSet, preference::tier};
///
/// let preferred = PreferredSet::new();
/// assert_eq!(tier("\\&", &preferred), 1);
/// assert_eq!(tier("\\alpha{}", &preferred), 2);
/// assert_eq!(tier("{\\'e}", &preferred), 3);
/// assert_eq!(tier("\\alpha", &preferred), 5);
/// ```
pub fn tier(representation: &str, preferred: &PreferredSet) -> usize {
    TIER_RULES
        .iter()
        .position(|rule| (rule.matches)(representation, preferred))
        .unwrap_or(TIER_RULES.len() - 1)
}

/// Computes the primary sort key: `tier * 2`, plus one for math mode.
pub fn sort_key(representation: &str, mode: Mode, preferred: &PreferredSet) -> usize {
    let bias = match mode {
        Mode::Text => 0,
        Mode::Math => 1,
    };
    tier(representation, preferred) * 2 + bias
}

/// A row's position within its charcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    /// Character of the ranked row.
    pub charcode: u32,
    /// Spelling of the ranked row.
    pub representation: String,
    /// 0-based rank within the charcode; 0 is preferred.
    pub preference: u32,
}

/// Ranks `rows` from scratch.
///
/// Returns the rows in global ranking order, each with a 0-based
/// preference that is dense per charcode.
pub fn rank_rows(rows: &[MappingRow], preferred: &PreferredSet) -> Vec<Ranked> {
    let mut keyed: Vec<(usize, &MappingRow, usize)> = rows
        .iter()
        .map(|row| {
            (
                sort_key(&row.representation, row.mode, preferred),
                row,
                row.representation.chars().count(),
            )
        })
        .collect();

    keyed.sort_by(|(key_a, a, len_a), (key_b, b, len_b)| {
        key_a
            .cmp(key_b)
            .then(a.mode.cmp(&b.mode))
            .then(len_a.cmp(len_b))
            .then_with(|| a.representation.cmp(&b.representation))
            .then(a.charcode.cmp(&b.charcode))
    });

    let mut next: HashMap<u32, u32> = HashMap::new();
    keyed
        .into_iter()
        .map(|(_, row, _)| {
            let slot = next.entry(row.charcode).or_insert(0);
            let preference = *slot;
            *slot += 1;
            Ranked {
                charcode: row.charcode,
                representation: row.representation.clone(),
                preference,
            }
        })
        .collect()
}

/// Ranks every row of the store and persists the preferences.
pub fn rank<S: MappingStore>(store: &mut S, preferred: &PreferredSet) -> Result<usize, S::Error> {
    let rows = store.rows()?;
    let ranked = rank_rows(&rows, preferred);
    for entry in &ranked {
        store.set_preference(entry.charcode, &entry.representation, entry.preference)?;
    }
    info!(rows = ranked.len(), preferred = preferred.len(), "Ranked representations");
    Ok(ranked.len())
}
