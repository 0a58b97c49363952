//! Variant expansion.
//!
//! A LaTeX command can be spelled several equivalent ways: `\'e`, `\'{e}`,
//! `{\'e}`, `\'e{}` all typeset the same glyph. The expander derives these
//! alternates from every stored row and inserts the ones that are missing,
//! never overwriting an existing row.
//!
//! Derivation happens in two steps. A suffix pre-step terminates commands
//! ending in a letter or digit with an empty group (`\alpha` → `\alpha{}`),
//! then the first matching rule of [`VARIANT_RULES`] contributes its
//! spellings. After each round, padded spellings (`\ss `) collapse into
//! their trimmed form. Rounds repeat until the key set is stable, so
//! expanding an expanded store adds nothing.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{info, warn};

use crate::store::MappingStore;

/// Upper bound on expansion rounds; the rules reach a fixpoint well before.
const MAX_EXPANSION_ROUNDS: usize = 16;

/// One guarded derivation: when `pattern` matches, `derive` yields spellings.
pub struct VariantRule {
    /// Short identifier used in logs and tests.
    pub name: &'static str,
    /// Regex the representation must match.
    pub pattern: &'static str,
    derive: fn(&Captures<'_>) -> Vec<String>,
}

impl std::fmt::Debug for VariantRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish()
    }
}

fn braced_and_spaced(caps: &Captures<'_>) -> Vec<String> {
    vec![format!("{{{}}}", &caps[1]), format!("{} ", &caps[1])]
}

/// Ordered derivation rules; the first match wins.
pub static VARIANT_RULES: &[VariantRule] = &[
    // '\ss ' => '{\ss}'
    VariantRule {
        name: "command-space",
        pattern: r"(?i)^(\\[a-z]\S*)\s$",
        derive: braced_and_spaced,
    },
    // '\&{}' => '{\&}', '\& '
    VariantRule {
        name: "symbol-terminated",
        pattern: r"(?i)^(\\[^a-z])(\{\}|\s)$",
        derive: braced_and_spaced,
    },
    // '\"{a}' => '\"a ', '{\"a}'
    VariantRule {
        name: "accent-braced-argument",
        pattern: r"^\\([^a-z])\{(.)\}$",
        derive: |caps| {
            vec![
                format!("\\{}{} ", &caps[1], &caps[2]),
                format!("{{\\{}{}}}", &caps[1], &caps[2]),
            ]
        },
    },
    // '\"a', '\"a{}' => '\"{a}', '{\"a}', '\"a{}'
    VariantRule {
        name: "accent-bare-argument",
        pattern: r"^\\([^a-z])(.)(\{\}|\s)*$",
        derive: |caps| {
            vec![
                format!("\\{}{{{}}}", &caps[1], &caps[2]),
                format!("{{\\{}{}}}", &caps[1], &caps[2]),
                format!("\\{}{}{{}}", &caps[1], &caps[2]),
            ]
        },
    },
    // '{\"a}' => '\"a ', '\"{a}'
    VariantRule {
        name: "accent-wrapped",
        pattern: r"^\{\\([^a-z])(.)\}$",
        derive: |caps| {
            vec![
                format!("\\{}{} ", &caps[1], &caps[2]),
                format!("\\{}{{{}}}", &caps[1], &caps[2]),
            ]
        },
    },
    // '{^2}' => '^2'
    VariantRule {
        name: "superscript-wrapped",
        pattern: r"^\{(\^[0-9])\}$",
        derive: |caps| vec![caps[1].to_string()],
    },
    // '{\ldots}' => '\ldots ', '\ldots{}'
    VariantRule {
        name: "command-wrapped",
        pattern: r"^\{(\\.+)\}$",
        derive: |caps| vec![format!("{} ", &caps[1]), format!("{}{{}}", &caps[1])],
    },
    // '\ldots{}' => '{\ldots}', '\ldots '
    VariantRule {
        name: "command-terminated",
        pattern: r"^(\\.*)(\{\}| )$",
        derive: braced_and_spaced,
    },
];

static COMPILED_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    VARIANT_RULES
        .iter()
        .map(|rule| Regex::new(rule.pattern).expect("variant rule regex must compile"))
        .collect()
});

/// Applies the suffix pre-step.
///
/// Returns the terminated spelling and, when it ends in an empty group, the
/// unterminated one.
///
/// # Examples
///
/// ```
/// use texmap_core::expand::terminate;
///
/// assert_eq!(terminate("\\alpha"), ("\\alpha{}".to_string(), Some("\\alpha".to_string())));
/// assert_eq!(terminate("\\ss "), ("\\ss{}".to_string(), Some("\\ss".to_string())));
/// assert_eq!(terminate("\\'{e}"), ("\\'{e}".to_string(), None));
/// ```
pub fn terminate(representation: &str) -> (String, Option<String>) {
    let mut terminated = representation.to_string();
    if terminated.ends_with(|ch: char| ch.is_ascii_alphanumeric()) {
        terminated.push_str("{}");
    } else if let Some(stripped) = terminated.strip_suffix(' ') {
        terminated = format!("{stripped}{{}}");
    }
    let bare = terminated.strip_suffix("{}").map(String::from);
    (terminated, bare)
}

/// Returns the index of the first rule in [`VARIANT_RULES`] matching
/// `representation`, without the suffix pre-step.
pub fn matching_rule(representation: &str) -> Option<usize> {
    COMPILED_RULES
        .iter()
        .position(|re| re.is_match(representation))
}

/// Derives every spelling the expander stores for `representation`.
///
/// The result starts with the output of the suffix pre-step and is
/// followed by the spellings of the first matching rule. It may contain
/// the input itself and duplicates; insertion ignores those.
pub fn derive_variants(representation: &str) -> Vec<String> {
    let (terminated, bare) = terminate(representation);
    let mut variants = vec![terminated.clone()];
    variants.extend(bare);

    if let Some(index) = matching_rule(&terminated) {
        if let Some(caps) = COMPILED_RULES[index].captures(&terminated) {
            variants.extend((VARIANT_RULES[index].derive)(&caps));
        }
    }
    variants
}

/// Counts gathered by [`expand`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionReport {
    /// Rounds executed, including the final one that changed nothing.
    pub rounds: usize,
    /// Rows inserted across all rounds (before collapsing).
    pub inserted: usize,
    /// Padded rows deleted because their trimmed form existed.
    pub collapsed: usize,
    /// Padded rows trimmed in place.
    pub trimmed: usize,
}

/// Collapses padded spellings into their trimmed form.
///
/// A row whose representation carries surrounding whitespace is deleted
/// when the trimmed spelling already exists for its charcode; otherwise it
/// is trimmed in place. Returns `(deleted, trimmed)`.
pub fn collapse_padded<S: MappingStore>(store: &mut S) -> Result<(usize, usize), S::Error> {
    let rows = store.rows()?;
    let mut keys: BTreeSet<(u32, String)> = rows
        .iter()
        .map(|row| (row.charcode, row.representation.clone()))
        .collect();

    let mut deleted = 0;
    let mut trimmed = 0;
    for row in &rows {
        let clean = row.representation.trim_ascii();
        if clean == row.representation {
            continue;
        }
        if clean.is_empty() || keys.contains(&(row.charcode, clean.to_string())) {
            store.delete(row.charcode, &row.representation)?;
            deleted += 1;
        } else if store.rename(row.charcode, &row.representation, clean)? {
            keys.insert((row.charcode, clean.to_string()));
            trimmed += 1;
        }
    }
    Ok((deleted, trimmed))
}

fn key_set<S: MappingStore>(store: &S) -> Result<BTreeSet<(u32, String)>, S::Error> {
    Ok(store
        .rows()?
        .into_iter()
        .map(|row| (row.charcode, row.representation))
        .collect())
}

/// Expands every row of the store until no new spelling appears.
///
/// Never fails on data: rules that do not match are skipped. Only store
/// errors propagate.
pub fn expand<S: MappingStore>(store: &mut S) -> Result<ExpansionReport, S::Error> {
    let mut report = ExpansionReport::default();
    let mut before = key_set(store)?;

    loop {
        report.rounds += 1;
        for row in store.rows()? {
            for variant in derive_variants(&row.representation) {
                if store.insert_or_ignore(&row.derive(variant))? {
                    report.inserted += 1;
                }
            }
        }
        let (collapsed, trimmed) = collapse_padded(store)?;
        report.collapsed += collapsed;
        report.trimmed += trimmed;

        let after = key_set(store)?;
        if after == before {
            break;
        }
        if report.rounds >= MAX_EXPANSION_ROUNDS {
            warn!(rounds = report.rounds, "Variant expansion did not settle");
            break;
        }
        before = after;
    }

    info!(
        rounds = report.rounds,
        inserted = report.inserted,
        collapsed = report.collapsed,
        trimmed = report.trimmed,
        "Expanded variants"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{MappingRow, Mode};

    fn rule_name(representation: &str) -> Option<&'static str> {
        matching_rule(representation).map(|index| VARIANT_RULES[index].name)
    }

    fn store_with(rows: &[(u32, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (charcode, representation) in rows {
            store
                .insert_or_ignore(&MappingRow::new(*charcode, *representation, Mode::Text))
                .unwrap();
        }
        store
    }

    fn representations(store: &MemoryStore, charcode: u32) -> BTreeSet<String> {
        store
            .rows()
            .unwrap()
            .into_iter()
            .filter(|row| row.charcode == charcode)
            .map(|row| row.representation)
            .collect()
    }

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(COMPILED_RULES.len(), VARIANT_RULES.len());
    }

    #[test]
    fn test_rule_precedence() {
        assert_eq!(rule_name("\\ss\t"), Some("command-space"));
        assert_eq!(rule_name("\\&{}"), Some("symbol-terminated"));
        assert_eq!(rule_name("\\\"{a}"), Some("accent-braced-argument"));
        assert_eq!(rule_name("\\\"a{}"), Some("accent-bare-argument"));
        assert_eq!(rule_name("\\'e"), Some("accent-bare-argument"));
        assert_eq!(rule_name("{\\\"a}"), Some("accent-wrapped"));
        assert_eq!(rule_name("{^2}"), Some("superscript-wrapped"));
        assert_eq!(rule_name("{\\ldots}"), Some("command-wrapped"));
        assert_eq!(rule_name("\\ldots{}"), Some("command-terminated"));
        assert_eq!(rule_name("\\alpha"), None);
        assert_eq!(rule_name("''"), None);
    }

    #[test]
    fn test_letter_accent_is_not_symbol_accent() {
        // The accent rules require a non-lowercase character after the backslash.
        assert_eq!(rule_name("\\c{c}"), None);
        assert_eq!(rule_name("\\H{o}"), Some("accent-braced-argument"));
    }

    #[test]
    fn test_derive_variants_for_command() {
        let variants = derive_variants("\\ldots");
        assert!(variants.contains(&"\\ldots{}".to_string()));
        assert!(variants.contains(&"\\ldots".to_string()));
        assert!(variants.contains(&"{\\ldots}".to_string()));
        assert!(variants.contains(&"\\ldots ".to_string()));
    }

    #[test]
    fn test_derive_variants_for_superscript() {
        assert_eq!(derive_variants("{^2}"), vec!["{^2}".to_string(), "^2".to_string()]);
    }

    #[test]
    fn test_expand_accent_closure() {
        let mut store = store_with(&[(0x00E9, "\\'e")]);
        expand(&mut store).unwrap();
        let reps = representations(&store, 0x00E9);
        for expected in ["\\'e", "\\'{e}", "{\\'e}", "\\'e{}"] {
            assert!(reps.contains(expected), "missing {expected}: {reps:?}");
        }
        assert!(reps.iter().all(|rep| rep.trim_ascii() == rep));
    }

    #[test]
    fn test_expand_wrapped_accent() {
        let mut store = store_with(&[(0x00E4, "{\\\"a}")]);
        expand(&mut store).unwrap();
        let reps = representations(&store, 0x00E4);
        assert!(reps.contains("\\\"a"));
        assert!(reps.contains("\\\"{a}"));
        assert!(reps.contains("{\\\"a}"));
    }

    #[test]
    fn test_expand_is_idempotent() {
        let mut store = store_with(&[
            (0x00E9, "\\'e"),
            (0x2026, "\\ldots"),
            (0x00B2, "{^2}"),
            (0x00DF, "\\ss "),
            (0x0026, "\\&"),
            (0x0107, "{\\'{c}}"),
        ]);
        expand(&mut store).unwrap();
        let first = store.rows().unwrap();

        let report = expand(&mut store).unwrap();
        assert_eq!(store.rows().unwrap(), first);
        assert_eq!(report.rounds, 1);
    }

    #[test]
    fn test_expand_keeps_mode_and_description() {
        let mut store = MemoryStore::new();
        store
            .insert_or_ignore(
                &MappingRow::new(0x2026, "\\ldots", Mode::Math).with_description("HORIZONTAL ELLIPSIS"),
            )
            .unwrap();
        expand(&mut store).unwrap();
        let row = store.get(0x2026, "{\\ldots}").unwrap();
        assert_eq!(row.mode, Mode::Math);
        assert_eq!(row.description.as_deref(), Some("HORIZONTAL ELLIPSIS"));
    }

    #[test]
    fn test_expand_does_not_overwrite_existing_rows() {
        let mut store = MemoryStore::new();
        store
            .insert_or_ignore(&MappingRow::new(0x2026, "\\ldots", Mode::Text))
            .unwrap();
        store
            .insert_or_ignore(&MappingRow::new(0x2026, "{\\ldots}", Mode::Math))
            .unwrap();
        expand(&mut store).unwrap();
        assert_eq!(store.get(0x2026, "{\\ldots}").unwrap().mode, Mode::Math);
    }

    #[test]
    fn test_collapse_padded_prefers_trimmed() {
        let mut store = store_with(&[(1, "\\x "), (1, "\\x"), (2, "\\y ")]);
        let (deleted, trimmed) = collapse_padded(&mut store).unwrap();
        assert_eq!((deleted, trimmed), (1, 1));
        assert_eq!(representations(&store, 1), BTreeSet::from(["\\x".to_string()]));
        assert_eq!(representations(&store, 2), BTreeSet::from(["\\y".to_string()]));
    }

    #[test]
    fn test_collapse_padded_keeps_unicode_spaces() {
        let mut store = store_with(&[(0x2009, "\\,\u{a0}"), (0x2009, "\\; ")]);
        let (deleted, trimmed) = collapse_padded(&mut store).unwrap();
        assert_eq!((deleted, trimmed), (0, 1));
        assert_eq!(
            representations(&store, 0x2009),
            BTreeSet::from(["\\,\u{a0}".to_string(), "\\;".to_string()])
        );
    }

    #[test]
    fn test_collapse_padded_is_per_charcode() {
        let mut store = store_with(&[(1, "\\x "), (2, "\\x")]);
        collapse_padded(&mut store).unwrap();
        assert!(store.get(1, "\\x").is_some());
        assert!(store.get(2, "\\x").is_some());
    }
}
