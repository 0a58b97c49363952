//! Translation categories.
//!
//! Decides for each row whether exporting a character should produce
//! markup at all (`Direct` means the character passes through unchanged),
//! and whether the markup is needed even for Unicode-capable output
//! (`Translate`) or only when the output is restricted to ASCII
//! (`AsciiFallback`).

use tracing::info;

use crate::store::MappingStore;
use crate::types::{Category, MappingRow, Mode, NO_BREAK_SPACE, is_identity, is_printable_ascii};

/// One guarded category assignment.
pub struct CategoryRule {
    /// Category assigned when the guard matches.
    pub category: Category,
    matches: fn(&MappingRow) -> bool,
}

impl std::fmt::Debug for CategoryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryRule").field("category", &self.category).finish()
    }
}

/// Ordered category rules; the first match wins.
pub static CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Direct,
        matches: |row| {
            row.mode == Mode::Text
                && (row.charcode == 0x20
                    || (is_printable_ascii(row.charcode) && is_identity(row.charcode, &row.representation)))
        },
    },
    CategoryRule {
        category: Category::Translate,
        matches: |row| row.charcode == NO_BREAK_SPACE || is_printable_ascii(row.charcode),
    },
    CategoryRule {
        category: Category::AsciiFallback,
        matches: |_| true,
    },
];

/// Returns the category of a row.
///
/// # Examples
///
/// ```
/// use texmap_core::{Category, MappingRow, Mode, category::categorize};
///
/// assert_eq!(categorize(&MappingRow::new(0x41, "A", Mode::Text)), Category::Direct);
/// assert_eq!(categorize(&MappingRow::new(0x26, "\\&", Mode::Text)), Category::Translate);
/// assert_eq!(categorize(&MappingRow::new(0xE9, "\\'e", Mode::Text)), Category::AsciiFallback);
/// ```
pub fn categorize(row: &MappingRow) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|rule| (rule.matches)(row))
        .map_or(Category::AsciiFallback, |rule| rule.category)
}

/// Assigns the category of every row in the store.
pub fn classify_categories<S: MappingStore>(store: &mut S) -> Result<usize, S::Error> {
    let rows = store.rows()?;
    let mut changed = 0;
    for row in &rows {
        let category = categorize(row);
        if category != row.category {
            store.set_category(row.charcode, &row.representation, category)?;
            changed += 1;
        }
    }
    info!(rows = rows.len(), changed, "Assigned categories");
    Ok(rows.len())
}
