//! Unicode to LaTeX mapping table construction.
//!
//! This crate turns raw character associations into a normalized, ranked
//! and categorized mapping table:
//!
//! - [`MappingRow`]: one `(charcode, representation)` spelling with its
//!   [`Mode`], [`Category`] and preference.
//! - [`MappingStore`]: the storage seam every stage operates on;
//!   [`MemoryStore`] is the in-process implementation.
//! - [`ingest`]: filtering and accent normalization of raw associations.
//! - [`expand`]: rule-driven derivation of equivalent spellings.
//! - [`overrides`]: hand-maintained deletions, insertions and
//!   substitutions.
//! - [`preference`] and [`category`]: ranking and translation categories.
//! - [`patterns`] and [`grammar`]: shape classification and recognizer
//!   generation.
//! - [`export`]: the read-only views consumers load.
//!
//! [`pipeline::build`] runs the stages in order.
//!
//! # Example
//!
//! ```
//! use texmap_core::*;
//!
//! let records = vec![
//!     RawMapping::new('$' as u32, "\\textdollar", Mode::Text),
//!     RawMapping::new(0x201C, "\\textquotedblleft", Mode::Text),
//!     RawMapping::new(0x201D, "\\textquotedblright", Mode::Text),
//!     RawMapping::new(0x3B1, "\\alpha", Mode::Math),
//! ];
//!
//! let mut store = MemoryStore::new();
//! pipeline::build(&mut store, &records, &DEFAULT_OVERRIDES, PatternCatalog::builtin()).unwrap();
//!
//! let table = export::to_latex(&store.rows().unwrap(), export::Encoding::Ascii);
//! assert_eq!(table.math[&0x3B1].representation, "\\alpha{}");
//! assert_eq!(table.text[&('$' as u32)].representation, "\\$");
//! ```

mod error;
mod store;
mod types;

pub mod category;
pub mod expand;
pub mod export;
pub mod grammar;
pub mod ingest;
pub mod overrides;
pub mod patterns;
pub mod pipeline;
pub mod preference;

pub use error::{MappingError, Result};
pub use overrides::{DEFAULT_OVERRIDES, OverrideCatalog, PreferredSet};
pub use patterns::{PatternCatalog, SHAPE_CATALOG, ShapeDescriptor};
pub use store::{MappingStore, MemoryStore};
pub use types::*;
