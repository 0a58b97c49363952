//! Full build pipeline.
//!
//! Runs the stages in their fixed order against one store:
//!
//! 1. ingestion of raw associations ([`ingest`](crate::ingest)),
//! 2. variant expansion ([`expand`](crate::expand)),
//! 3. overrides ([`overrides`](crate::overrides)),
//! 4. preference ranking ([`preference`](crate::preference)),
//! 5. category assignment ([`category`](crate::category)),
//! 6. shape classification ([`patterns`](crate::patterns)).
//!
//! The first fatal error aborts the build. Callers that need atomicity run
//! the pipeline inside a transaction.

use serde::Serialize;
use tracing::info;

use crate::category::classify_categories;
use crate::expand::{ExpansionReport, expand};
use crate::ingest::{IngestReport, ingest_all};
use crate::overrides::{OverrideCatalog, OverrideReport, PreferredSet, apply_overrides};
use crate::patterns::{ClassificationReport, PatternCatalog};
use crate::preference::rank;
use crate::store::MappingStore;
use crate::types::RawMapping;

/// Counts gathered by [`build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Outcome of loading the raw associations.
    pub ingest: IngestReport,
    /// Variants inserted and padded rows collapsed.
    pub expansion: ExpansionReport,
    /// Corrections applied.
    pub overrides: OverrideReport,
    /// Spellings ranked ahead of every other tier.
    pub preferred: PreferredSet,
    /// Rows given a preference.
    pub ranked: usize,
    /// Rows given a category.
    pub categorized: usize,
    /// Shape counts over the final table.
    pub classification: ClassificationReport,
}

/// Builds the mapping table from raw associations.
///
/// # Errors
///
/// Store failures and fatal pipeline errors propagate as `S::Error`.
pub fn build<'a, S, I>(
    store: &mut S,
    records: I,
    overrides: &OverrideCatalog,
    catalog: &PatternCatalog,
) -> Result<PipelineReport, S::Error>
where
    S: MappingStore,
    I: IntoIterator<Item = &'a RawMapping>,
{
    let ingest = ingest_all(store, records)?;
    info!(
        inserted = ingest.inserted,
        replaced = ingest.replaced,
        skipped = ingest.skipped_empty + ingest.skipped_ascii + ingest.skipped_identity,
        "Ingested raw mappings"
    );

    let expansion = expand(store)?;
    let (preferred, overrides) = apply_overrides(store, overrides)?;
    let ranked = rank(store, &preferred)?;
    let categorized = classify_categories(store)?;
    let classification = catalog.classify_rows(&store.rows()?)?;

    Ok(PipelineReport {
        ingest,
        expansion,
        overrides,
        preferred,
        ranked,
        categorized,
        classification,
    })
}
