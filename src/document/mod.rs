//! Composite document model.
//!
//! This module provides:
//! - `parse_regions` splitting a `.vue` document into typed regions
//! - `DocumentRegions` answering region queries and building masked projections
//! - `DerivedCache` memoizing per-version derived values
//! - `LineIndex` for byte offset <-> editor position conversion
//! - `CompositeDocument` and `DocumentStore` for open documents

mod cache;
mod parser;
mod region;
mod regions;
mod state;
mod text;

pub use cache::{DerivedCache, Fingerprint, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use parser::{parse_regions, ParsedRegions};
pub use region::{language_id_for, Region, RegionKind, DOCUMENT_LANGUAGE_ID};
pub use regions::{
    region_cache, script_view, DocumentRegions, LanguageRange, MaskedDocument, RegionCache,
    ScriptView, Selector,
};
pub use state::{CompositeDocument, DocumentStore};
pub use text::LineIndex;
