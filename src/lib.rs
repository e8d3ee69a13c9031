//! Script language support for Vue single-file components.
//!
//! A `.vue` document is split into regions, the script region is served to a
//! compiler service as a module of its own (same byte offsets as the original
//! document), and untyped component options are wrapped so the service can
//! infer `this` inside them.

pub mod document;
pub mod error;
pub mod host;
pub mod paths;
pub mod script;
pub mod service;
pub mod settings;

pub use document::{
    parse_regions, CompositeDocument, DerivedCache, DocumentRegions, DocumentStore, LineIndex,
    MaskedDocument, Region, RegionKind, Selector,
};
pub use error::{HostError, HostResult};
pub use host::{LanguageServiceHost, ScriptSnapshot, VirtualProjectHost};
pub use script::{rewrite_default_export, BridgeSchema, ScriptKind, ScriptTree};
pub use service::{LanguageService, ScriptMode};
pub use settings::{discover_settings, load_settings, Settings};
