//! Region queries and masked projections for one document version.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tower_lsp::lsp_types::{Position, Url};

use super::cache::DerivedCache;
use super::parser::{parse_regions, ParsedRegions};
use super::region::{Region, RegionKind, DOCUMENT_LANGUAGE_ID};
use super::state::CompositeDocument;
use super::text::LineIndex;

/// Which regions a projection keeps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Every block whose language id matches.
    Language(String),
    /// Every block of a kind, whatever its declared language.
    Kind(RegionKind),
}

impl Selector {
    fn selects(&self, region: &Region) -> bool {
        match self {
            Selector::Language(id) => region.language_id == *id,
            Selector::Kind(kind) => region.kind == *kind,
        }
    }
}

/// Same-length view of a document where everything outside the selected
/// regions is blanked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedDocument {
    pub uri: Url,
    pub language_id: String,
    pub version: i32,
    pub text: Arc<str>,
}

impl MaskedDocument {
    /// True when no selected region has any non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A region converted to editor positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRange {
    pub language_id: String,
    pub range: tower_lsp::lsp_types::Range,
}

/// Region index built once per document version.
#[derive(Debug)]
pub struct DocumentRegions {
    uri: Url,
    version: i32,
    text: Arc<str>,
    line_index: LineIndex,
    parsed: ParsedRegions,
    projections: Mutex<HashMap<Selector, Arc<MaskedDocument>>>,
}

impl DocumentRegions {
    pub fn new(document: &CompositeDocument) -> Self {
        let parsed = parse_regions(&document.text);
        tracing::debug!(
            uri = %document.uri,
            version = document.version,
            regions = parsed.regions.len(),
            "parsed document regions"
        );
        Self {
            uri: document.uri.clone(),
            version: document.version,
            text: Arc::clone(&document.text),
            line_index: document.line_index.clone(),
            parsed,
            projections: Mutex::new(HashMap::new()),
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Block regions in document order.
    pub fn regions(&self) -> &[Region] {
        &self.parsed.regions
    }

    /// Directive values inside the template block.
    pub fn attribute_regions(&self) -> &[Region] {
        &self.parsed.attribute_regions
    }

    /// The first `<script>` block, if any.
    pub fn script_region(&self) -> Option<&Region> {
        self.parsed
            .regions
            .iter()
            .find(|r| r.kind == RegionKind::Script)
    }

    /// Masked view keeping only the selected regions.
    pub fn projection(&self, selector: &Selector) -> Arc<MaskedDocument> {
        if let Some(hit) = self.projections.lock().get(selector) {
            return Arc::clone(hit);
        }

        let language_id = match selector {
            Selector::Language(id) => id.clone(),
            Selector::Kind(kind) => kind.default_language_id().to_string(),
        };
        let kept = self
            .parsed
            .regions
            .iter()
            .filter(|r| selector.selects(r))
            .map(Region::span);
        let masked = Arc::new(MaskedDocument {
            uri: self.uri.clone(),
            language_id,
            version: self.version,
            text: mask(&self.text, kept).into(),
        });

        self.projections
            .lock()
            .insert(selector.clone(), Arc::clone(&masked));
        masked
    }

    /// Language of the block containing `offset`, or the document language.
    pub fn language_at(&self, offset: usize) -> &str {
        for region in &self.parsed.regions {
            if region.start > offset {
                break;
            }
            if offset <= region.end {
                return &region.language_id;
            }
        }
        DOCUMENT_LANGUAGE_ID
    }

    pub fn language_at_position(&self, position: Position) -> &str {
        match self.line_index.position_to_offset(position) {
            Some(offset) => self.language_at(offset),
            None => DOCUMENT_LANGUAGE_ID,
        }
    }

    /// The document language followed by each region language, first-seen order.
    pub fn languages_present(&self) -> Vec<&str> {
        let mut languages = vec![DOCUMENT_LANGUAGE_ID];
        for region in &self.parsed.regions {
            if !languages.contains(&region.language_id.as_str()) {
                languages.push(&region.language_id);
            }
        }
        languages
    }

    pub fn imported_modules(&self) -> &[String] {
        &self.parsed.imported_scripts
    }

    pub fn regions_of_kind(&self, kind: RegionKind) -> Vec<LanguageRange> {
        self.parsed
            .regions
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| LanguageRange {
                language_id: r.language_id.clone(),
                range: self.line_index.span_to_range(r.span()),
            })
            .collect()
    }
}

/// Blank every byte outside `keep`, preserving line breaks.
///
/// Multi-byte characters become one space per byte, so byte offsets and
/// line numbers in the result match the source exactly.
fn mask(text: &str, keep: impl Iterator<Item = Range<usize>>) -> String {
    let source = text.as_bytes();
    let mut out: Vec<u8> = source
        .iter()
        .map(|&b| if b == b'\n' || b == b'\r' { b } else { b' ' })
        .collect();
    for span in keep {
        out[span.clone()].copy_from_slice(&source[span]);
    }
    // Region bounds always fall on ASCII delimiters, so `out` stays valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Script projection of raw composite text that is not open in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptView {
    pub text: String,
    /// Language of the first script block, or the default script language.
    pub language_id: String,
}

pub fn script_view(text: &str) -> ScriptView {
    let parsed = parse_regions(text);
    let scripts = parsed.regions.iter().filter(|r| r.kind == RegionKind::Script);
    let language_id = parsed
        .regions
        .iter()
        .find(|r| r.kind == RegionKind::Script)
        .map_or(RegionKind::Script.default_language_id(), |r| r.language_id.as_str())
        .to_string();
    ScriptView {
        text: mask(text, scripts.map(Region::span)),
        language_id,
    }
}

/// Cache of region indexes keyed by document version.
pub type RegionCache = DerivedCache<Arc<DocumentRegions>>;

pub fn region_cache(max_entries: usize, ttl: Duration) -> RegionCache {
    DerivedCache::new(max_entries, ttl, |document| {
        Arc::new(DocumentRegions::new(document))
    })
}
