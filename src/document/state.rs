//! Open composite documents.

use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::Url;

use super::text::LineIndex;
use crate::paths;

/// Read-only snapshot of an editor document.
///
/// The editor owns the document; the core only ever sees immutable
/// snapshots of it, one per version.
#[derive(Debug, Clone)]
pub struct CompositeDocument {
    pub uri: Url,
    pub version: i32,
    pub text: Arc<str>,
    /// Index over `text`, used to convert compiler offsets back to positions.
    pub line_index: LineIndex,
}

impl CompositeDocument {
    pub fn new(uri: Url, version: i32, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        Self {
            uri,
            version,
            line_index: LineIndex::new(Arc::clone(&text)),
            text,
        }
    }

    /// Normalized file-system path of the document, as the host keys it.
    pub fn file_name(&self) -> String {
        paths::file_name_from_uri(&self.uri)
    }

    pub fn is_composite(&self) -> bool {
        paths::is_composite(self.uri.path())
    }
}

/// Thread-safe storage for open documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Arc<CompositeDocument>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Record a new snapshot. An older version never replaces a newer one.
    pub fn open(&self, document: CompositeDocument) -> Arc<CompositeDocument> {
        let document = Arc::new(document);
        let mut entry = self
            .documents
            .entry(document.uri.clone())
            .or_insert_with(|| Arc::clone(&document));
        if entry.version < document.version {
            *entry = Arc::clone(&document);
        }
        Arc::clone(&entry)
    }

    pub fn close(&self, uri: &Url) -> Option<Arc<CompositeDocument>> {
        self.documents.remove(uri).map(|(_, doc)| doc)
    }

    pub fn get(&self, uri: &Url) -> Option<Arc<CompositeDocument>> {
        self.documents.get(uri).map(|r| Arc::clone(&r))
    }

    /// Find an open document by its normalized file name.
    pub fn get_by_file_name(&self, file_name: &str) -> Option<Arc<CompositeDocument>> {
        self.documents
            .iter()
            .find(|entry| entry.value().file_name() == file_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
