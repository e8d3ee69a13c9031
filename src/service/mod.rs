//! Editor-facing script features backed by a compiler service.
//!
//! This module provides:
//! - `LanguageService`, the compiler operations script features need
//! - `ScriptMode`, which feeds open components to the project host and
//!   converts service results to LSP types in original-document coordinates

mod completion;
mod diagnostics;
mod hover;
mod types;

use std::sync::Arc;

use tower_lsp::lsp_types::{CompletionList, Diagnostic, Hover, Location, Position, Url};

pub use completion::{
    after_non_script_trigger, completion_kind, to_completion_list, NON_SCRIPT_TRIGGERS,
};
pub use diagnostics::{to_diagnostics, DIAGNOSTIC_SOURCE};
pub use hover::to_hover;
pub use types::{
    CompletionEntry, CompletionOptions, QuickInfo, ScriptElementKind, ServiceDiagnostic,
    SpanInFile, TextSpan,
};

use crate::document::{CompositeDocument, DocumentStore, LineIndex};
use crate::host::{LanguageServiceHost, ScriptUpdate, VirtualProjectHost};
use crate::paths;
use crate::script::BRIDGE_FILE_NAME;
use crate::settings::CompletionSettings;

/// Compiler operations used by script features. Offsets are byte offsets
/// into the snapshot the host serves for `file_name`.
pub trait LanguageService {
    fn program_file_names(&self) -> Vec<String>;
    fn syntactic_diagnostics(&self, file_name: &str) -> Vec<ServiceDiagnostic>;
    fn semantic_diagnostics(&self, file_name: &str) -> Vec<ServiceDiagnostic>;
    fn completions_at(
        &self,
        file_name: &str,
        offset: usize,
        options: &CompletionOptions,
    ) -> Vec<CompletionEntry>;
    fn quick_info_at(&self, file_name: &str, offset: usize) -> Option<QuickInfo>;
    fn definition_at(&self, file_name: &str, offset: usize) -> Vec<SpanInFile>;
    fn references_at(&self, file_name: &str, offset: usize) -> Vec<SpanInFile>;

    /// Drop cached programs, e.g. after a component switched script
    /// language.
    fn restart(&self) {}
}

/// Script features for open components.
pub struct ScriptMode<S> {
    host: Arc<VirtualProjectHost>,
    service: S,
    documents: DocumentStore,
    completion: CompletionSettings,
}

impl<S: LanguageService> ScriptMode<S> {
    pub fn new(host: Arc<VirtualProjectHost>, service: S, completion: CompletionSettings) -> Self {
        Self {
            host,
            service,
            documents: DocumentStore::new(),
            completion,
        }
    }

    pub fn host(&self) -> &Arc<VirtualProjectHost> {
        &self.host
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Record the document and push its script to the host.
    fn prepare(&self, document: &CompositeDocument) -> ScriptUpdate {
        self.documents.open(document.clone());
        let update = self.host.update_document(document);
        if update.kind_changed {
            tracing::debug!(file_name = %update.file_name, "restarting language service");
            self.service.restart();
        }
        update
    }

    fn in_program(&self, file_name: &str) -> bool {
        let in_program = self
            .service
            .program_file_names()
            .iter()
            .any(|name| name == file_name);
        if !in_program {
            tracing::debug!(file_name, "file is not part of the program");
        }
        in_program
    }

    pub fn do_validation(&self, document: &CompositeDocument) -> Vec<Diagnostic> {
        let update = self.prepare(document);
        if !self.in_program(&update.file_name) {
            return Vec::new();
        }

        let syntactic = self.service.syntactic_diagnostics(&update.file_name);
        let semantic = self.service.semantic_diagnostics(&update.file_name);
        to_diagnostics(&syntactic, &semantic, &document.line_index)
    }

    pub fn do_complete(&self, document: &CompositeDocument, position: Position) -> CompletionList {
        let update = self.prepare(document);
        let empty = CompletionList {
            is_incomplete: false,
            items: Vec::new(),
        };
        if !self.in_program(&update.file_name) {
            return empty;
        }
        let Some(offset) = document.line_index.position_to_offset(position) else {
            return empty;
        };
        if after_non_script_trigger(&document.text, offset) {
            return empty;
        }

        let options = CompletionOptions {
            include_external_module_exports: self.completion.auto_import,
        };
        let entries = self
            .service
            .completions_at(&update.file_name, offset, &options);
        to_completion_list(entries, &document.line_index)
    }

    pub fn do_hover(&self, document: &CompositeDocument, position: Position) -> Option<Hover> {
        let update = self.prepare(document);
        if !self.in_program(&update.file_name) {
            return None;
        }
        let offset = document.line_index.position_to_offset(position)?;
        let info = self.service.quick_info_at(&update.file_name, offset)?;
        Some(to_hover(info, &document.line_index))
    }

    pub fn find_definition(
        &self,
        document: &CompositeDocument,
        position: Position,
    ) -> Vec<Location> {
        let update = self.prepare(document);
        if !self.in_program(&update.file_name) {
            return Vec::new();
        }
        let Some(offset) = document.line_index.position_to_offset(position) else {
            return Vec::new();
        };
        let targets = self.service.definition_at(&update.file_name, offset);
        self.to_locations(document, targets)
    }

    pub fn find_references(
        &self,
        document: &CompositeDocument,
        position: Position,
    ) -> Vec<Location> {
        let update = self.prepare(document);
        if !self.in_program(&update.file_name) {
            return Vec::new();
        }
        let Some(offset) = document.line_index.position_to_offset(position) else {
            return Vec::new();
        };
        let targets = self.service.references_at(&update.file_name, offset);
        self.to_locations(document, targets)
    }

    pub fn did_close(&self, uri: &Url) {
        self.host.regions().on_document_removed(uri);
        self.documents.close(uri);
    }

    /// A file changed outside the editor.
    pub fn did_change_watched_file(&self, uri: &Url) {
        self.host.touch(&paths::file_name_from_uri(uri));
    }

    /// Map service spans to locations. The virtual bridge file has no
    /// location on disk and is skipped.
    fn to_locations(&self, document: &CompositeDocument, targets: Vec<SpanInFile>) -> Vec<Location> {
        let file_name = document.file_name();
        targets
            .into_iter()
            .filter(|target| target.file_name != BRIDGE_FILE_NAME)
            .filter_map(|target| {
                let range = if target.file_name == file_name {
                    document.line_index.span_to_range(target.text_span.range())
                } else {
                    self.line_index_of(&target.file_name)?
                        .span_to_range(target.text_span.range())
                };
                let uri = Url::from_file_path(&target.file_name).ok()?;
                Some(Location { uri, range })
            })
            .collect()
    }

    fn line_index_of(&self, file_name: &str) -> Option<LineIndex> {
        if let Some(open) = self.documents.get_by_file_name(file_name) {
            return Some(open.line_index.clone());
        }
        let snapshot = self.host.script_snapshot(file_name)?;
        Some(LineIndex::new(snapshot.shared()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tower_lsp::lsp_types::CompletionItemKind;

    use super::*;
    use crate::settings::Settings;

    const APP: &str = "<template>\n  <div>{{ msg }}</div>\n</template>\n<script>\nexport default {\n  data() { return { msg: 'hi' } }\n}\n</script>\n";

    #[derive(Default)]
    struct FakeService {
        program: Mutex<Option<Vec<String>>>,
        calls: AtomicUsize,
        restarts: AtomicUsize,
        last_offset: Mutex<Option<usize>>,
        last_options: Mutex<Option<CompletionOptions>>,
        semantic: Vec<ServiceDiagnostic>,
        completions: Vec<CompletionEntry>,
        info: Option<QuickInfo>,
        targets: Vec<SpanInFile>,
    }

    impl FakeService {
        fn record(&self, offset: usize) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_offset.lock().unwrap() = Some(offset);
        }
    }

    impl LanguageService for FakeService {
        fn program_file_names(&self) -> Vec<String> {
            self.program.lock().unwrap().clone().unwrap_or_default()
        }

        fn syntactic_diagnostics(&self, _file_name: &str) -> Vec<ServiceDiagnostic> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }

        fn semantic_diagnostics(&self, _file_name: &str) -> Vec<ServiceDiagnostic> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.semantic.clone()
        }

        fn completions_at(
            &self,
            _file_name: &str,
            offset: usize,
            options: &CompletionOptions,
        ) -> Vec<CompletionEntry> {
            self.record(offset);
            *self.last_options.lock().unwrap() = Some(*options);
            self.completions.clone()
        }

        fn quick_info_at(&self, _file_name: &str, offset: usize) -> Option<QuickInfo> {
            self.record(offset);
            self.info.clone()
        }

        fn definition_at(&self, _file_name: &str, offset: usize) -> Vec<SpanInFile> {
            self.record(offset);
            self.targets.clone()
        }

        fn references_at(&self, _file_name: &str, offset: usize) -> Vec<SpanInFile> {
            self.record(offset);
            self.targets.clone()
        }

        fn restart(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        mode: ScriptMode<FakeService>,
    }

    impl Fixture {
        fn new(service: FakeService) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let host = Arc::new(VirtualProjectHost::new(dir.path(), &Settings::default()));
            let mode = ScriptMode::new(host, service, CompletionSettings::default());
            Self { dir, mode }
        }

        fn file_name(&self, name: &str) -> String {
            paths::from_path(&self.dir.path().join(name))
        }

        fn document(&self, name: &str, version: i32, text: &str) -> CompositeDocument {
            let uri = Url::from_file_path(self.dir.path().join(name)).unwrap();
            CompositeDocument::new(uri, version, text)
        }

        /// Make the service see every host root.
        fn sync_program(&self) {
            *self.mode.service().program.lock().unwrap() = Some(self.mode.host().root_file_names());
        }
    }

    fn offset_of(text: &str, needle: &str) -> usize {
        text.find(needle).unwrap()
    }

    #[test]
    fn files_outside_the_program_are_not_sent_to_the_service() {
        let fixture = Fixture::new(FakeService::default());
        let doc = fixture.document("App.vue", 1, APP);

        assert!(fixture.mode.do_validation(&doc).is_empty());
        assert!(fixture.mode.do_complete(&doc, Position::new(5, 20)).items.is_empty());
        assert!(fixture.mode.do_hover(&doc, Position::new(5, 20)).is_none());
        assert!(fixture.mode.find_definition(&doc, Position::new(5, 20)).is_empty());
        assert_eq!(fixture.mode.service().calls.load(Ordering::SeqCst), 0);
        // The host still learned about the component.
        assert!(fixture.mode.host().is_root(&fixture.file_name("App.vue")));
    }

    #[test]
    fn validation_maps_spans_into_the_document() {
        let start = offset_of(APP, "msg: 'hi'");
        let fixture = Fixture::new(FakeService {
            semantic: vec![ServiceDiagnostic {
                span: Some(TextSpan::new(start, 3)),
                message: "unused".to_string(),
                code: 6133,
            }],
            ..Default::default()
        });
        let doc = fixture.document("App.vue", 1, APP);
        fixture.mode.do_validation(&doc);
        fixture.sync_program();

        let diagnostics = fixture.mode.do_validation(&doc);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(5, 20));
        assert_eq!(diagnostics[0].range.end, Position::new(5, 23));
        assert_eq!(diagnostics[0].source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    }

    #[test]
    fn completion_skips_trigger_characters_and_hides_the_bridge() {
        let fixture = Fixture::new(FakeService {
            completions: vec![
                CompletionEntry {
                    name: crate::script::BRIDGE_IDENTIFIER.to_string(),
                    kind: ScriptElementKind::Alias,
                    sort_text: "0".to_string(),
                    replacement_span: None,
                    source: None,
                },
                CompletionEntry {
                    name: "msg".to_string(),
                    kind: ScriptElementKind::Property,
                    sort_text: "0".to_string(),
                    replacement_span: None,
                    source: None,
                },
            ],
            ..Default::default()
        });
        let doc = fixture.document("App.vue", 1, APP);
        fixture.mode.do_validation(&doc);
        fixture.sync_program();

        // Right after the opening brace of `data()`.
        let list = fixture.mode.do_complete(&doc, Position::new(5, 10));
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].label, "msg");
        assert_eq!(list.items[0].kind, Some(CompletionItemKind::FIELD));
        assert_eq!(
            *fixture.mode.service().last_offset.lock().unwrap(),
            Some(offset_of(APP, "data() {") + 8)
        );
        assert_eq!(
            *fixture.mode.service().last_options.lock().unwrap(),
            Some(CompletionOptions {
                include_external_module_exports: true,
            })
        );

        let calls = fixture.mode.service().calls.load(Ordering::SeqCst);
        let slash = doc.line_index.offset_to_position(offset_of(APP, "</script>") + 2);
        assert!(fixture.mode.do_complete(&doc, slash).items.is_empty());
        assert_eq!(fixture.mode.service().calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn hover_uses_original_positions() {
        let start = offset_of(APP, "msg: 'hi'");
        let fixture = Fixture::new(FakeService {
            info: Some(QuickInfo {
                kind: ScriptElementKind::Property,
                text_span: TextSpan::new(start, 3),
                display: "(property) msg: string".to_string(),
                documentation: String::new(),
            }),
            ..Default::default()
        });
        let doc = fixture.document("App.vue", 1, APP);
        fixture.mode.do_validation(&doc);
        fixture.sync_program();

        let hover = fixture.mode.do_hover(&doc, Position::new(5, 21)).unwrap();
        assert_eq!(hover.range.unwrap().start, Position::new(5, 20));
        assert_eq!(
            *fixture.mode.service().last_offset.lock().unwrap(),
            Some(start + 1)
        );
    }

    #[test]
    fn references_skip_the_bridge_file() {
        let start = offset_of(APP, "msg: 'hi'");
        let dir = tempfile::tempdir().unwrap();
        let app = paths::from_path(&dir.path().join("App.vue"));
        let service = FakeService {
            targets: vec![
                SpanInFile {
                    file_name: BRIDGE_FILE_NAME.to_string(),
                    text_span: TextSpan::new(0, 1),
                },
                SpanInFile {
                    file_name: app,
                    text_span: TextSpan::new(start, 3),
                },
            ],
            ..Default::default()
        };
        let host = Arc::new(VirtualProjectHost::new(dir.path(), &Settings::default()));
        let fixture = Fixture {
            mode: ScriptMode::new(host, service, CompletionSettings::default()),
            dir,
        };
        let doc = fixture.document("App.vue", 1, APP);
        fixture.mode.do_validation(&doc);
        fixture.sync_program();

        let locations = fixture.mode.find_references(&doc, Position::new(5, 21));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].uri, doc.uri);
        assert_eq!(locations[0].range.start, Position::new(5, 20));
        assert_eq!(locations[0].range.end, Position::new(5, 23));
    }

    #[test]
    fn definitions_in_closed_files_use_their_snapshot() {
        let fixture = Fixture::new(FakeService::default());
        std::fs::write(fixture.dir.path().join("util.ts"), "// helpers\nexport const a = 1\n")
            .unwrap();
        let util = fixture.file_name("util.ts");
        let service = FakeService {
            targets: vec![SpanInFile {
                file_name: util.clone(),
                text_span: TextSpan::new(24, 1),
            }],
            ..Default::default()
        };
        let mode = ScriptMode::new(
            Arc::clone(fixture.mode.host()),
            service,
            CompletionSettings::default(),
        );
        let doc = fixture.document("App.vue", 1, APP);
        mode.do_validation(&doc);
        *mode.service().program.lock().unwrap() = Some(mode.host().root_file_names());

        let locations = mode.find_definition(&doc, Position::new(5, 21));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].uri, Url::from_file_path(&util).unwrap());
        assert_eq!(locations[0].range.start, Position::new(1, 13));
    }

    #[test]
    fn language_switch_restarts_the_service() {
        let fixture = Fixture::new(FakeService::default());
        fixture.mode.do_validation(&fixture.document("App.vue", 1, APP));
        let ts = APP.replace("<script>", "<script lang=\"ts\">");
        fixture.mode.do_validation(&fixture.document("App.vue", 2, &ts));
        assert_eq!(fixture.mode.service().restarts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_and_watch_events_reach_the_host() {
        let fixture = Fixture::new(FakeService::default());
        let doc = fixture.document("App.vue", 1, APP);
        fixture.mode.do_validation(&doc);
        assert!(fixture.mode.host().regions().contains(&doc.uri, 1));

        fixture.mode.did_close(&doc.uri);
        assert!(!fixture.mode.host().regions().contains(&doc.uri, 1));

        let app = fixture.file_name("App.vue");
        let before = fixture.mode.host().script_version(&app);
        fixture.mode.did_change_watched_file(&doc.uri);
        assert_eq!(fixture.mode.host().script_version(&app), before + 1);
    }
}
