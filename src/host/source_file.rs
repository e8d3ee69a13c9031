//! Script snapshots and the parsed source files built from them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::paths;
use crate::script::{parse_script, rewrite_default_export, ScriptKind, ScriptTree};

/// Immutable text of one script version as served to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSnapshot(Arc<str>);

impl ScriptSnapshot {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn shared(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text in `start..end`, clamped to the snapshot.
    pub fn get_text(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.0.len());
        self.0.get(start.min(end)..end).unwrap_or("")
    }
}

/// Builds and refreshes syntax trees for the host.
///
/// Supplied at host construction so the compiler never has to be patched to
/// see rewritten component scripts.
pub trait SourceFileFactory: Send + Sync {
    fn create(&self, file_name: &str, snapshot: &ScriptSnapshot, kind: ScriptKind) -> ScriptTree;

    /// Rebuild after a version change. `kind` is the kind the file was
    /// created with.
    fn update(
        &self,
        file_name: &str,
        previous: &ScriptTree,
        snapshot: &ScriptSnapshot,
        kind: ScriptKind,
    ) -> ScriptTree;
}

/// Parses snapshots and routes untyped component scripts through the
/// bridge rewrite.
#[derive(Debug, Default, Clone, Copy)]
pub struct BridgingSourceFactory;

impl BridgingSourceFactory {
    fn build(file_name: &str, snapshot: &ScriptSnapshot, kind: ScriptKind) -> ScriptTree {
        let tree = parse_script(snapshot.text(), kind);
        if paths::is_composite(file_name) && !kind.is_ts_like() {
            rewrite_default_export(tree)
        } else {
            tree
        }
    }
}

impl SourceFileFactory for BridgingSourceFactory {
    fn create(&self, file_name: &str, snapshot: &ScriptSnapshot, kind: ScriptKind) -> ScriptTree {
        Self::build(file_name, snapshot, kind)
    }

    fn update(
        &self,
        file_name: &str,
        _previous: &ScriptTree,
        snapshot: &ScriptSnapshot,
        kind: ScriptKind,
    ) -> ScriptTree {
        Self::build(file_name, snapshot, kind)
    }
}

/// Stable handle of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed script as handed to the compiler.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub file_name: String,
    pub version: u64,
    /// Kind the file was first created with.
    pub script_kind: ScriptKind,
    pub tree: Arc<ScriptTree>,
}

#[derive(Debug)]
struct FileRecord {
    file_name: String,
    created_kind: ScriptKind,
    version: u64,
    tree: Arc<ScriptTree>,
}

/// Id-indexed storage of source files. Ids are handed out on first
/// registration and never reused.
#[derive(Debug, Default)]
pub struct SourceFileArena {
    ids: HashMap<String, FileId>,
    records: Vec<FileRecord>,
}

impl SourceFileArena {
    pub fn id_of(&self, file_name: &str) -> Option<FileId> {
        self.ids.get(file_name).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn source_file(&self, id: FileId) -> Option<SourceFile> {
        self.records.get(id.index()).map(|r| SourceFile {
            id,
            file_name: r.file_name.clone(),
            version: r.version,
            script_kind: r.created_kind,
            tree: Arc::clone(&r.tree),
        })
    }

    /// Current source file for `file_name`, creating or updating it through
    /// `factory` when the version moved.
    pub fn get_or_update(
        &mut self,
        factory: &dyn SourceFileFactory,
        file_name: &str,
        snapshot: &ScriptSnapshot,
        version: u64,
        kind: ScriptKind,
    ) -> Option<SourceFile> {
        let Some(id) = self.id_of(file_name) else {
            let id = FileId(u32::try_from(self.records.len()).ok()?);
            let tree = factory.create(file_name, snapshot, kind);
            tracing::debug!(file_name, %id, ?kind, "created source file");
            self.records.push(FileRecord {
                file_name: file_name.to_string(),
                created_kind: kind,
                version,
                tree: Arc::new(tree),
            });
            self.ids.insert(file_name.to_string(), id);
            return self.source_file(id);
        };

        let record = self.records.get_mut(id.index())?;
        if record.version != version {
            let tree = factory.update(file_name, &record.tree, snapshot, record.created_kind);
            tracing::debug!(file_name, %id, version, "updated source file");
            record.tree = Arc::new(tree);
            record.version = version;
        }
        self.source_file(id)
    }

    /// Forget the tree of `file_name` so the next request recreates it with
    /// `kind`. The id is kept.
    pub fn reset(&mut self, file_name: &str, kind: ScriptKind) {
        if let Some(record) = self
            .id_of(file_name)
            .and_then(|id| self.records.get_mut(id.index()))
        {
            record.created_kind = kind;
            record.version = u64::MAX;
        }
    }
}
