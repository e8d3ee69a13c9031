//! The project host the compiler service runs against.
//!
//! This module provides:
//! - `LanguageServiceHost`, the contract the compiler service consumes
//! - `VirtualProjectHost`, which serves `.vue` files as script modules
//! - the composite file-system view, module resolution, project config and
//!   source-file storage it is built from

mod project;
mod resolve;
mod source_file;
mod system;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

pub use project::{
    find_config_file, to_strict_json, CompilationSettings, JsxEmit, ModuleKind,
    ModuleResolutionKind, ProjectConfig, ScriptTarget, CONFIG_FILE_NAMES,
};
pub use resolve::{ModuleResolver, ResolvedModule};
pub use source_file::{
    BridgingSourceFactory, FileId, ScriptSnapshot, SourceFile, SourceFileArena, SourceFileFactory,
};
pub use system::{CompositeSystem, RealSystem, System, PLACEHOLDER_SCRIPT};

use crate::document::{
    region_cache, script_view, CompositeDocument, MaskedDocument, RegionCache, RegionKind,
    Selector,
};
use crate::paths;
use crate::script::{BridgeSchema, Extension, ScriptKind, BRIDGE_FILE_NAME, BRIDGE_MODULE_NAME};
use crate::settings::Settings;

/// What the compiler service asks of its host.
pub trait LanguageServiceHost {
    fn root_file_names(&self) -> Vec<String>;
    /// Bumped whenever the root set changes.
    fn project_version(&self) -> u64;
    fn compilation_settings(&self) -> CompilationSettings;
    fn script_version(&self, file_name: &str) -> u64;
    fn script_snapshot(&self, file_name: &str) -> Option<ScriptSnapshot>;
    fn script_kind(&self, file_name: &str) -> ScriptKind;
    fn resolve_module_names(
        &self,
        module_names: &[String],
        containing_file: &str,
    ) -> Vec<Option<ResolvedModule>>;
    fn file_exists(&self, path: &str) -> bool;
    fn read_file(&self, path: &str) -> Option<String>;
    fn directory_exists(&self, path: &str) -> bool;
    fn get_directories(&self, path: &str) -> Vec<String>;
    fn read_directory(&self, path: &str, extensions: &[&str], depth: Option<usize>) -> Vec<String>;
    fn realpath(&self, path: &str) -> String;
    fn default_library_file_name(&self, settings: &CompilationSettings) -> String;
    fn current_directory(&self) -> String;
}

/// Per-path script state.
#[derive(Debug)]
struct VirtualScript {
    version: u64,
    /// Last masked text of an open component.
    text: Option<Arc<str>>,
    script_kind: Option<ScriptKind>,
}

impl VirtualScript {
    fn new() -> Self {
        Self {
            version: 0,
            text: None,
            script_kind: None,
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    root_files: Vec<String>,
    root_set: HashSet<String>,
    project_version: u64,
    scripts: HashMap<String, VirtualScript>,
    arena: SourceFileArena,
}

impl HostState {
    fn add_root(&mut self, file_name: &str) -> bool {
        if !self.root_set.insert(file_name.to_string()) {
            return false;
        }
        self.root_files.push(file_name.to_string());
        self.project_version += 1;
        tracing::debug!(file_name, "added project root");
        true
    }
}

/// Result of feeding an open document to the host.
#[derive(Debug, Clone)]
pub struct ScriptUpdate {
    pub file_name: String,
    pub masked: Arc<MaskedDocument>,
    pub version: u64,
    pub script_kind: ScriptKind,
    /// The script language differs from the previous update of this file.
    pub kind_changed: bool,
}

/// Project host that presents `.vue` components to the compiler as script
/// modules.
pub struct VirtualProjectHost {
    workspace: PathBuf,
    system: CompositeSystem,
    resolver: ModuleResolver,
    settings: CompilationSettings,
    lib_dir: PathBuf,
    bridge: BridgeSchema,
    regions: Arc<RegionCache>,
    factory: Box<dyn SourceFileFactory>,
    state: Mutex<HostState>,
}

impl std::fmt::Debug for VirtualProjectHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualProjectHost")
            .field("workspace", &self.workspace)
            .field("bridge", &self.bridge)
            .field("roots", &self.state.lock().root_files.len())
            .finish_non_exhaustive()
    }
}

impl VirtualProjectHost {
    pub fn new(workspace: &Path, settings: &Settings) -> Self {
        Self::with_factory(workspace, settings, Box::new(BridgingSourceFactory))
    }

    pub fn with_factory(
        workspace: &Path,
        settings: &Settings,
        factory: Box<dyn SourceFileFactory>,
    ) -> Self {
        Self::with_system(workspace, settings, factory, Box::new(RealSystem))
    }

    /// Host over an arbitrary file system. Project discovery and the
    /// bridge schema still read the real workspace.
    pub fn with_system(
        workspace: &Path,
        settings: &Settings,
        factory: Box<dyn SourceFileFactory>,
        system: Box<dyn System>,
    ) -> Self {
        let project = ProjectConfig::load(workspace);
        let bridge = BridgeSchema::detect(
            workspace,
            &settings.bridge.dependency,
            settings.bridge.threshold(),
        );
        let lib_dir = match &settings.typescript.lib_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => workspace.join(dir),
            None => workspace.join("node_modules/typescript/lib"),
        };

        let mut state = HostState::default();
        for file_name in &project.file_names {
            state.add_root(file_name);
        }

        tracing::debug!(
            workspace = %workspace.display(),
            roots = state.root_files.len(),
            ?bridge,
            "created project host"
        );

        Self {
            workspace: workspace.to_path_buf(),
            system: CompositeSystem::new(system),
            resolver: ModuleResolver::new(project.settings.allow_js),
            settings: project.settings,
            lib_dir,
            bridge,
            regions: Arc::new(region_cache(
                settings.cache.max_entries,
                settings.cache.ttl(),
            )),
            factory,
            state: Mutex::new(state),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn bridge_schema(&self) -> BridgeSchema {
        self.bridge
    }

    /// Region indexes shared with the editor-facing layer.
    pub fn regions(&self) -> &Arc<RegionCache> {
        &self.regions
    }

    pub fn is_root(&self, file_name: &str) -> bool {
        self.state.lock().root_set.contains(file_name)
    }

    /// Feed the current text of an open document to the host.
    ///
    /// Components join the root set on first sight. The script version only
    /// moves when the masked script text actually changes.
    pub fn update_document(&self, document: &CompositeDocument) -> ScriptUpdate {
        let file_name = document.file_name();
        let regions = self.regions.get(document);
        let masked = regions.projection(&Selector::Kind(RegionKind::Script));
        let script_kind = ScriptKind::from_language_id(
            regions
                .script_region()
                .map_or(RegionKind::Script.default_language_id(), |r| r.language_id.as_str()),
        );

        let preseed: Vec<String> = regions
            .imported_modules()
            .iter()
            .filter(|m| paths::is_relative_specifier(m) && paths::is_composite(m))
            .map(|m| paths::join(paths::directory_of(&file_name), m))
            .filter(|target| self.system.inner().file_exists(target))
            .collect();

        let mut state = self.state.lock();
        if paths::is_composite(&file_name) {
            state.add_root(&file_name);
        }
        for target in &preseed {
            state.add_root(target);
        }

        let script = state
            .scripts
            .entry(file_name.clone())
            .or_insert_with(VirtualScript::new);
        if script.text.as_deref() != Some(&*masked.text) {
            script.version += 1;
            script.text = Some(Arc::clone(&masked.text));
            tracing::debug!(%file_name, version = script.version, "script text changed");
        }
        let kind_changed = script.script_kind.is_some_and(|k| k != script_kind);
        script.script_kind = Some(script_kind);
        let version = script.version;

        if kind_changed {
            tracing::debug!(%file_name, ?script_kind, "script language changed");
            state.arena.reset(&file_name, script_kind);
        }

        ScriptUpdate {
            file_name,
            masked,
            version,
            script_kind,
            kind_changed,
        }
    }

    /// Record an out-of-band change to a file, e.g. from a file watcher.
    pub fn touch(&self, file_name: &str) {
        let file_name = paths::normalize(file_name);
        let mut state = self.state.lock();
        let script = state
            .scripts
            .entry(file_name.clone())
            .or_insert_with(VirtualScript::new);
        script.version += 1;
        tracing::debug!(%file_name, version = script.version, "file changed on disk");
    }

    /// Parsed source of `file_name` at its current version.
    pub fn source_file(&self, file_name: &str) -> Option<SourceFile> {
        let snapshot = self.script_snapshot(file_name)?;
        let version = self.script_version(file_name);
        let kind = self.script_kind(file_name);
        self.state
            .lock()
            .arena
            .get_or_update(self.factory.as_ref(), file_name, &snapshot, version, kind)
    }

    pub fn file_id(&self, file_name: &str) -> Option<FileId> {
        self.state.lock().arena.id_of(file_name)
    }

    fn component_kind_on_disk(&self, file_name: &str) -> ScriptKind {
        let text = self.system.inner().read_file(file_name).unwrap_or_default();
        ScriptKind::from_language_id(&script_view(&text).language_id)
    }
}

fn placeholder_if_blank(text: Arc<str>) -> ScriptSnapshot {
    if text.trim().is_empty() {
        ScriptSnapshot::new(PLACEHOLDER_SCRIPT)
    } else {
        ScriptSnapshot::new(text)
    }
}

impl LanguageServiceHost for VirtualProjectHost {
    fn root_file_names(&self) -> Vec<String> {
        self.state.lock().root_files.clone()
    }

    fn project_version(&self) -> u64 {
        self.state.lock().project_version
    }

    fn compilation_settings(&self) -> CompilationSettings {
        self.settings.clone()
    }

    fn script_version(&self, file_name: &str) -> u64 {
        if file_name == BRIDGE_FILE_NAME {
            return 0;
        }
        self.state
            .lock()
            .scripts
            .get(file_name)
            .map_or(0, |s| s.version)
    }

    fn script_snapshot(&self, file_name: &str) -> Option<ScriptSnapshot> {
        if file_name == BRIDGE_FILE_NAME {
            return Some(ScriptSnapshot::new(self.bridge.content()));
        }

        if paths::is_composite(file_name) {
            let open = self
                .state
                .lock()
                .scripts
                .get(file_name)
                .and_then(|s| s.text.clone());
            let text = match open {
                Some(text) => text,
                None => {
                    let raw = self.system.inner().read_file(file_name).unwrap_or_default();
                    Arc::from(script_view(&raw).text)
                }
            };
            return Some(placeholder_if_blank(text));
        }

        self.system.read_file(file_name).map(ScriptSnapshot::new)
    }

    fn script_kind(&self, file_name: &str) -> ScriptKind {
        if file_name == BRIDGE_FILE_NAME {
            return ScriptKind::Ts;
        }
        if paths::is_composite(file_name) {
            let known = self
                .state
                .lock()
                .scripts
                .get(file_name)
                .and_then(|s| s.script_kind);
            return known.unwrap_or_else(|| self.component_kind_on_disk(file_name));
        }
        ScriptKind::from_file_name(file_name)
    }

    fn resolve_module_names(
        &self,
        module_names: &[String],
        containing_file: &str,
    ) -> Vec<Option<ResolvedModule>> {
        module_names
            .iter()
            .map(|name| {
                if name == BRIDGE_MODULE_NAME {
                    return Some(ResolvedModule {
                        resolved_file_name: BRIDGE_FILE_NAME.to_string(),
                        extension: Extension::Ts,
                        is_external_library_import: false,
                    });
                }

                if paths::is_absolute(name) || !paths::is_composite(name) {
                    return self
                        .resolver
                        .resolve(name, containing_file, self.system.inner());
                }

                let resolved = self.resolver.resolve(name, containing_file, &self.system)?;
                // Real declaration files or directories named like a component
                // are ordinary modules.
                if !paths::is_composite_view_name(&resolved.resolved_file_name) {
                    return Some(resolved);
                }
                let file_name =
                    paths::strip_composite_suffix(&resolved.resolved_file_name).to_string();
                let extension = Extension::for_composite(self.script_kind(&file_name));
                self.state.lock().add_root(&file_name);
                tracing::debug!(name = %name, %file_name, ?extension, "resolved component import");
                Some(ResolvedModule {
                    resolved_file_name: file_name,
                    extension,
                    is_external_library_import: resolved.is_external_library_import,
                })
            })
            .collect()
    }

    fn file_exists(&self, path: &str) -> bool {
        self.system.file_exists(path)
    }

    fn read_file(&self, path: &str) -> Option<String> {
        self.system.read_file(path)
    }

    fn directory_exists(&self, path: &str) -> bool {
        self.system.directory_exists(path)
    }

    fn get_directories(&self, path: &str) -> Vec<String> {
        self.system.get_directories(path)
    }

    fn read_directory(&self, path: &str, extensions: &[&str], depth: Option<usize>) -> Vec<String> {
        self.system.read_directory(path, extensions, depth)
    }

    fn realpath(&self, path: &str) -> String {
        self.system.realpath(path)
    }

    fn default_library_file_name(&self, settings: &CompilationSettings) -> String {
        paths::from_path(&self.lib_dir.join(settings.target.default_library()))
    }

    fn current_directory(&self) -> String {
        paths::from_path(&self.workspace)
    }
}
