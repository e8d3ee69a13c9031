//! Project configuration: compilation settings and the root file set.
//!
//! The nearest `tsconfig.json` (or `jsconfig.json`) above the workspace
//! decides which files belong to the project, following its `extends`
//! chain. Without one, every script and component under the workspace does,
//! minus `node_modules` and whatever the `.gitignore` files at or above the
//! workspace list.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{HostError, HostResult};
use crate::paths;

/// Config file names, in lookup order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["tsconfig.json", "jsconfig.json"];

/// File extensions that can be project roots.
const ROOT_EXTENSIONS: [&str; 4] = [".ts", ".tsx", ".d.ts", ".vue"];
const SCRIPT_EXTENSIONS: [&str; 2] = [".js", ".jsx"];

const DEFAULT_EXCLUDES: [&str; 3] = ["node_modules", "bower_components", "jspm_packages"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptTarget {
    Es3,
    Es5,
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    EsNext,
    Latest,
}

impl ScriptTarget {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "es3" => Self::Es3,
            "es5" => Self::Es5,
            "es6" | "es2015" => Self::Es2015,
            "es2016" => Self::Es2016,
            "es2017" => Self::Es2017,
            "es2018" => Self::Es2018,
            "es2019" => Self::Es2019,
            "es2020" => Self::Es2020,
            "es2021" => Self::Es2021,
            "es2022" => Self::Es2022,
            "esnext" => Self::EsNext,
            "latest" => Self::Latest,
            _ => return None,
        })
    }

    /// Name of the library file implied by this target.
    pub fn default_library(self) -> &'static str {
        match self {
            Self::Es3 | Self::Es5 => "lib.d.ts",
            Self::Es2015 => "lib.es6.d.ts",
            Self::Es2016 => "lib.es2016.full.d.ts",
            Self::Es2017 => "lib.es2017.full.d.ts",
            Self::Es2018 => "lib.es2018.full.d.ts",
            Self::Es2019 => "lib.es2019.full.d.ts",
            Self::Es2020 => "lib.es2020.full.d.ts",
            Self::Es2021 => "lib.es2021.full.d.ts",
            Self::Es2022 => "lib.es2022.full.d.ts",
            Self::EsNext | Self::Latest => "lib.esnext.full.d.ts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    None,
    CommonJs,
    Amd,
    Umd,
    System,
    Es2015,
    Es2020,
    EsNext,
    Node16,
    NodeNext,
}

impl ModuleKind {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "commonjs" => Self::CommonJs,
            "amd" => Self::Amd,
            "umd" => Self::Umd,
            "system" => Self::System,
            "es6" | "es2015" => Self::Es2015,
            "es2020" => Self::Es2020,
            "esnext" => Self::EsNext,
            "node16" => Self::Node16,
            "nodenext" => Self::NodeNext,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleResolutionKind {
    Classic,
    NodeJs,
    Node16,
    NodeNext,
    Bundler,
}

impl ModuleResolutionKind {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "classic" => Self::Classic,
            "node" | "node10" => Self::NodeJs,
            "node16" => Self::Node16,
            "nodenext" => Self::NodeNext,
            "bundler" => Self::Bundler,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxEmit {
    None,
    Preserve,
    React,
    ReactNative,
    ReactJsx,
}

impl JsxEmit {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "preserve" => Self::Preserve,
            "react" => Self::React,
            "react-native" => Self::ReactNative,
            "react-jsx" => Self::ReactJsx,
            _ => return None,
        })
    }
}

/// Compiler options handed to the compiler service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationSettings {
    pub allow_non_ts_extensions: bool,
    pub allow_js: bool,
    pub lib: Vec<String>,
    pub target: ScriptTarget,
    pub module_resolution: ModuleResolutionKind,
    pub module: ModuleKind,
    pub jsx: JsxEmit,
    pub allow_synthetic_default_imports: bool,
    /// Options passed through untouched, keyed by their config name.
    pub other: BTreeMap<String, serde_json::Value>,
}

impl Default for CompilationSettings {
    fn default() -> Self {
        Self {
            allow_non_ts_extensions: true,
            allow_js: true,
            lib: vec!["lib.dom.d.ts".to_string(), "lib.es2017.d.ts".to_string()],
            target: ScriptTarget::Latest,
            module_resolution: ModuleResolutionKind::NodeJs,
            module: ModuleKind::CommonJs,
            jsx: JsxEmit::Preserve,
            allow_synthetic_default_imports: true,
            other: BTreeMap::new(),
        }
    }
}

impl CompilationSettings {
    /// Defaults overridden by a config's `compilerOptions`.
    ///
    /// Non-TS extensions stay allowed whatever the config says.
    pub fn from_options(options: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut settings = Self::default();
        for (key, value) in options {
            let applied = match (key.as_str(), value) {
                ("allowJs", serde_json::Value::Bool(b)) => {
                    settings.allow_js = *b;
                    true
                }
                ("allowSyntheticDefaultImports", serde_json::Value::Bool(b)) => {
                    settings.allow_synthetic_default_imports = *b;
                    true
                }
                ("target", serde_json::Value::String(s)) => {
                    ScriptTarget::parse(s).map(|t| settings.target = t).is_some()
                }
                ("module", serde_json::Value::String(s)) => {
                    ModuleKind::parse(s).map(|m| settings.module = m).is_some()
                }
                ("moduleResolution", serde_json::Value::String(s)) => {
                    ModuleResolutionKind::parse(s)
                        .map(|m| settings.module_resolution = m)
                        .is_some()
                }
                ("jsx", serde_json::Value::String(s)) => {
                    JsxEmit::parse(s).map(|j| settings.jsx = j).is_some()
                }
                ("lib", serde_json::Value::Array(items)) => {
                    settings.lib = items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(library_file_name)
                        .collect();
                    true
                }
                ("allowNonTsExtensions", _) => true,
                _ => false,
            };
            if !applied {
                settings.other.insert(key.clone(), value.clone());
            }
        }
        settings
    }
}

/// `"dom"` -> `"lib.dom.d.ts"`. Names already in file form are kept.
fn library_file_name(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    if name.starts_with("lib.") && name.ends_with(".d.ts") {
        name
    } else {
        format!("lib.{name}.d.ts")
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

impl Extends {
    fn into_vec(self) -> Vec<String> {
        match self {
            Extends::One(specifier) => vec![specifier],
            Extends::Many(specifiers) => specifiers,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawConfig {
    extends: Option<Extends>,
    compiler_options: serde_json::Map<String, serde_json::Value>,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

/// Paths or patterns together with the directory of the config that
/// declared them.
#[derive(Debug, Clone)]
struct Scoped {
    dir: PathBuf,
    items: Vec<String>,
}

impl Scoped {
    fn new(dir: &Path, items: Vec<String>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            items,
        }
    }
}

/// A config with its `extends` chain applied.
#[derive(Debug, Default)]
struct ResolvedConfig {
    compiler_options: serde_json::Map<String, serde_json::Value>,
    files: Option<Scoped>,
    include: Option<Scoped>,
    exclude: Option<Scoped>,
}

impl ResolvedConfig {
    /// Lay `other` over `self`: options merge key by key, file lists are
    /// replaced wholesale.
    fn merge(&mut self, other: ResolvedConfig) {
        self.compiler_options.extend(other.compiler_options);
        if other.files.is_some() {
            self.files = other.files;
        }
        if other.include.is_some() {
            self.include = other.include;
        }
        if other.exclude.is_some() {
            self.exclude = other.exclude;
        }
    }
}

/// The parsed project.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_file: Option<PathBuf>,
    pub settings: CompilationSettings,
    /// Normalized absolute root file names, sorted.
    pub file_names: Vec<String>,
}

impl ProjectConfig {
    /// Load the project for `workspace`. Config errors are logged and the
    /// defaults are used instead.
    pub fn load(workspace: &Path) -> Self {
        let Some(config_file) = find_config_file(workspace) else {
            tracing::debug!(workspace = %workspace.display(), "no project config, using defaults");
            let settings = CompilationSettings::default();
            let file_names = enumerate_workspace(workspace, &settings);
            return Self {
                config_file: None,
                settings,
                file_names,
            };
        };

        let resolved = match load_config(&config_file) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(%err, "invalid project config, using defaults");
                ResolvedConfig::default()
            }
        };
        let dir = config_file.parent().unwrap_or(workspace);
        let settings = CompilationSettings::from_options(&resolved.compiler_options);

        let files = resolved
            .files
            .unwrap_or_else(|| Scoped::new(dir, Vec::new()));
        let include = match resolved.include {
            Some(include) => include,
            None if files.items.is_empty() => Scoped::new(dir, vec!["**/*".to_string()]),
            None => Scoped::new(dir, Vec::new()),
        };
        let exclude = resolved.exclude.unwrap_or_else(|| {
            Scoped::new(dir, DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect())
        });
        let file_names = enumerate(&files, &include, &exclude, &settings);

        tracing::debug!(
            config = %config_file.display(),
            files = file_names.len(),
            "loaded project config"
        );
        Self {
            config_file: Some(config_file),
            settings,
            file_names,
        }
    }
}

/// Nearest config file at or above `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().find_map(|name| {
        let mut current = Some(start);
        while let Some(dir) = current {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            current = dir.parent();
        }
        None
    })
}

fn read_config(path: &Path) -> HostResult<RawConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| HostError::io(path, e))?;
    serde_json::from_str(&to_strict_json(&text)).map_err(|e| HostError::json(path, e))
}

fn load_config(path: &Path) -> HostResult<ResolvedConfig> {
    load_config_chain(path, &mut Vec::new())
}

/// Read `path` and everything it extends. `chain` holds the configs being
/// loaded above this one; extending any of them again is skipped.
fn load_config_chain(path: &Path, chain: &mut Vec<PathBuf>) -> HostResult<ResolvedConfig> {
    let raw = read_config(path)?;
    let dir = path.parent().unwrap_or(Path::new("/"));
    chain.push(canonical(path));

    let mut resolved = ResolvedConfig::default();
    for specifier in raw.extends.map(Extends::into_vec).unwrap_or_default() {
        let Some(base) = find_extended_config(dir, &specifier) else {
            tracing::warn!(config = %path.display(), %specifier, "extended config not found");
            continue;
        };
        if chain.contains(&canonical(&base)) {
            tracing::warn!(config = %base.display(), "config extends itself, skipping");
            continue;
        }
        match load_config_chain(&base, chain) {
            Ok(base) => resolved.merge(base),
            Err(err) => tracing::warn!(%err, "could not load extended config"),
        }
    }
    chain.pop();

    resolved.merge(ResolvedConfig {
        compiler_options: raw.compiler_options,
        files: raw.files.map(|items| Scoped::new(dir, items)),
        include: raw.include.map(|items| Scoped::new(dir, items)),
        exclude: raw.exclude.map(|items| Scoped::new(dir, items)),
    });
    Ok(resolved)
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Locate the file an `extends` entry names: relative and absolute paths
/// are taken from `dir`, anything else is looked up in `node_modules`
/// directories at or above it.
fn find_extended_config(dir: &Path, specifier: &str) -> Option<PathBuf> {
    let first_file = |base: PathBuf| {
        let with_json = PathBuf::from(format!("{}.json", base.display()));
        let in_dir = base.join("tsconfig.json");
        [base, with_json, in_dir].into_iter().find(|p| p.is_file())
    };

    if paths::is_relative_specifier(specifier) || paths::is_absolute(specifier) {
        return first_file(dir.join(specifier));
    }
    dir.ancestors()
        .find_map(|ancestor| first_file(ancestor.join("node_modules").join(specifier)))
}

fn is_root(name: &str, settings: &CompilationSettings) -> bool {
    ROOT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        || (settings.allow_js && SCRIPT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}

/// Roots under `workspace` when there is no config file. `node_modules` is
/// always skipped; `.gitignore` files apply whether or not the workspace is
/// a git checkout.
fn enumerate_workspace(workspace: &Path, settings: &CompilationSettings) -> Vec<String> {
    let mut names: Vec<String> = WalkBuilder::new(workspace)
        .standard_filters(false)
        .git_ignore(true)
        .parents(true)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != "node_modules")
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| paths::from_path(entry.path()))
        .filter(|name| is_root(name, settings))
        .collect();
    names.sort();
    names
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Fold leading `./`, `../` and `/` of a config pattern into the directory
/// it is relative to.
fn anchor(dir: &Path, pattern: &str) -> (PathBuf, String) {
    let mut dir = dir.to_path_buf();
    let mut rest = pattern.trim_start_matches("./");
    if let Some(absolute) = rest.strip_prefix('/') {
        dir = PathBuf::from("/");
        rest = absolute;
    }
    while let Some(parent) = rest.strip_prefix("../") {
        dir.pop();
        rest = parent.trim_start_matches("./");
    }
    (dir, rest.trim_end_matches('/').to_string())
}

/// Absolute glob for `pattern` below `dir`.
fn glob_in(dir: &Path, pattern: &str) -> String {
    let dir = paths::from_path(dir);
    format!("{}/{}", globset::escape(dir.trim_end_matches('/')), pattern)
}

/// Expand config include patterns: a plain directory name means everything
/// below it. Also returns the directories the walk has to start from.
fn include_set(include: &Scoped) -> (Vec<PathBuf>, GlobSet) {
    let mut builder = GlobSetBuilder::new();
    let mut roots: Vec<PathBuf> = Vec::new();
    for pattern in &include.items {
        let (dir, pattern) = anchor(&include.dir, pattern);
        let last = pattern.rsplit('/').next().unwrap_or(&pattern);
        let expanded = if has_wildcard(last) || last.contains('.') {
            pattern.clone()
        } else {
            format!("{pattern}/**/*")
        };
        add_glob(&mut builder, &glob_in(&dir, &expanded));

        let mut segments: Vec<&str> = expanded.split('/').collect();
        segments.pop();
        let root = segments
            .into_iter()
            .take_while(|segment| !has_wildcard(segment))
            .fold(dir, |root, segment| root.join(segment));
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    (roots, build_set(builder))
}

/// Exclude patterns match the path itself and anything below it. Patterns
/// without a slash match at any depth, as in `.gitignore`.
fn exclude_set(exclude: &Scoped) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in &exclude.items {
        let anchored = pattern.starts_with('/') || pattern.trim_end_matches('/').contains('/');
        let (dir, pattern) = anchor(&exclude.dir, pattern);
        if pattern.is_empty() {
            continue;
        }
        add_glob(&mut builder, &glob_in(&dir, &pattern));
        add_glob(&mut builder, &glob_in(&dir, &format!("{pattern}/**")));
        if !anchored {
            add_glob(&mut builder, &glob_in(&dir, &format!("**/{pattern}")));
            add_glob(&mut builder, &glob_in(&dir, &format!("**/{pattern}/**")));
        }
    }
    build_set(builder)
}

fn add_glob(builder: &mut GlobSetBuilder, pattern: &str) {
    match Glob::new(pattern) {
        Ok(glob) => {
            builder.add(glob);
        }
        Err(err) => tracing::warn!(pattern, %err, "skipping invalid pattern"),
    }
}

fn build_set(builder: GlobSetBuilder) -> GlobSet {
    builder.build().unwrap_or_else(|err| {
        tracing::warn!(%err, "could not build pattern set");
        GlobSet::empty()
    })
}

fn enumerate(
    files: &Scoped,
    include: &Scoped,
    exclude: &Scoped,
    settings: &CompilationSettings,
) -> Vec<String> {
    let files_dir = paths::from_path(&files.dir);
    let mut names: Vec<String> = files
        .items
        .iter()
        .map(|f| paths::join(&files_dir, f))
        .collect();

    if !include.items.is_empty() {
        let (roots, include) = include_set(include);
        let exclude = exclude_set(exclude);
        for root in roots {
            let walker = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0 || !exclude.is_match(paths::from_path(entry.path()))
                });
            for entry in walker.filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = paths::from_path(entry.path());
                if is_root(&name, settings) && include.is_match(&name) {
                    names.push(name);
                }
            }
        }
    }

    names.sort();
    names.dedup();
    names
}

/// Strip `//` and `/* */` comments and trailing commas so a config file
/// parses as plain JSON.
pub fn to_strict_json(text: &str) -> String {
    let mut without_comments = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            without_comments.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        without_comments.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                without_comments.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        without_comments.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => without_comments.push(c),
        }
    }

    // Second pass: drop commas that only precede whitespace and a closer.
    let bytes = without_comments.as_bytes();
    let mut out = String::with_capacity(without_comments.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in without_comments.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = bytes[i + 1..]
                .iter()
                .find(|b| !b.is_ascii_whitespace());
            if matches!(next, Some(b'}') | Some(b']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
