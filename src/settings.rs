//! Settings infrastructure for vuels.
//!
//! Settings come from a `vuels.toml` file. Every field has a default, so a
//! missing file, a missing table or a missing key all behave the same way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::document::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::error::{HostError, HostResult};
use crate::script::bridge::{parse_version, DEFAULT_THRESHOLD};

/// File name searched for by [`discover_settings`].
pub const SETTINGS_FILE_NAME: &str = "vuels.toml";

/// Root settings structure loaded from vuels.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub format: FormatSettings,
    pub bridge: BridgeSettings,
    pub cache: CacheSettings,
    pub typescript: TypeScriptSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Offer completions from modules that are not imported yet.
    pub auto_import: bool,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self { auto_import: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    /// Indent the top level of `<script>` blocks.
    pub initial_script_indent: bool,
    pub default_formatter: DefaultFormatters,
}

/// Formatter used for a block language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Formatter {
    Builtin,
    Prettier,
    PrettierEslint,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultFormatters {
    pub script: Formatter,
    pub style: Formatter,
    pub markup: Formatter,
}

impl Default for DefaultFormatters {
    fn default() -> Self {
        Self {
            script: Formatter::Prettier,
            style: Formatter::Prettier,
            markup: Formatter::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Manifest dependency whose version picks the bridge schema.
    pub dependency: String,
    /// Versions below this `major.minor` get the legacy bridge.
    pub legacy_threshold: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            dependency: "vue".to_string(),
            legacy_threshold: "2.5".to_string(),
        }
    }
}

impl BridgeSettings {
    /// Parsed threshold. Unparseable values fall back to 2.5.
    pub fn threshold(&self) -> (u32, u32) {
        parse_version(&self.legacy_threshold).unwrap_or_else(|| {
            tracing::warn!(
                threshold = %self.legacy_threshold,
                "invalid bridge.legacy_threshold, using default"
            );
            DEFAULT_THRESHOLD
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TypeScriptSettings {
    /// Directory holding the default `lib.*.d.ts` files. Relative paths are
    /// resolved against the workspace.
    pub lib_dir: Option<PathBuf>,
}

/// Parse a settings file.
pub fn read_settings(path: &Path) -> HostResult<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| HostError::io(path, e))?;
    toml::from_str(&content).map_err(|source| HostError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load settings from a vuels.toml file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match read_settings(path) {
        Ok(settings) => settings,
        Err(err @ HostError::Toml { .. }) => {
            tracing::warn!(%err, "failed to parse settings, using defaults");
            Settings::default()
        }
        Err(err) => {
            tracing::debug!(%err, "no settings loaded");
            Settings::default()
        }
    }
}

/// Discover vuels.toml by searching up the directory tree, then direct children.
///
/// Search order:
/// 1. Walk up from `start_dir` to filesystem root
/// 2. If not found, check immediate child directories of `start_dir`
///
/// Returns `(settings, settings_dir)`. If nothing is found, returns
/// `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE_NAME);
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE_NAME);
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.completion.auto_import);
        assert!(!settings.format.initial_script_indent);
        assert_eq!(settings.format.default_formatter.script, Formatter::Prettier);
        assert_eq!(settings.format.default_formatter.style, Formatter::Prettier);
        assert_eq!(settings.format.default_formatter.markup, Formatter::None);
        assert_eq!(settings.bridge.dependency, "vue");
        assert_eq!(settings.bridge.threshold(), (2, 5));
        assert_eq!(settings.cache.max_entries, 10);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(60));
        assert_eq!(settings.typescript.lib_dir, None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[completion]
auto_import = false

[format.default_formatter]
script = "prettier-eslint"
"#,
        )
        .unwrap();
        assert!(!settings.completion.auto_import);
        assert_eq!(
            settings.format.default_formatter.script,
            Formatter::PrettierEslint
        );
        assert_eq!(settings.format.default_formatter.style, Formatter::Prettier);
        assert_eq!(settings.cache, CacheSettings::default());
    }

    #[test]
    fn unknown_formatter_is_rejected() {
        let result: Result<Settings, _> =
            toml::from_str("[format.default_formatter]\nmarkup = \"beautify\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_threshold_falls_back() {
        let bridge = BridgeSettings {
            legacy_threshold: "soon".to_string(),
            ..Default::default()
        };
        assert_eq!(bridge.threshold(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn invalid_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "[cache\nmax_entries = ").unwrap();
        assert!(matches!(read_settings(&path), Err(HostError::Toml { .. })));
        assert_eq!(load_settings(&path), Settings::default());
    }

    #[test]
    fn discover_settings_in_parent_dir() {
        let parent = tempfile::tempdir().unwrap();
        let child = parent.path().join("src");
        fs::create_dir_all(&child).unwrap();
        fs::write(
            parent.path().join(SETTINGS_FILE_NAME),
            "[cache]\nmax_entries = 3\n",
        )
        .unwrap();

        let (settings, settings_dir) = discover_settings(&child);
        assert_eq!(settings_dir, parent.path());
        assert_eq!(settings.cache.max_entries, 3);
    }

    #[test]
    fn discover_settings_in_child_dir() {
        let parent = tempfile::tempdir().unwrap();
        let child = parent.path().join("client");
        fs::create_dir_all(&child).unwrap();
        fs::write(
            child.join(SETTINGS_FILE_NAME),
            "[bridge]\nlegacy_threshold = \"3.0\"\n",
        )
        .unwrap();

        let (settings, settings_dir) = discover_settings(parent.path());
        assert_eq!(settings_dir, child);
        assert_eq!(settings.bridge.threshold(), (3, 0));
    }

    #[test]
    fn discover_settings_parent_preferred_over_child() {
        let parent = tempfile::tempdir().unwrap();
        let child = parent.path().join("nested");
        fs::create_dir_all(&child).unwrap();
        fs::write(
            parent.path().join(SETTINGS_FILE_NAME),
            "[cache]\nttl_secs = 5\n",
        )
        .unwrap();
        fs::write(child.join(SETTINGS_FILE_NAME), "[cache]\nttl_secs = 9\n").unwrap();

        let (settings, settings_dir) = discover_settings(parent.path());
        assert_eq!(settings_dir, parent.path());
        assert_eq!(settings.cache.ttl_secs, 5);
    }
}
