//! The bridging module injected into every rewritten component script.
//!
//! Rewritten scripts import a default export from `vue-editor-bridge` and wrap
//! their component options with it, so the compiler sees a typed call instead
//! of a bare object literal. Which declaration the bridge carries depends on
//! the framework version installed in the workspace.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{HostError, HostResult};

/// Identifier bound by the synthetic import.
pub const BRIDGE_IDENTIFIER: &str = "__vueEditorBridge";

/// Reserved module specifier of the bridge.
pub const BRIDGE_MODULE_NAME: &str = "vue-editor-bridge";

/// Path the bridge specifier resolves to. Never exists on disk.
pub const BRIDGE_FILE_NAME: &str = "vue-temp/vue-editor-bridge.ts";

pub const LEGACY_BRIDGE: &str = "import Vue from 'vue';
export interface GeneralOption extends Vue.ComponentOptions<Vue> {
  [key: string]: any
}
export default function bridge<T>(t: T & GeneralOption): T {
  return t;
}";

pub const CURRENT_BRIDGE: &str = "import Vue from 'vue';
const func = Vue.extend;
export default func;";

/// Minimum `(major, minor)` served the current bridge.
pub const DEFAULT_THRESHOLD: (u32, u32) = (2, 5);

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").expect("valid regex"));

/// First `major.minor` pair found in a version requirement such as `^2.5.17`.
pub fn parse_version(requirement: &str) -> Option<(u32, u32)> {
    let caps = VERSION_PATTERN.captures(requirement)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeSchema {
    Legacy,
    Current,
}

impl BridgeSchema {
    pub fn content(self) -> &'static str {
        match self {
            BridgeSchema::Legacy => LEGACY_BRIDGE,
            BridgeSchema::Current => CURRENT_BRIDGE,
        }
    }

    /// Pick the schema for a workspace. Any failure falls back to `Legacy`.
    pub fn detect(workspace: &Path, dependency: &str, threshold: (u32, u32)) -> Self {
        match installed_version(workspace, dependency) {
            Ok(version) if version >= threshold => {
                tracing::debug!(?version, "using current bridge");
                BridgeSchema::Current
            }
            Ok(version) => {
                tracing::debug!(?version, "using legacy bridge");
                BridgeSchema::Legacy
            }
            Err(err) => {
                tracing::warn!(%err, "could not determine framework version, using legacy bridge");
                BridgeSchema::Legacy
            }
        }
    }
}

/// Closest `package.json` at or above `start`.
pub fn find_manifest(start: &Path) -> HostResult<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join("package.json");
        if candidate.is_file() {
            return Ok(candidate);
        }
        current = dir.parent();
    }
    Err(HostError::ManifestNotFound(start.to_path_buf()))
}

fn installed_version(workspace: &Path, dependency: &str) -> HostResult<(u32, u32)> {
    let manifest = find_manifest(workspace)?;
    let text = std::fs::read_to_string(&manifest).map_err(|e| HostError::io(&manifest, e))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| HostError::json(&manifest, e))?;

    let requirement = ["dependencies", "devDependencies"]
        .iter()
        .find_map(|table| json.get(table)?.get(dependency)?.as_str())
        .ok_or_else(|| HostError::MissingDependency {
            dependency: dependency.to_string(),
            path: manifest.clone(),
        })?;

    parse_version(requirement).ok_or_else(|| HostError::Version(requirement.to_string()))
}
