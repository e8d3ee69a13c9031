//! Error type for the recoverable failures inside the host.
//!
//! Nothing in this crate surfaces these to callers: every public operation
//! falls back to a neutral value. They exist so helpers can use `?` and the
//! fallback sites can log what went wrong.

use std::path::PathBuf;

/// Failures encountered while reading project inputs.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON manifest or project config could not be parsed.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A settings file could not be parsed.
    #[error("invalid settings in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No manifest was found above the workspace.
    #[error("no package.json found above {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// The manifest does not declare the dependency.
    #[error("`{dependency}` is not declared in {}", path.display())]
    MissingDependency { dependency: String, path: PathBuf },

    /// A version string did not contain a `major.minor` pair.
    #[error("unrecognized version string `{0}`")]
    Version(String),
}

/// Result type for host helpers.
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
