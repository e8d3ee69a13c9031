//! Script kinds and module extensions as the compiler service sees them.

use oxc_span::SourceType;

/// Flavor of script a file is analyzed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
    Unknown,
}

impl ScriptKind {
    /// Kind implied by a script block's language id.
    pub fn from_language_id(language_id: &str) -> Self {
        match language_id {
            "typescript" => ScriptKind::Ts,
            "tsx" => ScriptKind::Tsx,
            "jsx" => ScriptKind::Jsx,
            _ => ScriptKind::Js,
        }
    }

    /// Kind implied by a plain file's extension.
    pub fn from_file_name(file_name: &str) -> Self {
        match Extension::from_file_name(file_name) {
            Some(Extension::Ts | Extension::Dts) => ScriptKind::Ts,
            Some(Extension::Tsx) => ScriptKind::Tsx,
            Some(Extension::Js) => ScriptKind::Js,
            Some(Extension::Jsx) => ScriptKind::Jsx,
            Some(Extension::Json) => ScriptKind::Json,
            None => ScriptKind::Unknown,
        }
    }

    pub fn is_ts_like(self) -> bool {
        matches!(self, ScriptKind::Ts | ScriptKind::Tsx)
    }

    /// Parser configuration for this kind. Unknown kinds parse as modules.
    pub fn source_type(self) -> SourceType {
        match self {
            ScriptKind::Ts => SourceType::ts(),
            ScriptKind::Tsx => SourceType::tsx(),
            ScriptKind::Jsx => SourceType::mjs().with_jsx(true),
            ScriptKind::Js | ScriptKind::Json | ScriptKind::Unknown => SourceType::mjs(),
        }
    }
}

/// Extension of a resolved module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Ts,
    Tsx,
    Dts,
    Js,
    Jsx,
    Json,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Ts => ".ts",
            Extension::Tsx => ".tsx",
            Extension::Dts => ".d.ts",
            Extension::Js => ".js",
            Extension::Jsx => ".jsx",
            Extension::Json => ".json",
        }
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        // `.d.ts` must be checked before `.ts`.
        [
            Extension::Dts,
            Extension::Ts,
            Extension::Tsx,
            Extension::Js,
            Extension::Jsx,
            Extension::Json,
        ]
        .into_iter()
        .find(|ext| file_name.ends_with(ext.as_str()))
    }

    /// Extension reported for a `.vue` module with the given script kind.
    pub fn for_composite(kind: ScriptKind) -> Self {
        match kind {
            ScriptKind::Ts => Extension::Ts,
            ScriptKind::Tsx => Extension::Tsx,
            ScriptKind::Jsx => Extension::Jsx,
            _ => Extension::Js,
        }
    }

    pub fn is_ts_like(self) -> bool {
        matches!(self, Extension::Ts | Extension::Tsx | Extension::Dts)
    }
}
