//! Path helpers shared by the document model and the host.
//!
//! The host keys everything by normalized, forward-slash path strings so
//! that `.vue` <-> `.vue.ts` rewriting is plain string surgery.

use std::path::Path;

use tower_lsp::lsp_types::Url;

/// Extension of composite component files.
pub const COMPOSITE_EXTENSION: &str = ".vue";

/// Suffix appended to composite files in the resolver's file-system view.
pub const COMPOSITE_SUFFIX: &str = ".ts";

pub fn is_composite(file_name: &str) -> bool {
    file_name.ends_with(COMPOSITE_EXTENSION)
}

/// Is this a `X.vue.ts` name from the composite view?
///
/// Files under `node_modules` are never virtualized.
pub fn is_composite_view_name(file_name: &str) -> bool {
    file_name.ends_with(".vue.ts") && !file_name.contains("node_modules")
}

/// `X.vue.ts` -> `X.vue`.
pub fn strip_composite_suffix(file_name: &str) -> &str {
    file_name
        .strip_suffix(COMPOSITE_SUFFIX)
        .unwrap_or(file_name)
}

/// `X.vue` -> `X.vue.ts`.
pub fn add_composite_suffix(file_name: &str) -> String {
    format!("{file_name}{COMPOSITE_SUFFIX}")
}

/// Normalize separators and collapse `.` / `..` segments.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

pub fn from_path(path: &Path) -> String {
    normalize(&path.to_string_lossy())
}

pub fn file_name_from_uri(uri: &Url) -> String {
    match uri.to_file_path() {
        Ok(path) => from_path(&path),
        Err(()) => normalize(uri.path()),
    }
}

/// Parent directory of a normalized path (`/` for top-level files).
pub fn directory_of(file_name: &str) -> &str {
    match file_name.rfind('/') {
        Some(0) => "/",
        Some(idx) => &file_name[..idx],
        None => ".",
    }
}

pub fn join(dir: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        return normalize(relative);
    }
    normalize(&format!("{dir}/{relative}"))
}

pub fn is_absolute(name: &str) -> bool {
    name.starts_with('/') || Path::new(name).is_absolute()
}

pub fn is_relative_specifier(name: &str) -> bool {
    name.starts_with("./") || name.starts_with("../") || name == "." || name == ".."
}
