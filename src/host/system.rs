//! File-system views used by the host and its module resolver.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::document::script_view;
use crate::paths::{self, is_composite_view_name, strip_composite_suffix};

/// Default export served for component scripts that are missing or blank.
pub const PLACEHOLDER_SCRIPT: &str = "export default {};";

/// The file-system operations the compiler service may call on its host.
///
/// All paths are normalized, forward-slash strings.
pub trait System: Send + Sync {
    fn file_exists(&self, path: &str) -> bool;
    fn read_file(&self, path: &str) -> Option<String>;
    fn directory_exists(&self, path: &str) -> bool;
    fn get_directories(&self, path: &str) -> Vec<String>;
    /// Files under `path` whose names end in one of `extensions`, recursing
    /// at most `depth` levels when given.
    fn read_directory(&self, path: &str, extensions: &[&str], depth: Option<usize>) -> Vec<String>;
    fn realpath(&self, path: &str) -> String;
}

/// The process file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSystem;

impl System for RealSystem {
    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn read_file(&self, path: &str) -> Option<String> {
        match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::debug!(path, %err, "read failed");
                None
            }
        }
    }

    fn directory_exists(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn get_directories(&self, path: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(path) else {
            return Vec::new();
        };
        let mut dirs: Vec<String> = entries
            .flatten()
            .filter(|e| e.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        dirs.sort();
        dirs
    }

    fn read_directory(&self, path: &str, extensions: &[&str], depth: Option<usize>) -> Vec<String> {
        let mut walker = WalkDir::new(path).follow_links(true).sort_by_file_name();
        if let Some(depth) = depth {
            walker = walker.max_depth(depth);
        }
        walker
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| paths::from_path(e.path()))
            .filter(|name| extensions.is_empty() || extensions.iter().any(|ext| name.ends_with(ext)))
            .collect()
    }

    fn realpath(&self, path: &str) -> String {
        fs::canonicalize(path)
            .map(|p| paths::from_path(&p))
            .unwrap_or_else(|_| path.to_string())
    }
}

/// View in which every component `X.vue` also appears as a script `X.vue.ts`.
///
/// Reading `X.vue.ts` yields the masked script of `X.vue`. Files under
/// `node_modules` are never virtualized.
pub struct CompositeSystem {
    inner: Box<dyn System>,
}

impl CompositeSystem {
    pub fn new(inner: Box<dyn System>) -> Self {
        Self { inner }
    }

    /// The underlying file system, without the composite names.
    pub fn inner(&self) -> &dyn System {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for CompositeSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeSystem").finish_non_exhaustive()
    }
}

impl System for CompositeSystem {
    fn file_exists(&self, path: &str) -> bool {
        if is_composite_view_name(path) {
            return self.inner.file_exists(strip_composite_suffix(path));
        }
        self.inner.file_exists(path)
    }

    fn read_file(&self, path: &str) -> Option<String> {
        if is_composite_view_name(path) {
            let text = self.inner.read_file(strip_composite_suffix(path))?;
            let view = script_view(&text);
            if view.text.trim().is_empty() {
                return Some(PLACEHOLDER_SCRIPT.to_string());
            }
            return Some(view.text);
        }
        self.inner.read_file(path)
    }

    fn directory_exists(&self, path: &str) -> bool {
        self.inner.directory_exists(path)
    }

    fn get_directories(&self, path: &str) -> Vec<String> {
        self.inner.get_directories(path)
    }

    fn read_directory(&self, path: &str, extensions: &[&str], depth: Option<usize>) -> Vec<String> {
        let mut files = self.inner.read_directory(path, extensions, depth);
        if extensions.contains(&".ts") {
            let components = self.inner.read_directory(path, &[".vue"], depth);
            files.extend(
                components
                    .iter()
                    .filter(|name| !name.contains("node_modules"))
                    .map(|name| paths::add_composite_suffix(name)),
            );
        }
        files
    }

    fn realpath(&self, path: &str) -> String {
        if is_composite_view_name(path) {
            let real = self.inner.realpath(strip_composite_suffix(path));
            return paths::add_composite_suffix(&real);
        }
        self.inner.realpath(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// In-memory file system keyed by absolute path.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct MemorySystem {
        files: BTreeMap<String, String>,
    }

    impl MemorySystem {
        pub(crate) fn with(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, t)| (p.to_string(), t.to_string()))
                    .collect(),
            }
        }
    }

    impl System for MemorySystem {
        fn file_exists(&self, path: &str) -> bool {
            self.files.contains_key(path)
        }

        fn read_file(&self, path: &str) -> Option<String> {
            self.files.get(path).cloned()
        }

        fn directory_exists(&self, path: &str) -> bool {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            self.files.keys().any(|k| k.starts_with(&prefix))
        }

        fn get_directories(&self, path: &str) -> Vec<String> {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            let mut dirs: Vec<String> = self
                .files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
                .collect();
            dirs.dedup();
            dirs
        }

        fn read_directory(&self, path: &str, extensions: &[&str], _depth: Option<usize>) -> Vec<String> {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            self.files
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .filter(|k| extensions.is_empty() || extensions.iter().any(|e| k.ends_with(e)))
                .cloned()
                .collect()
        }

        fn realpath(&self, path: &str) -> String {
            path.to_string()
        }
    }

    fn composite() -> CompositeSystem {
        CompositeSystem::new(Box::new(MemorySystem::with(&[
            ("/p/src/App.vue", "<template><p/></template><script>export default { a: 1 }</script>"),
            ("/p/src/Empty.vue", "<template><p/></template>"),
            ("/p/src/main.ts", "import App from './App.vue'"),
            ("/p/node_modules/lib/Button.vue", "<script>export default {}</script>"),
        ])))
    }

    #[test]
    fn composite_names_exist_for_components() {
        let sys = composite();
        assert!(sys.file_exists("/p/src/App.vue.ts"));
        assert!(sys.file_exists("/p/src/App.vue"));
        assert!(!sys.file_exists("/p/src/Missing.vue.ts"));
        assert!(!sys.file_exists("/p/node_modules/lib/Button.vue.ts"));
    }

    #[test]
    fn composite_read_is_masked_script() {
        let sys = composite();
        let text = sys.read_file("/p/src/App.vue.ts").unwrap();
        assert_eq!(text.len(), sys.inner().read_file("/p/src/App.vue").unwrap().len());
        assert!(text.trim_start().starts_with("export default { a: 1 }"));
        assert_eq!(
            sys.read_file("/p/src/Empty.vue.ts").as_deref(),
            Some(PLACEHOLDER_SCRIPT)
        );
    }

    #[test]
    fn composite_directory_listing() {
        let sys = composite();
        let files = sys.read_directory("/p/src", &[".ts"], None);
        assert!(files.contains(&"/p/src/main.ts".to_string()));
        assert!(files.contains(&"/p/src/App.vue.ts".to_string()));
        assert!(files.contains(&"/p/src/Empty.vue.ts".to_string()));
    }

    #[test]
    fn real_system_lists_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/x.ts"), "").unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();
        fs::write(dir.path().join("c.md"), "").unwrap();

        let root = paths::from_path(dir.path());
        let files: Vec<String> = RealSystem
            .read_directory(&root, &[".ts"], None)
            .into_iter()
            .map(|f| f[root.len()..].to_string())
            .collect();
        assert_eq!(files, vec!["/a.ts", "/b/x.ts"]);
        assert_eq!(RealSystem.get_directories(&root), vec!["b"]);
    }
}
