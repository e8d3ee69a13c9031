//! Node-style module resolution over a [`System`].

use serde::Deserialize;

use super::system::System;
use crate::paths;
use crate::script::Extension;

/// Where an import specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: String,
    pub extension: Extension,
    /// Found through `node_modules`.
    pub is_external_library_import: bool,
}

/// The fields of a package manifest that point at an entry file.
#[derive(Debug, Default, Deserialize)]
struct PackageEntry {
    types: Option<String>,
    typings: Option<String>,
    main: Option<String>,
}

/// Resolves relative, absolute and bare specifiers the way Node and the
/// TypeScript compiler do.
#[derive(Debug, Clone, Copy)]
pub struct ModuleResolver {
    allow_js: bool,
}

impl ModuleResolver {
    pub fn new(allow_js: bool) -> Self {
        Self { allow_js }
    }

    fn extensions(&self, types_only: bool) -> &'static [Extension] {
        if self.allow_js && !types_only {
            &[
                Extension::Ts,
                Extension::Tsx,
                Extension::Dts,
                Extension::Js,
                Extension::Jsx,
            ]
        } else {
            &[Extension::Ts, Extension::Tsx, Extension::Dts]
        }
    }

    pub fn resolve(
        &self,
        name: &str,
        containing_file: &str,
        system: &dyn System,
    ) -> Option<ResolvedModule> {
        let directory = paths::directory_of(containing_file);

        if paths::is_relative_specifier(name) || paths::is_absolute(name) {
            let candidate = paths::join(directory, name);
            return self
                .load_as_file(&candidate, system, false)
                .or_else(|| self.load_as_directory(&candidate, system, false))
                .map(|(file, extension)| ResolvedModule {
                    resolved_file_name: file,
                    extension,
                    is_external_library_import: false,
                });
        }

        self.load_from_node_modules(name, directory, system)
    }

    fn load_from_node_modules(
        &self,
        name: &str,
        start: &str,
        system: &dyn System,
    ) -> Option<ResolvedModule> {
        let mut current = Some(start.to_string());
        while let Some(dir) = current {
            let modules = paths::join(&dir, "node_modules");
            if system.directory_exists(&modules) {
                let lookups = [
                    (paths::join(&modules, name), false),
                    (paths::join(&modules, &format!("@types/{name}")), true),
                ];
                for (candidate, types_only) in lookups {
                    let found = self
                        .load_as_file(&candidate, system, types_only)
                        .or_else(|| self.load_as_directory(&candidate, system, types_only));
                    if let Some((file, extension)) = found {
                        return Some(ResolvedModule {
                            resolved_file_name: file,
                            extension,
                            is_external_library_import: true,
                        });
                    }
                }
            }
            current = match paths::directory_of(&dir) {
                parent if parent == dir || parent == "." => None,
                parent => Some(parent.to_string()),
            };
        }
        None
    }

    fn load_as_file(
        &self,
        candidate: &str,
        system: &dyn System,
        types_only: bool,
    ) -> Option<(String, Extension)> {
        let extensions = self.extensions(types_only);

        if let Some(ext) = Extension::from_file_name(candidate) {
            if extensions.contains(&ext) && system.file_exists(candidate) {
                return Some((candidate.to_string(), ext));
            }
        }

        extensions.iter().find_map(|ext| {
            let file = format!("{candidate}{}", ext.as_str());
            system.file_exists(&file).then_some((file, *ext))
        })
    }

    fn load_as_directory(
        &self,
        candidate: &str,
        system: &dyn System,
        types_only: bool,
    ) -> Option<(String, Extension)> {
        if !system.directory_exists(candidate) {
            return None;
        }

        let manifest = paths::join(candidate, "package.json");
        if let Some(text) = system.read_file(&manifest) {
            match serde_json::from_str::<PackageEntry>(&text) {
                Ok(entry) => {
                    let main = if types_only || !self.allow_js {
                        None
                    } else {
                        entry.main
                    };
                    for field in [entry.types, entry.typings, main].into_iter().flatten() {
                        let target = paths::join(candidate, &field);
                        let found = self
                            .load_as_file(&target, system, types_only)
                            .or_else(|| self.load_index(&target, system, types_only));
                        if found.is_some() {
                            return found;
                        }
                    }
                }
                Err(err) => tracing::debug!(manifest = %manifest, %err, "ignoring unreadable package manifest"),
            }
        }

        self.load_index(candidate, system, types_only)
    }

    fn load_index(
        &self,
        directory: &str,
        system: &dyn System,
        types_only: bool,
    ) -> Option<(String, Extension)> {
        self.load_as_file(&paths::join(directory, "index"), system, types_only)
    }
}
