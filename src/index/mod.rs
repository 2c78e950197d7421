use std::collections::HashMap;

use serde::Serialize;

use crate::parser::DEFAULT_NAME;
use crate::parser::exports::{ExportDeclaration, FileExports};
use crate::project::ProjectId;
use crate::resolver::{ModuleRef, ModuleResolver};
use crate::warning::{Warning, WarningKind};

/// A concrete export of a reference project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpecifier {
    /// Exported name; [`DEFAULT_NAME`] for default exports.
    pub name: String,
    pub file_path: String,
    pub project: String,
    /// `name::filePath::project`
    pub id: String,
    pub is_mixin: bool,
    /// Method / field names when the export is a class.
    #[serde(skip)]
    pub members: Vec<String>,
}

/// The stable id format `<name>::<relativeFilePath>::<projectName>`.
pub fn format_id(name: &str, file_path: &str, project: &str) -> String {
    format!("{name}::{file_path}::{project}")
}

/// Extraction output for one reference file, as fed to [`ExportIndex::build`].
pub struct IndexedFile<'a> {
    pub project: ProjectId,
    pub file: &'a str,
    pub exports: &'a FileExports,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExportKey {
    module: ModuleRef,
    name: String,
}

impl ExportKey {
    fn new(project: ProjectId, file: &str, name: &str) -> Self {
        Self {
            module: ModuleRef {
                project,
                file: file.to_owned(),
            },
            name: name.to_owned(),
        }
    }
}

/// Why an alias chain could not be followed to a physical export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasFailure {
    Cycle,
    DepthExceeded,
}

/// Every physical export of the reference projects, plus the re-export alias graph
/// layered on top of them.
///
/// Re-exports never create an identity of their own: looking up a re-exported name walks
/// the alias edges (bounded by `max_depth`) to the physical export it names.
#[derive(Debug, Default)]
pub struct ExportIndex {
    specifiers: Vec<ExportSpecifier>,
    by_id: HashMap<String, usize>,
    physical: HashMap<ExportKey, usize>,
    aliases: HashMap<ExportKey, ExportKey>,
    /// `export * from` edges per module, in declaration order.
    stars: HashMap<ModuleRef, Vec<ModuleRef>>,
    max_depth: usize,
}

impl ExportIndex {
    /// Assemble the index from per-file extraction results, in project / file order.
    ///
    /// Runs single-threaded after parallel extraction. Every named alias is followed
    /// once here, so cycles and over-long chains are reported as warnings exactly once.
    pub fn build(
        files: &[IndexedFile<'_>],
        resolver: &ModuleResolver<'_>,
        max_depth: usize,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let projects = resolver.projects();
        let mut index = Self {
            max_depth,
            ..Self::default()
        };
        let mut alias_order = Vec::new();

        for indexed in files {
            let project = &projects.get(indexed.project).name;
            for decl in &indexed.exports.declarations {
                match decl {
                    ExportDeclaration::Local {
                        name,
                        mixin,
                        members,
                    } => {
                        let key = ExportKey::new(indexed.project, indexed.file, name);
                        if index.physical.contains_key(&key) {
                            tracing::debug!(
                                project = %project,
                                file = indexed.file,
                                name = %name,
                                "duplicate export ignored"
                            );
                            continue;
                        }
                        let id = format_id(name, indexed.file, project);
                        let position = index.specifiers.len();
                        index.by_id.insert(id.clone(), position);
                        index.physical.insert(key, position);
                        index.specifiers.push(ExportSpecifier {
                            name: name.clone(),
                            file_path: indexed.file.to_owned(),
                            project: project.clone(),
                            id,
                            is_mixin: *mixin,
                            members: members.clone(),
                        });
                    }
                    ExportDeclaration::ReExport {
                        name,
                        imported,
                        source,
                    } => {
                        let resolution = resolver.resolve(source, indexed.project, indexed.file);
                        let Some(target) = resolution.resolved() else {
                            continue;
                        };
                        let key = ExportKey::new(indexed.project, indexed.file, name);
                        if index.aliases.contains_key(&key) {
                            continue;
                        }
                        alias_order.push(key.clone());
                        index.aliases.insert(
                            key,
                            ExportKey {
                                module: target,
                                name: imported.clone(),
                            },
                        );
                    }
                    ExportDeclaration::ReExportAll { source } => {
                        let resolution = resolver.resolve(source, indexed.project, indexed.file);
                        if let Some(target) = resolution.resolved() {
                            index
                                .stars
                                .entry(ModuleRef {
                                    project: indexed.project,
                                    file: indexed.file.to_owned(),
                                })
                                .or_default()
                                .push(target);
                        }
                    }
                }
            }
        }

        for key in &alias_order {
            if index.physical.contains_key(key) {
                // Shadowed by a physical export of the same name.
                continue;
            }
            let mut path = Vec::new();
            if let Err(failure) = index.walk(key, 0, &mut path) {
                let (kind, reason) = match failure {
                    AliasFailure::Cycle => (WarningKind::AliasCycle, "re-export cycle".to_owned()),
                    AliasFailure::DepthExceeded => (
                        WarningKind::AliasDepthExceeded,
                        format!("re-export chain longer than {max_depth}"),
                    ),
                };
                warnings.push(Warning::new(
                    kind,
                    &projects.get(key.module.project).name,
                    Some(&key.module.file),
                    format!("{reason} while resolving {:?}", key.name),
                ));
            }
        }

        tracing::info!(
            exports = index.specifiers.len(),
            aliases = index.aliases.len(),
            "export index built"
        );
        index
    }

    /// Every physical export, in project / file / declaration order.
    pub fn specifiers(&self) -> &[ExportSpecifier] {
        &self.specifiers
    }

    pub fn len(&self) -> usize {
        self.specifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    /// The export with the given id. Ids only ever name physical exports.
    pub fn lookup(&self, id: &str) -> Option<&ExportSpecifier> {
        self.by_id.get(id).map(|&i| &self.specifiers[i])
    }

    /// The canonical export that `name`, imported from `module`, refers to.
    ///
    /// Follows re-export aliases and `export *` edges. Cycles and chains deeper than
    /// the configured bound resolve to `None`.
    pub fn resolve(&self, module: &ModuleRef, name: &str) -> Option<&ExportSpecifier> {
        let key = ExportKey {
            module: module.clone(),
            name: name.to_owned(),
        };
        match self.walk(&key, 0, &mut Vec::new()) {
            Ok(found) => found.map(|i| &self.specifiers[i]),
            Err(_) => None,
        }
    }

    /// Depth-bounded walk from `key` to a physical export. `path` holds the keys on the
    /// current chain for cycle detection.
    fn walk(
        &self,
        key: &ExportKey,
        depth: usize,
        path: &mut Vec<ExportKey>,
    ) -> Result<Option<usize>, AliasFailure> {
        if let Some(&position) = self.physical.get(key) {
            return Ok(Some(position));
        }
        if path.contains(key) {
            return Err(AliasFailure::Cycle);
        }
        if depth >= self.max_depth {
            return Err(AliasFailure::DepthExceeded);
        }

        path.push(key.clone());
        let result = if let Some(target) = self.aliases.get(key) {
            self.walk(target, depth + 1, path)
        } else {
            Ok(self.walk_stars(key, depth, path))
        };
        path.pop();
        result
    }

    /// `export *` never forwards the default export. Star graphs may legally be cyclic,
    /// so failures along a star edge just mean "not found there".
    fn walk_stars(
        &self,
        key: &ExportKey,
        depth: usize,
        path: &mut Vec<ExportKey>,
    ) -> Option<usize> {
        if key.name == DEFAULT_NAME {
            return None;
        }
        let targets = self.stars.get(&key.module)?;
        targets.iter().find_map(|module| {
            let next = ExportKey {
                module: module.clone(),
                name: key.name.clone(),
            };
            self.walk(&next, depth + 1, path).ok().flatten()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MixinDetection;
    use crate::parser::exports::extract_exports;
    use crate::parser::parse_source;
    use crate::project::ProjectSet;
    use crate::project::test_support::project;

    /// Parse every file of every project and build an index over all of them.
    fn build(set: &ProjectSet, max_depth: usize) -> (ExportIndex, Vec<Warning>) {
        let mut extracted = Vec::new();
        for (id, p) in set.projects().iter().enumerate() {
            for f in p.files() {
                let tree = parse_source(&f.relative_path, f.text.as_bytes()).unwrap();
                let exports = extract_exports(&tree, f.text.as_bytes(), MixinDetection::Strict);
                extracted.push((id, f.relative_path.as_str(), exports));
            }
        }
        let files: Vec<IndexedFile> = extracted
            .iter()
            .map(|(project, file, exports)| IndexedFile {
                project: *project,
                file,
                exports,
            })
            .collect();
        let resolver = ModuleResolver::new(set);
        let mut warnings = Vec::new();
        let index = ExportIndex::build(&files, &resolver, max_depth, &mut warnings);
        (index, warnings)
    }

    fn single(name: &str, files: &[(&str, &str)]) -> ProjectSet {
        ProjectSet::from_projects(vec![project(name, None, files)], vec![], &mut Vec::new())
    }

    fn module(file: &str) -> ModuleRef {
        ModuleRef {
            project: 0,
            file: file.to_owned(),
        }
    }

    fn scenario() -> ProjectSet {
        single(
            "exporting-ref-project",
            &[
                (
                    "./index.js",
                    "export { RefClass as RefRenamedClass } from './ref-src/core.js';\n\
                     import refConstImported from './ref-src/core.js';\n\
                     export default refConstImported;\n\
                     export const Mixin = superclass => class MyMixin extends superclass {};",
                ),
                (
                    "./ref-src/core.js",
                    "export class RefClass extends HTMLElement { render() {} }\n\
                     export default class OtherClass {}",
                ),
            ],
        )
    }

    #[test]
    fn test_scenario_ids() {
        let (index, warnings) = build(&scenario(), 16);
        let ids: Vec<&str> = index.specifiers().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "[default]::./index.js::exporting-ref-project",
                "Mixin::./index.js::exporting-ref-project",
                "RefClass::./ref-src/core.js::exporting-ref-project",
                "[default]::./ref-src/core.js::exporting-ref-project",
            ]
        );
        assert!(warnings.is_empty());
        assert!(index.lookup("Mixin::./index.js::exporting-ref-project").unwrap().is_mixin);
        assert!(index.lookup("RefRenamedClass::./index.js::exporting-ref-project").is_none());
    }

    #[test]
    fn test_renamed_reexport_resolves_to_origin() {
        let (index, _) = build(&scenario(), 16);
        let found = index.resolve(&module("./index.js"), "RefRenamedClass").unwrap();
        assert_eq!(found.id, "RefClass::./ref-src/core.js::exporting-ref-project");
        assert_eq!(found.members, vec!["render"]);
    }

    #[test]
    fn test_multi_hop_and_star_reexports() {
        let set = single(
            "pkg",
            &[
                ("./index.js", "export * from './mid.js';"),
                ("./mid.js", "export { Base as Middle } from './base.js';\nexport default 1;"),
                ("./base.js", "export class Base {}"),
            ],
        );
        let (index, warnings) = build(&set, 16);
        assert!(warnings.is_empty());
        assert_eq!(
            index.resolve(&module("./index.js"), "Middle").unwrap().id,
            "Base::./base.js::pkg"
        );
        // `export *` does not forward defaults.
        assert!(index.resolve(&module("./index.js"), DEFAULT_NAME).is_none());
        assert!(index.resolve(&module("./index.js"), "Nope").is_none());
    }

    #[test]
    fn test_alias_cycle_is_a_warning() {
        let set = single(
            "pkg",
            &[
                ("./a.js", "export { X } from './b.js';"),
                ("./b.js", "export { X } from './a.js';"),
            ],
        );
        let (index, warnings) = build(&set, 16);
        assert!(index.resolve(&module("./a.js"), "X").is_none());
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.kind == WarningKind::AliasCycle));
    }

    #[test]
    fn test_star_cycles_are_silent() {
        let set = single(
            "pkg",
            &[
                ("./a.js", "export * from './b.js';\nexport const A = 1;"),
                ("./b.js", "export * from './a.js';"),
            ],
        );
        let (index, warnings) = build(&set, 16);
        assert!(warnings.is_empty());
        assert_eq!(index.resolve(&module("./b.js"), "A").unwrap().id, "A::./a.js::pkg");
        assert!(index.resolve(&module("./b.js"), "Missing").is_none());
    }

    #[test]
    fn test_depth_bound() {
        let set = single(
            "pkg",
            &[
                ("./a.js", "export { X } from './b.js';"),
                ("./b.js", "export { X } from './c.js';"),
                ("./c.js", "export const X = 1;"),
            ],
        );
        let (index, warnings) = build(&set, 1);
        assert!(index.resolve(&module("./a.js"), "X").is_none());
        assert!(index.resolve(&module("./b.js"), "X").is_some());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::AliasDepthExceeded);
        assert_eq!(warnings[0].file.as_deref(), Some("./a.js"));
    }

    #[test]
    fn test_same_name_in_two_projects_does_not_collide() {
        let set = ProjectSet::from_projects(
            vec![
                project("one", None, &[("./index.js", "export class Base {}")]),
                project("two", None, &[("./index.js", "export class Base {}")]),
            ],
            vec![],
            &mut Vec::new(),
        );
        let (index, _) = build(&set, 16);
        assert_eq!(index.len(), 2);
        assert!(index.lookup("Base::./index.js::one").is_some());
        assert!(index.lookup("Base::./index.js::two").is_some());
    }

    #[test]
    fn test_foreign_reexport_source_is_dropped() {
        let set = single("pkg", &[("./index.js", "export { html } from 'lit';")]);
        let (index, warnings) = build(&set, 16);
        assert!(index.is_empty());
        assert!(warnings.is_empty());
        assert!(index.resolve(&module("./index.js"), "html").is_none());
    }
}
