//! Classes in target projects that extend an indexed reference export.
//!
//! Wrapping calls are inspected outer to inner. A wrapper that resolves to a mixin
//! export, or to nothing known, is transparent: `ForeignMixin(Mixin(RefClass))` is
//! recorded against `RefClass`. A wrapper that resolves to an ordinary export is the
//! base itself, as in `createBase(RefClass)`.

use super::{FileMatch, MatchContext, MatchEntry, TargetFile};
use crate::index::ExportSpecifier;
use crate::parser::heritage::{ClassHeritage, FileHeritage, HeritageExpression, HeritageRoot};
use crate::project::ProjectId;

pub fn match_file<'a>(ctx: &MatchContext<'a>, target: &TargetFile<'_>) -> Vec<FileMatch<'a>> {
    target
        .heritage
        .classes
        .iter()
        .filter_map(|class| {
            let base = resolve_expression(ctx, target, &class.heritage, 0)?;
            tracing::trace!(class = %class.class_name, base = %base.id, "subclass matched");
            let member_overrides = ctx
                .options
                .member_overrides
                .then(|| member_overrides(class, base));
            Some(FileMatch {
                base,
                entry: MatchEntry {
                    identifier: class.class_name.clone(),
                    file: target.file.to_owned(),
                    member_overrides,
                },
            })
        })
        .collect()
}

/// The export a heritage expression extends: the first non-mixin wrapper that resolves,
/// else the root. Local aliases (`const Base = Mixin(RefClass)`) are expanded, bounded
/// by the alias depth.
fn resolve_expression<'a>(
    ctx: &MatchContext<'a>,
    target: &TargetFile<'_>,
    expr: &HeritageExpression,
    depth: usize,
) -> Option<&'a ExportSpecifier> {
    for wrapper in &expr.wrappers {
        let Some(root) = HeritageRoot::from_callee(wrapper) else {
            continue;
        };
        let found = resolve_import(ctx, target.project, target.file, target.heritage, &root);
        if let Some(found) = found
            && !found.is_mixin
        {
            return Some(found);
        }
    }

    if target.heritage.import_binding(expr.root.binding_name()).is_some() {
        return resolve_import(ctx, target.project, target.file, target.heritage, &expr.root);
    }
    match (&expr.root, target.heritage.local_alias(expr.root.binding_name())) {
        (HeritageRoot::Identifier(_), Some(alias)) if depth < ctx.max_alias_depth => {
            resolve_expression(ctx, target, alias, depth + 1)
        }
        (HeritageRoot::Identifier(name), Some(_)) => {
            tracing::debug!(
                file = target.file,
                name = %name,
                "local heritage alias chain too deep"
            );
            None
        }
        _ => None,
    }
}

/// The indexed export an imported name (or `ns.Name` of a namespace import) refers to.
fn resolve_import<'a>(
    ctx: &MatchContext<'a>,
    project: ProjectId,
    file: &str,
    heritage: &FileHeritage,
    root: &HeritageRoot,
) -> Option<&'a ExportSpecifier> {
    let binding = heritage.import_binding(root.binding_name())?;
    let member = match root {
        HeritageRoot::Member { property, .. } => Some(property.as_str()),
        HeritageRoot::Identifier(_) => None,
    };
    ctx.resolve_binding(project, file, binding, member)
}

/// Subclass members also declared by the base, in subclass declaration order.
fn member_overrides(class: &ClassHeritage, base: &ExportSpecifier) -> Vec<String> {
    class
        .members
        .iter()
        .filter(|m| base.members.contains(m))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{default_options, run_matcher};
    use crate::analyzers::{AnalyzerOptions, QueryResultItem};
    use crate::config::DuplicatePolicy;
    use crate::project::Project;
    use crate::project::test_support::project;

    const REF: &str = "exporting-ref-project";

    fn reference() -> Project {
        project(
            REF,
            None,
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
                    "export class RefClass extends HTMLElement {\n\
                     render() {} get value() { return 1; } }\n\
                     export default class OtherClass {}",
                ),
            ],
        )
    }

    fn run(targets: Vec<Project>, options: AnalyzerOptions) -> Vec<QueryResultItem> {
        run_matcher(vec![reference()], targets, options, match_file)
    }

    /// `(export id, [(project, identifier, file)])` per item.
    fn flatten(items: &[QueryResultItem]) -> Vec<(String, Vec<(String, String, String)>)> {
        items
            .iter()
            .map(|item| {
                let entries = item
                    .matches_per_project
                    .iter()
                    .flat_map(|g| {
                        g.files
                            .iter()
                            .map(|e| (g.project.clone(), e.identifier.clone(), e.file.clone()))
                    })
                    .collect();
                (item.export_specifier.id.clone(), entries)
            })
            .collect()
    }

    fn entry(project: &str, identifier: &str, file: &str) -> (String, String, String) {
        (project.into(), identifier.into(), file.into())
    }

    #[test]
    fn test_renamed_bare_import_matches_origin() {
        let target = project(
            "importing-target-project",
            None,
            &[(
                "./target-src/a.js",
                "import { RefRenamedClass } from 'exporting-ref-project';\n\
                 export class ExtendedRefClass extends RefRenamedClass {}",
            )],
        );
        let items = run(vec![target], default_options());
        assert_eq!(
            flatten(&items),
            vec![(
                format!("RefClass::./ref-src/core.js::{REF}"),
                vec![entry("importing-target-project", "ExtendedRefClass", "./target-src/a.js")]
            )]
        );
    }

    #[test]
    fn test_default_imports_match_their_own_files() {
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import IndexDefault from 'exporting-ref-project';\n\
                 import CoreDefault from 'exporting-ref-project/ref-src/core.js';\n\
                 class A extends IndexDefault {}\n\
                 class B extends CoreDefault {}",
            )],
        );
        let ids: Vec<String> = flatten(&run(vec![target], default_options()))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(
            ids,
            vec![
                format!("[default]::./index.js::{REF}"),
                format!("[default]::./ref-src/core.js::{REF}")
            ]
        );
    }

    #[test]
    fn test_mixin_chain_matches_root_not_mixin() {
        let target = project(
            "t",
            None,
            &[(
                "./b.js",
                "import { ForeignMixin } from 'foreign-lib';\n\
                 import { Mixin } from 'exporting-ref-project';\n\
                 import { RefClass } from 'exporting-ref-project/ref-src/core.js';\n\
                 export class Wrapped extends ForeignMixin(Mixin(RefClass)) {}",
            )],
        );
        assert_eq!(
            flatten(&run(vec![target], default_options())),
            vec![(
                format!("RefClass::./ref-src/core.js::{REF}"),
                vec![entry("t", "Wrapped", "./b.js")]
            )]
        );
    }

    #[test]
    fn test_direct_mixin_extends_matches_mixin() {
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import { Mixin } from 'exporting-ref-project';\nclass C extends Mixin {}",
            )],
        );
        let items = run(vec![target], default_options());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].export_specifier.id, format!("Mixin::./index.js::{REF}"));
        assert!(items[0].export_specifier.is_mixin);
    }

    #[test]
    fn test_unknown_and_unimported_roots_do_not_match() {
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import { RefClass } from 'unknown-project';\n\
                 class Local {}\n\
                 class A extends RefClass {}\n\
                 class B extends Local {}\n\
                 class C extends HTMLElement {}",
            )],
        );
        assert!(run(vec![target], default_options()).is_empty());
    }

    #[test]
    fn test_namespace_member_and_local_alias() {
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import * as ref from 'exporting-ref-project';\n\
                 import { Mixin } from 'exporting-ref-project';\n\
                 const Base = Mixin(ref.RefRenamedClass);\n\
                 class A extends ref.RefRenamedClass {}\n\
                 class B extends Base {}",
            )],
        );
        assert_eq!(
            flatten(&run(vec![target], default_options())),
            vec![(
                format!("RefClass::./ref-src/core.js::{REF}"),
                vec![entry("t", "A", "./a.js"), entry("t", "B", "./a.js")]
            )]
        );
    }

    #[test]
    fn test_grouping_follows_target_project_order() {
        let first = project(
            "first",
            None,
            &[(
                "./a.js",
                "import { RefRenamedClass as R } from 'exporting-ref-project';\n\
                 class One extends R {}",
            )],
        );
        let second = project(
            "second",
            None,
            &[(
                "./a.js",
                "import { RefRenamedClass as R } from 'exporting-ref-project';\n\
                 class Two extends R {}",
            )],
        );
        let items = run(vec![first, second], default_options());
        assert_eq!(items.len(), 1);
        let groups: Vec<_> = items[0]
            .matches_per_project
            .iter()
            .map(|g| g.project.as_str())
            .collect();
        assert_eq!(groups, vec!["first", "second"]);
    }

    #[test]
    fn test_member_overrides() {
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import { RefRenamedClass } from 'exporting-ref-project';\n\
                 class A extends RefRenamedClass {\n\
                 constructor() { super(); } get value() { return 2; } extra() {} render() {} }",
            )],
        );
        let options = AnalyzerOptions {
            member_overrides: true,
            duplicates: DuplicatePolicy::Keep,
        };
        let items = run(vec![target], options);
        let entry = &items[0].matches_per_project[0].files[0];
        assert_eq!(entry.member_overrides, Some(vec!["value".to_string(), "render".to_string()]));
    }

    #[test]
    fn test_non_mixin_wrapper_is_the_base() {
        let reference = project(
            "ref",
            None,
            &[
                (
                    "./index.js",
                    "export class RefClass {}\n\
                     export function createBase(base, flags) { return class extends base {}; }\n\
                     export const Mixin = superclass => class extends superclass {};",
                ),
            ],
        );
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import { RefClass, createBase, Mixin } from 'ref';\n\
                 import { Foreign } from 'foreign-lib';\n\
                 class Built extends createBase(RefClass, 1) {}\n\
                 class Mixed extends Foreign(Mixin(createBase(RefClass, 2))) {}\n\
                 class Plain extends Foreign(Mixin(RefClass)) {}",
            )],
        );
        let items = run_matcher(vec![reference], vec![target], default_options(), match_file);
        assert_eq!(
            flatten(&items),
            vec![
                (
                    "createBase::./index.js::ref".to_string(),
                    vec![entry("t", "Built", "./a.js"), entry("t", "Mixed", "./a.js")]
                ),
                ("RefClass::./index.js::ref".to_string(), vec![entry("t", "Plain", "./a.js")]),
            ]
        );
    }

    #[test]
    fn test_local_alias_wrappers_are_inspected() {
        let reference = project(
            "ref",
            None,
            &[(
                "./index.js",
                "export class RefClass {}\nexport function createBase(base) { return base; }",
            )],
        );
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import * as lib from 'ref';\n\
                 const Base = lib.createBase(lib.RefClass);\n\
                 class A extends Base {}",
            )],
        );
        let items = run_matcher(vec![reference], vec![target], default_options(), match_file);
        assert_eq!(
            flatten(&items),
            vec![("createBase::./index.js::ref".to_string(), vec![entry("t", "A", "./a.js")])]
        );
    }

    #[test]
    fn test_export_clause_of_import_keeps_origin_id() {
        let reference = project(
            "ref",
            None,
            &[
                (
                    "./index.js",
                    "import { RefClass } from './core.js';\nexport { RefClass as Renamed };",
                ),
                ("./core.js", "export class RefClass {}"),
            ],
        );
        let target = project(
            "t",
            None,
            &[(
                "./a.js",
                "import { Renamed } from 'ref';\nclass C extends Renamed {}",
            )],
        );
        let items = run_matcher(vec![reference], vec![target], default_options(), match_file);
        assert_eq!(
            flatten(&items),
            vec![("RefClass::./core.js::ref".to_string(), vec![entry("t", "C", "./a.js")])]
        );
    }
}
