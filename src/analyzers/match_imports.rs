//! Named and default imports in target projects that resolve to an indexed export.
//! Namespace imports bind a module object rather than an export and are not matched.

use super::{FileMatch, MatchContext, MatchEntry, TargetFile};
use crate::parser::imports::ImportKind;

pub fn match_file<'a>(ctx: &MatchContext<'a>, target: &TargetFile<'_>) -> Vec<FileMatch<'a>> {
    target
        .heritage
        .imports
        .iter()
        .filter(|binding| binding.kind != ImportKind::Namespace)
        .filter_map(|binding| {
            let base = ctx.resolve_binding(target.project, target.file, binding, None)?;
            Some(FileMatch {
                base,
                entry: MatchEntry {
                    identifier: binding.local.clone(),
                    file: target.file.to_owned(),
                    member_overrides: None,
                },
            })
        })
        .collect()
}
