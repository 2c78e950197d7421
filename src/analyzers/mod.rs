pub mod find_exports;
pub mod match_imports;
pub mod match_subclasses;
pub mod result;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::DuplicatePolicy;
use crate::error::{Error, Result};
use crate::index::{ExportIndex, ExportSpecifier};
use crate::parser::heritage::FileHeritage;
use crate::parser::imports::{ImportBinding, ImportKind};
use crate::project::ProjectId;
use crate::resolver::ModuleResolver;

pub use result::{
    AnalyzerQueryResult, MatchEntry, ProjectMatches, QueryResultItem, ResultAccumulator,
};

/// The registered analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerName {
    FindExports,
    MatchSubclasses,
    MatchImports,
}

impl AnalyzerName {
    pub const ALL: [AnalyzerName; 3] = [
        AnalyzerName::FindExports,
        AnalyzerName::MatchSubclasses,
        AnalyzerName::MatchImports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalyzerName::FindExports => "find-exports",
            AnalyzerName::MatchSubclasses => "match-subclasses",
            AnalyzerName::MatchImports => "match-imports",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AnalyzerName::FindExports => "every export of the reference projects",
            AnalyzerName::MatchSubclasses => {
                "target classes extending reference exports, through re-exports and mixins"
            }
            AnalyzerName::MatchImports => {
                "target-project imports that resolve to reference exports"
            }
        }
    }

    /// Whether the analyzer scans target projects at all.
    pub fn scans_targets(self) -> bool {
        !matches!(self, AnalyzerName::FindExports)
    }

    /// Comma-separated list of every analyzer name, for error messages.
    pub fn known_names() -> String {
        Self::ALL
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AnalyzerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyzerName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| Error::UnknownAnalyzer(s.to_owned()))
    }
}

/// Validated analyzer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Record which members a subclass redeclares from its base (`match-subclasses`).
    pub member_overrides: bool,
    pub duplicates: DuplicatePolicy,
}

impl AnalyzerOptions {
    /// Validate the raw `options` map of a query. Unknown keys and wrongly typed values
    /// are configuration errors.
    pub fn from_map(
        analyzer: AnalyzerName,
        options: &BTreeMap<String, serde_json::Value>,
        default_duplicates: DuplicatePolicy,
    ) -> Result<Self> {
        let invalid = |key: &str, reason: &str| Error::InvalidOption {
            analyzer: analyzer.to_string(),
            key: key.to_owned(),
            reason: reason.to_owned(),
        };

        let mut parsed = Self {
            member_overrides: false,
            duplicates: default_duplicates,
        };
        for (key, value) in options {
            match key.as_str() {
                "memberOverrides" if analyzer == AnalyzerName::MatchSubclasses => {
                    parsed.member_overrides = value
                        .as_bool()
                        .ok_or_else(|| invalid(key, "expected a boolean"))?;
                }
                "duplicates" => {
                    parsed.duplicates = serde_json::from_value(value.clone())
                        .map_err(|_| invalid(key, "expected \"keep\" or \"dedupe\""))?;
                }
                _ => return Err(invalid(key, "unknown option")),
            }
        }
        Ok(parsed)
    }
}

/// Heritage extraction output for one target file.
pub struct TargetFile<'a> {
    pub project: ProjectId,
    pub file: &'a str,
    pub heritage: &'a FileHeritage,
}

/// A single match found in one target file, before accumulation.
#[derive(Debug)]
pub struct FileMatch<'a> {
    pub base: &'a ExportSpecifier,
    pub entry: MatchEntry,
}

/// Everything a matcher needs: the finished index, the resolver, and the options.
pub struct MatchContext<'a> {
    pub index: &'a ExportIndex,
    pub resolver: &'a ModuleResolver<'a>,
    pub options: AnalyzerOptions,
    pub max_alias_depth: usize,
}

impl<'a> MatchContext<'a> {
    /// The indexed export an import binding refers to.
    ///
    /// `member` is the property accessed on a namespace import (`ns.RefClass`); it is
    /// required for namespace bindings and must be absent for the others.
    pub fn resolve_binding(
        &self,
        project: ProjectId,
        file: &str,
        binding: &ImportBinding,
        member: Option<&str>,
    ) -> Option<&'a ExportSpecifier> {
        let name = match (binding.kind, member) {
            (ImportKind::Namespace, Some(member)) => member,
            (ImportKind::Named | ImportKind::Default, None) => binding.imported.as_str(),
            _ => return None,
        };
        let module = self.resolver.resolve(&binding.source, project, file).resolved()?;
        self.index.resolve(&module, name)
    }

    /// Run a matcher over every target file in parallel, then reduce in file order.
    ///
    /// Must be called inside the run's thread pool; the reduce is single-writer so the
    /// output does not depend on scheduling.
    pub fn run(
        &self,
        files: &[TargetFile<'_>],
        matcher: fn(&MatchContext<'a>, &TargetFile<'_>) -> Vec<FileMatch<'a>>,
    ) -> Vec<QueryResultItem> {
        let per_file: Vec<Vec<FileMatch<'a>>> =
            files.par_iter().map(|f| matcher(self, f)).collect();

        let projects = self.resolver.projects();
        let mut accumulator = ResultAccumulator::new(self.options.duplicates);
        for (target, matches) in files.iter().zip(per_file) {
            let project = &projects.get(target.project).name;
            for found in matches {
                accumulator.record(found.base, project, found.entry);
            }
        }
        accumulator.into_items()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn test_analyzer_names_roundtrip() {
        for analyzer in AnalyzerName::ALL {
            assert_eq!(analyzer.as_str().parse::<AnalyzerName>().unwrap(), analyzer);
        }
        let err = "match-everything".parse::<AnalyzerName>().unwrap_err();
        assert!(matches!(err, Error::UnknownAnalyzer(ref name) if name == "match-everything"));
        assert!(err.to_string().contains("match-subclasses"));
    }

    #[test]
    fn test_options_parse() {
        let parsed = AnalyzerOptions::from_map(
            AnalyzerName::MatchSubclasses,
            &options(&[("memberOverrides", json!(true)), ("duplicates", json!("dedupe"))]),
            DuplicatePolicy::Keep,
        )
        .unwrap();
        assert!(parsed.member_overrides);
        assert_eq!(parsed.duplicates, DuplicatePolicy::Dedupe);
    }

    #[test]
    fn test_options_default_from_config() {
        let parsed = AnalyzerOptions::from_map(
            AnalyzerName::MatchImports,
            &BTreeMap::new(),
            DuplicatePolicy::Dedupe,
        )
        .unwrap();
        assert!(!parsed.member_overrides);
        assert_eq!(parsed.duplicates, DuplicatePolicy::Dedupe);
    }

    #[test]
    fn test_invalid_options_are_errors() {
        let cases = [
            (AnalyzerName::MatchSubclasses, options(&[("memberOverrides", json!("yes"))])),
            (AnalyzerName::MatchSubclasses, options(&[("duplicates", json!("sometimes"))])),
            (AnalyzerName::MatchSubclasses, options(&[("verbose", json!(true))])),
            (AnalyzerName::FindExports, options(&[("memberOverrides", json!(true))])),
        ];
        for (analyzer, map) in cases {
            let err = AnalyzerOptions::from_map(analyzer, &map, DuplicatePolicy::Keep).unwrap_err();
            assert!(matches!(err, Error::InvalidOption { .. }), "{analyzer}: {err}");
        }
    }
}
