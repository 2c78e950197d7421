use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::AnalyzerName;
use crate::config::DuplicatePolicy;
use crate::index::ExportSpecifier;
use crate::warning::Warning;

/// One class (or import binding) in a target file that uses a reference export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    /// Subclass name, or the local import name for `match-imports`.
    pub identifier: String,
    pub file: String,
    /// Members the subclass redeclares from its base. Present only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_overrides: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectMatches {
    pub project: String,
    pub files: Vec<MatchEntry>,
}

/// A reference export together with everything in the target projects that uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultItem {
    pub export_specifier: ExportSpecifier,
    pub matches_per_project: Vec<ProjectMatches>,
}

/// Output of one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerQueryResult {
    pub analyzer: AnalyzerName,
    pub query_output: Vec<QueryResultItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl AnalyzerQueryResult {
    /// Total number of match entries across all items.
    pub fn match_count(&self) -> usize {
        self.query_output
            .iter()
            .flat_map(|item| &item.matches_per_project)
            .map(|group| group.files.len())
            .sum()
    }
}

/// Append-only accumulation of match entries keyed by export id.
///
/// The first occurrence of an id fixes the item's position; later matches append to it.
/// Fed by a single writer in target-project / file order, so output order is stable.
#[derive(Debug)]
pub struct ResultAccumulator {
    policy: DuplicatePolicy,
    items: Vec<QueryResultItem>,
    by_id: HashMap<String, usize>,
    seen: HashSet<(String, String, String, String)>,
}

impl ResultAccumulator {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            items: Vec::new(),
            by_id: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// The item for `specifier`, created on first use.
    pub fn item(&mut self, specifier: &ExportSpecifier) -> &mut QueryResultItem {
        let position = match self.by_id.get(&specifier.id) {
            Some(&position) => position,
            None => {
                let position = self.items.len();
                self.by_id.insert(specifier.id.clone(), position);
                self.items.push(QueryResultItem {
                    export_specifier: specifier.clone(),
                    matches_per_project: Vec::new(),
                });
                position
            }
        };
        &mut self.items[position]
    }

    /// Append `entry` under `project` for `base`. Returns `false` when the duplicate
    /// policy drops it.
    pub fn record(&mut self, base: &ExportSpecifier, project: &str, entry: MatchEntry) -> bool {
        if self.policy == DuplicatePolicy::Dedupe {
            let key = (
                base.id.clone(),
                project.to_owned(),
                entry.file.clone(),
                entry.identifier.clone(),
            );
            if !self.seen.insert(key) {
                return false;
            }
        }

        let item = self.item(base);
        let group = match item.matches_per_project.iter().position(|g| g.project == project) {
            Some(i) => &mut item.matches_per_project[i],
            None => {
                item.matches_per_project.push(ProjectMatches {
                    project: project.to_owned(),
                    files: Vec::new(),
                });
                let last = item.matches_per_project.len() - 1;
                &mut item.matches_per_project[last]
            }
        };
        group.files.push(entry);
        true
    }

    pub fn into_items(self) -> Vec<QueryResultItem> {
        self.items
    }
}
