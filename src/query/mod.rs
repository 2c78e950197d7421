use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analyzers::{
    AnalyzerName, AnalyzerOptions, AnalyzerQueryResult, MatchContext, TargetFile, find_exports,
    match_imports, match_subclasses,
};
use crate::cache::{CacheKey, CacheLayer, FileExtraction, fingerprint};
use crate::config::{CacheSettings, HeritageConfig};
use crate::error::{Error, Result};
use crate::index::{ExportIndex, IndexedFile};
use crate::parser::exports::{FileExports, extract_exports};
use crate::parser::heritage::{FileHeritage, extract_heritage};
use crate::parser::parse_source;
use crate::project::{Project, ProjectId, ProjectSet, SourceFile};
use crate::resolver::ModuleResolver;
use crate::warning::{Warning, WarningKind};

/// Which analyzer to run, with its raw options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    pub analyzer_name: String,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl QueryConfig {
    pub fn new(analyzer_name: impl Into<String>) -> Self {
        Self {
            analyzer_name: analyzer_name.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// The project directories (or glob patterns) one run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub target_project_paths: Vec<PathBuf>,
    pub reference_project_paths: Vec<PathBuf>,
}

/// Drives a query run: load projects, extract and index reference exports, then match
/// target files against the finished index.
///
/// Owns the extraction cache and the result cache, so repeated runs on one orchestrator
/// only re-parse files whose content changed.
pub struct QueryOrchestrator {
    config: HeritageConfig,
    cache: CacheLayer,
    results: RwLock<HashMap<String, AnalyzerQueryResult>>,
    pool: rayon::ThreadPool,
}

impl QueryOrchestrator {
    /// Build an orchestrator honouring the cache toggles in `config`. A configured
    /// `cache.dir` is read back immediately.
    pub fn new(config: HeritageConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("heritage-worker-{i}"))
            .build()
            .map_err(|err| Error::ThreadPool(err.to_string()))?;

        let cache = CacheLayer::new(
            config.cache.extraction_enabled(),
            config.analysis.mixin_detection,
        );
        if let Some(dir) = &config.cache.dir {
            cache.load_from(dir);
        }

        Ok(Self {
            config,
            cache,
            results: RwLock::new(HashMap::new()),
            pool,
        })
    }

    /// An orchestrator that recomputes everything on every run.
    pub fn with_cache_disabled(mut config: HeritageConfig) -> Result<Self> {
        config.cache = CacheSettings::disabled();
        Self::new(config)
    }

    pub fn config(&self) -> &HeritageConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Run one analyzer. Configuration errors (unknown analyzer, bad option, missing
    /// project path) are returned before any file is parsed.
    pub fn run(&self, query: &QueryConfig, run: &RunConfig) -> Result<AnalyzerQueryResult> {
        let analyzer: AnalyzerName = query.analyzer_name.parse()?;
        let options =
            AnalyzerOptions::from_map(analyzer, &query.options, self.config.analysis.duplicates)?;

        let started = Instant::now();
        let mut warnings = Vec::new();
        let projects = ProjectSet::load(
            &run.reference_project_paths,
            &run.target_project_paths,
            &self.config,
            &mut warnings,
        )?;

        let result = self.pool.install(|| {
            let fingerprints: Vec<Vec<String>> = projects
                .projects()
                .par_iter()
                .map(|p| p.files().iter().map(|f| fingerprint(&f.text)).collect())
                .collect();

            let key = self
                .config
                .cache
                .results_enabled()
                .then(|| self.result_key(analyzer, query, &projects, &fingerprints));
            if let Some(key) = &key
                && let Some(cached) = self.cached_result(key)
            {
                tracing::debug!(analyzer = %analyzer, "result cache hit");
                return cached;
            }

            let result = self.execute(analyzer, options, &projects, &fingerprints, warnings);
            if let Some(key) = key
                && let Ok(mut results) = self.results.write()
            {
                results.insert(key, result.clone());
            }
            result
        });

        tracing::info!(
            analyzer = %analyzer,
            items = result.query_output.len(),
            matches = result.match_count(),
            warnings = result.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );
        Ok(result)
    }

    /// Run several analyzers over the same projects, preserving their order.
    pub fn run_all(
        &self,
        queries: &[QueryConfig],
        run: &RunConfig,
    ) -> Result<Vec<AnalyzerQueryResult>> {
        queries.iter().map(|query| self.run(query, run)).collect()
    }

    /// Write the extraction cache to `cache.dir`, if one is configured.
    pub fn persist_cache(&self) -> Result<()> {
        match &self.config.cache.dir {
            Some(dir) => {
                self.cache.save_to(dir)?;
                tracing::debug!(dir = %dir.display(), "extraction cache saved");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn cached_result(&self, key: &str) -> Option<AnalyzerQueryResult> {
        self.results.read().ok()?.get(key).cloned()
    }

    /// Identity of a run's inputs: analyzer, options, settings, projects, file contents.
    fn result_key(
        &self,
        analyzer: AnalyzerName,
        query: &QueryConfig,
        projects: &ProjectSet,
        fingerprints: &[Vec<String>],
    ) -> String {
        let analysis = &self.config.analysis;
        let mut hasher = blake3::Hasher::new();
        hasher.update(analyzer.as_str().as_bytes());
        hasher.update(serde_json::to_string(&query.options).unwrap_or_default().as_bytes());
        hasher.update(
            format!(
                "|{}|{:?}|{:?}",
                analysis.max_alias_depth, analysis.mixin_detection, analysis.duplicates
            )
            .as_bytes(),
        );
        hasher.update(format!("|{:?}|{:?}", projects.references(), projects.targets()).as_bytes());
        for (project, files) in projects.projects().iter().zip(fingerprints) {
            hasher.update(format!("\0{}\0{}\0", project.name, project.root.display()).as_bytes());
            hasher.update(project.entry().unwrap_or("").as_bytes());
            for (file, fp) in project.files().iter().zip(files) {
                hasher.update(format!("\0{}={fp}", file.relative_path).as_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// The pipeline proper. Indexing fully completes before any matching starts.
    fn execute(
        &self,
        analyzer: AnalyzerName,
        options: AnalyzerOptions,
        projects: &ProjectSet,
        fingerprints: &[Vec<String>],
        mut warnings: Vec<Warning>,
    ) -> AnalyzerQueryResult {
        let resolver = ModuleResolver::new(projects);
        let detection = self.config.analysis.mixin_detection;

        let reference_files = files_of(projects, projects.references(), fingerprints);
        let extracted: Vec<FileExtraction<FileExports>> = reference_files
            .par_iter()
            .map(|&(_, project, file, fp)| {
                self.cache.get_or_extract(
                    &self.cache.exports,
                    CacheKey::new(&project.name, &file.relative_path),
                    fp,
                    || match parse_source(&file.relative_path, file.text.as_bytes()) {
                        Ok(tree) => FileExtraction::Parsed(extract_exports(
                            &tree,
                            file.text.as_bytes(),
                            detection,
                        )),
                        Err(err) => FileExtraction::Failed(err.to_string()),
                    },
                )
            })
            .collect();

        let mut indexed = Vec::with_capacity(extracted.len());
        for (&(id, project, file, _), outcome) in reference_files.iter().zip(&extracted) {
            match outcome {
                FileExtraction::Parsed(exports) => indexed.push(IndexedFile {
                    project: id,
                    file: &file.relative_path,
                    exports,
                }),
                FileExtraction::Failed(reason) => {
                    warnings.push(parse_failure(project, file, reason))
                }
            }
        }

        let max_depth = self.config.analysis.max_alias_depth;
        let index = ExportIndex::build(&indexed, &resolver, max_depth, &mut warnings);

        let query_output = if analyzer.scans_targets() {
            let target_files = files_of(projects, projects.targets(), fingerprints);
            let extracted: Vec<FileExtraction<FileHeritage>> = target_files
                .par_iter()
                .map(|&(_, project, file, fp)| {
                    self.cache.get_or_extract(
                        &self.cache.heritage,
                        CacheKey::new(&project.name, &file.relative_path),
                        fp,
                        || match parse_source(&file.relative_path, file.text.as_bytes()) {
                            Ok(tree) => FileExtraction::Parsed(extract_heritage(
                                &tree,
                                file.text.as_bytes(),
                            )),
                            Err(err) => FileExtraction::Failed(err.to_string()),
                        },
                    )
                })
                .collect();

            let mut targets = Vec::with_capacity(extracted.len());
            for (&(id, project, file, _), outcome) in target_files.iter().zip(&extracted) {
                match outcome {
                    FileExtraction::Parsed(heritage) => targets.push(TargetFile {
                        project: id,
                        file: &file.relative_path,
                        heritage,
                    }),
                    FileExtraction::Failed(reason) => {
                        warnings.push(parse_failure(project, file, reason))
                    }
                }
            }

            let ctx = MatchContext {
                index: &index,
                resolver: &resolver,
                options,
                max_alias_depth: max_depth,
            };
            match analyzer {
                AnalyzerName::MatchImports => ctx.run(&targets, match_imports::match_file),
                _ => ctx.run(&targets, match_subclasses::match_file),
            }
        } else {
            find_exports::collect(&index)
        };

        AnalyzerQueryResult {
            analyzer,
            query_output,
            warnings: dedupe_warnings(warnings),
        }
    }
}

/// `(id, project, file, fingerprint)` for every file of the given projects, in order.
fn files_of<'a>(
    projects: &'a ProjectSet,
    ids: &[ProjectId],
    fingerprints: &'a [Vec<String>],
) -> Vec<(ProjectId, &'a Project, &'a SourceFile, &'a str)> {
    ids.iter()
        .flat_map(|&id| {
            let project = projects.get(id);
            project
                .files()
                .iter()
                .zip(&fingerprints[id])
                .map(move |(file, fp)| (id, project, file, fp.as_str()))
        })
        .collect()
}

fn parse_failure(project: &Project, file: &SourceFile, reason: &str) -> Warning {
    Warning::new(
        WarningKind::ParseFailure,
        &project.name,
        Some(&file.relative_path),
        format!("skipped: {reason}"),
    )
}

/// A file scanned as both reference and target fails twice; report it once.
fn dedupe_warnings(warnings: Vec<Warning>) -> Vec<Warning> {
    let mut seen = HashSet::new();
    warnings
        .into_iter()
        .filter(|w| seen.insert((w.kind, w.project.clone(), w.file.clone(), w.message.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MixinDetection;
    use std::fs;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// `ref` exports `Base`; `app` extends it; `dup` reuses the name `ref`.
    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("ref/package.json"), r#"{ "name": "ref" }"#);
        write(&root.join("ref/index.ts"), "export class Base {}\nexport * from './more';\n");
        write(&root.join("ref/more.ts"), "export class More extends Base {}\n");
        write(&root.join("dup/package.json"), r#"{ "name": "ref" }"#);
        write(&root.join("dup/index.ts"), "export class Shadow {}\n");
        write(&root.join("app/package.json"), r#"{ "name": "app" }"#);
        write(
            &root.join("app/src/view.ts"),
            "import { Base, More } from 'ref';\n\
             class View extends Base {}\n\
             class Other extends More {}\n",
        );
        dir
    }

    fn run_config(root: &Path, references: &[&str]) -> RunConfig {
        RunConfig {
            target_project_paths: vec![root.join("app")],
            reference_project_paths: references.iter().map(|r| root.join(r)).collect(),
        }
    }

    #[test]
    fn test_star_reexport_and_class_order() {
        let dir = workspace();
        let orchestrator =
            QueryOrchestrator::with_cache_disabled(HeritageConfig::default()).unwrap();
        let result = orchestrator
            .run(&QueryConfig::new("match-subclasses"), &run_config(dir.path(), &["ref"]))
            .unwrap();

        let ids: Vec<&str> = result
            .query_output
            .iter()
            .map(|item| item.export_specifier.id.as_str())
            .collect();
        assert_eq!(ids, vec!["Base::./index.ts::ref", "More::./more.ts::ref"]);
        assert_eq!(result.match_count(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_project_name_warns_and_skips() {
        let dir = workspace();
        let orchestrator =
            QueryOrchestrator::with_cache_disabled(HeritageConfig::default()).unwrap();
        let result = orchestrator
            .run(&QueryConfig::new("find-exports"), &run_config(dir.path(), &["ref", "dup"]))
            .unwrap();

        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::DuplicateProjectName)
        );
        assert!(
            result
                .query_output
                .iter()
                .all(|item| item.export_specifier.name != "Shadow")
        );
    }

    #[test]
    fn test_run_all_preserves_order() {
        let dir = workspace();
        let orchestrator = QueryOrchestrator::new(HeritageConfig::default()).unwrap();
        let queries = [
            QueryConfig::new("match-imports"),
            QueryConfig::new("find-exports"),
            QueryConfig::new("match-subclasses"),
        ];
        let results = orchestrator.run_all(&queries, &run_config(dir.path(), &["ref"])).unwrap();
        let names: Vec<AnalyzerName> = results.iter().map(|r| r.analyzer).collect();
        assert_eq!(
            names,
            vec![
                AnalyzerName::MatchImports,
                AnalyzerName::FindExports,
                AnalyzerName::MatchSubclasses
            ]
        );
        // Extraction is shared between analyzers over the same inputs.
        assert!(orchestrator.cache().heritage.stats().hits > 0);
    }

    #[test]
    fn test_dedupe_warnings() {
        let warning = || Warning::new(WarningKind::ParseFailure, "p", Some("./a.js"), "skipped");
        let other = Warning::new(WarningKind::ParseFailure, "p", Some("./b.js"), "skipped");
        let deduped = dedupe_warnings(vec![warning(), other.clone(), warning()]);
        assert_eq!(deduped, vec![warning(), other]);
    }

    fn single_pair(reference: &str, target: &str) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        write(&dir.path().join("ref/package.json"), r#"{ "name": "ref" }"#);
        write(&dir.path().join("ref/index.js"), reference);
        write(&dir.path().join("app/package.json"), r#"{ "name": "app" }"#);
        write(&dir.path().join("app/main.js"), target);
        dir
    }

    fn matched_ids(result: &AnalyzerQueryResult) -> Vec<(String, usize)> {
        result
            .query_output
            .iter()
            .map(|item| {
                let count = item.matches_per_project.iter().map(|g| g.files.len()).sum();
                (item.export_specifier.id.clone(), count)
            })
            .collect()
    }

    #[test]
    fn test_mixin_detection_decides_wrapper_transparency() {
        let dir = single_pair(
            "export class Base {}\n\
             export const Tracked = dedupeMixin(superclass => class extends superclass {});",
            "import { Base, Tracked } from 'ref';\nclass View extends Tracked(Base) {}",
        );
        let run = run_config(dir.path(), &["ref"]);
        let query = QueryConfig::new("match-subclasses");

        let strict = QueryOrchestrator::with_cache_disabled(HeritageConfig::default()).unwrap();
        assert_eq!(
            matched_ids(&strict.run(&query, &run).unwrap()),
            vec![("Tracked::./index.js::ref".to_owned(), 1)]
        );

        let mut config = HeritageConfig::default();
        config.analysis.mixin_detection = MixinDetection::Lenient;
        let lenient = QueryOrchestrator::with_cache_disabled(config).unwrap();
        assert_eq!(
            matched_ids(&lenient.run(&query, &run).unwrap()),
            vec![("Base::./index.js::ref".to_owned(), 1)]
        );
    }

    #[test]
    fn test_duplicate_policy_on_same_named_classes() {
        // Two classes named `Local` in one file yield the same (export, project, file,
        // identifier) entry twice.
        let dir = single_pair(
            "export class Base {}",
            "import { Base } from 'ref';\n\
             export function one() { class Local extends Base {} return Local; }\n\
             export function two() { class Local extends Base {} return Local; }",
        );
        let run = run_config(dir.path(), &["ref"]);
        let orchestrator =
            QueryOrchestrator::with_cache_disabled(HeritageConfig::default()).unwrap();

        let kept = orchestrator.run(&QueryConfig::new("match-subclasses"), &run).unwrap();
        assert_eq!(matched_ids(&kept), vec![("Base::./index.js::ref".to_owned(), 2)]);

        let query = QueryConfig::new("match-subclasses").with_option("duplicates", "dedupe".into());
        let deduped = orchestrator.run(&query, &run).unwrap();
        assert_eq!(matched_ids(&deduped), vec![("Base::./index.js::ref".to_owned(), 1)]);
    }
}
