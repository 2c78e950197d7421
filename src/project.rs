use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::HeritageConfig;
use crate::error::{Error, Result};
use crate::resolver::paths::{join_normalized, locate};
use crate::walker::walk_project;
use crate::warning::{Warning, WarningKind};

/// Position of a project inside its [`ProjectSet`].
pub type ProjectId = usize;

/// One source file of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// `./`-rooted, forward-slash path relative to the project root.
    pub relative_path: String,
    pub text: String,
}

/// Immutable view of one package: root, declared name, entry point, and sources.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub name: String,
    entry: Option<String>,
    files: Vec<SourceFile>,
    file_index: HashMap<String, usize>,
}

/// The subset of `package.json` that matters for identity and entry points.
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    main: Option<String>,
    module: Option<String>,
    exports: Option<serde_json::Value>,
}

impl PackageManifest {
    fn read(root: &Path) -> Self {
        let path = root.join("package.json");
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::debug!(path = %path.display(), "ignoring invalid package.json: {err}");
                Self::default()
            }
        }
    }

    /// Entry point candidates in precedence order: `exports`, `module`, `main`.
    fn entry_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::new();
        if let Some(exports) = &self.exports
            && let Some(entry) = exports_entry(exports)
        {
            candidates.push(entry.to_owned());
        }
        candidates.extend(self.module.iter().cloned());
        candidates.extend(self.main.iter().cloned());
        candidates
    }
}

/// The root entry of an `exports` field.
///
/// Accepts `"./index.js"`, `{ ".": "./index.js" }`, `{ ".": { "import": … } }` and
/// a bare conditions object `{ "import": …, "default": … }`.
fn exports_entry(exports: &serde_json::Value) -> Option<&str> {
    fn conditions(value: &serde_json::Value) -> Option<&str> {
        match value {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => ["import", "default"]
                .iter()
                .find_map(|key| map.get(*key).and_then(|v| v.as_str())),
            _ => None,
        }
    }

    match exports {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(map) => match map.get(".") {
            Some(root) => conditions(root),
            None => conditions(exports),
        },
        _ => None,
    }
}

impl Project {
    /// Build a project from already-read sources.
    ///
    /// `entry_candidates` are package-relative paths in precedence order; the first one
    /// that locates an existing file becomes the entry, falling back to `index`.
    pub fn from_sources(
        root: PathBuf,
        name: impl Into<String>,
        entry_candidates: &[String],
        files: Vec<SourceFile>,
    ) -> Self {
        let file_index = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.relative_path.clone(), i))
            .collect();
        let mut project = Self {
            root,
            name: name.into(),
            entry: None,
            files,
            file_index,
        };
        let entry = entry_candidates
            .iter()
            .map(String::as_str)
            .chain(std::iter::once("."))
            .filter_map(|candidate| join_normalized(".", candidate))
            .find_map(|candidate| locate(&candidate, |p| project.contains(p)));
        project.entry = entry;
        project
    }

    /// Load a project directory: read `package.json`, walk and read every source file.
    ///
    /// Unreadable and non-UTF-8 files are skipped with an `unreadable-file` warning.
    pub fn load(path: &Path, config: &HeritageConfig, warnings: &mut Vec<Warning>) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::ProjectNotFound(path.to_path_buf()));
        }

        let manifest = PackageManifest::read(path);
        let name = manifest.name.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });

        let mut files = Vec::new();
        for file in walk_project(path, config) {
            let relative = relative_path(path, &file);
            match std::fs::read(&file).map(String::from_utf8) {
                Ok(Ok(text)) => files.push(SourceFile {
                    relative_path: relative,
                    text,
                }),
                Ok(Err(_)) => warnings.push(Warning::new(
                    WarningKind::UnreadableFile,
                    &name,
                    Some(&relative),
                    "file is not valid UTF-8",
                )),
                Err(err) => warnings.push(Warning::new(
                    WarningKind::UnreadableFile,
                    &name,
                    Some(&relative),
                    format!("failed to read file: {err}"),
                )),
            }
        }

        let project = Self::from_sources(
            path.to_path_buf(),
            name,
            &manifest.entry_candidates(),
            files,
        );
        tracing::debug!(
            project = %project.name,
            files = project.files.len(),
            entry = project.entry.as_deref().unwrap_or("-"),
            "loaded project"
        );
        Ok(project)
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.file_index.contains_key(relative_path)
    }

    /// The file a bare import of this package resolves to.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }
}

/// `./`-rooted forward-slash path of `file` relative to `root`.
fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    format!("./{}", relative.to_string_lossy().replace('\\', "/"))
}

/// Every project of one run, loaded once, with the reference / target split.
#[derive(Debug, Default)]
pub struct ProjectSet {
    projects: Vec<Project>,
    references: Vec<ProjectId>,
    targets: Vec<ProjectId>,
    by_name: HashMap<String, ProjectId>,
}

/// Which side of the run a project was configured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reference,
    Target,
}

impl ProjectSet {
    /// Expand and validate every configured path, then load each distinct directory once.
    ///
    /// All configuration errors (missing directories, bad or empty patterns) are raised
    /// before any project is read.
    pub fn load(
        reference_paths: &[PathBuf],
        target_paths: &[PathBuf],
        config: &HeritageConfig,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self> {
        let mut dirs: Vec<(PathBuf, Role)> = Vec::new();
        for (paths, role) in [(reference_paths, Role::Reference), (target_paths, Role::Target)] {
            for path in paths {
                dirs.extend(expand_project_path(path)?.into_iter().map(|dir| (dir, role)));
            }
        }

        let mut set = Self::default();
        let mut loaded: HashMap<PathBuf, Option<ProjectId>> = HashMap::new();
        for (dir, role) in dirs {
            let key = std::fs::canonicalize(&dir).map_err(|source| Error::Io {
                path: dir.clone(),
                source,
            })?;
            let id = match loaded.get(&key) {
                Some(id) => *id,
                None => {
                    let project = Project::load(&dir, config, warnings)?;
                    let id = set.insert(project, warnings);
                    loaded.insert(key, id);
                    id
                }
            };
            if let Some(id) = id {
                set.assign(id, role);
            }
        }

        tracing::info!(
            projects = set.projects.len(),
            references = set.references.len(),
            targets = set.targets.len(),
            "projects loaded"
        );
        Ok(set)
    }

    /// Assemble a set from in-memory projects.
    pub fn from_projects(
        references: Vec<Project>,
        targets: Vec<Project>,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let mut set = Self::default();
        for (projects, role) in [(references, Role::Reference), (targets, Role::Target)] {
            for project in projects {
                let id = match set.by_name.get(&project.name) {
                    // Same project configured on both sides.
                    Some(&existing) if set.projects[existing].root == project.root => {
                        Some(existing)
                    }
                    _ => set.insert(project, warnings),
                };
                if let Some(id) = id {
                    set.assign(id, role);
                }
            }
        }
        set
    }

    /// Add a project; `None` when its name is already taken by another directory.
    fn insert(&mut self, project: Project, warnings: &mut Vec<Warning>) -> Option<ProjectId> {
        if let Some(&existing) = self.by_name.get(&project.name) {
            warnings.push(Warning::new(
                WarningKind::DuplicateProjectName,
                &project.name,
                None,
                format!(
                    "{} declares the same name as {}; it is skipped",
                    project.root.display(),
                    self.projects[existing].root.display()
                ),
            ));
            return None;
        }
        let id = self.projects.len();
        self.by_name.insert(project.name.clone(), id);
        self.projects.push(project);
        Some(id)
    }

    fn assign(&mut self, id: ProjectId, role: Role) {
        let list = match role {
            Role::Reference => &mut self.references,
            Role::Target => &mut self.targets,
        };
        if !list.contains(&id) {
            list.push(id);
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, id: ProjectId) -> &Project {
        &self.projects[id]
    }

    pub fn references(&self) -> &[ProjectId] {
        &self.references
    }

    pub fn targets(&self) -> &[ProjectId] {
        &self.targets
    }
}

/// A configured path is either a directory or a glob pattern over directories.
fn expand_project_path(path: &Path) -> Result<Vec<PathBuf>> {
    let pattern = path.to_string_lossy();
    if !pattern.contains(['*', '?', '[']) {
        if !path.is_dir() {
            return Err(Error::ProjectNotFound(path.to_path_buf()));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = glob::glob(&pattern).map_err(|err| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })?;
    let dirs: Vec<PathBuf> = entries.flatten().filter(|p| p.is_dir()).collect();
    if dirs.is_empty() {
        return Err(Error::EmptyProjectPattern(pattern.to_string()));
    }
    Ok(dirs)
}
