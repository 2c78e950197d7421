pub mod paths;

use crate::project::{ProjectId, ProjectSet};

use paths::{is_relative, join_normalized, parent_dir, locate, split_package_specifier};

/// A module specifier resolved to a concrete file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    pub project: ProjectId,
    /// `./`-rooted path inside `project`.
    pub file: String,
}

/// Why a specifier did not resolve. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// No configured project is named by the specifier (foreign package, built-in).
    UnknownPackage,
    /// A relative specifier climbs above its project root.
    EscapesProject,
    /// The package or path exists but no file matches after probing.
    FileNotFound,
    /// A bare package import of a project with no entry file.
    NoEntryPoint,
}

/// Outcome of [`ModuleResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ModuleRef),
    Unresolved(Unresolved),
}

impl Resolution {
    pub fn resolved(self) -> Option<ModuleRef> {
        match self {
            Resolution::Resolved(module) => Some(module),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// Resolves import specifiers across the projects of one run, the way a package
/// manager would lay them out side by side in `node_modules`.
///
/// Pure: the only state is the project set and its precomputed entry points.
pub struct ModuleResolver<'a> {
    projects: &'a ProjectSet,
    /// Project names, longest first, so `@org/pkg-extra` wins over `@org/pkg`.
    names: Vec<(&'a str, ProjectId)>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(projects: &'a ProjectSet) -> Self {
        let mut names: Vec<(&'a str, ProjectId)> = projects
            .projects()
            .iter()
            .enumerate()
            .map(|(id, p)| (p.name.as_str(), id))
            .collect();
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        Self { projects, names }
    }

    pub fn projects(&self) -> &'a ProjectSet {
        self.projects
    }

    /// Resolve `specifier` as written in `from_file` of `from_project`.
    pub fn resolve(&self, specifier: &str, from_project: ProjectId, from_file: &str) -> Resolution {
        let resolution = if is_relative(specifier) {
            self.resolve_relative(specifier, from_project, from_file)
        } else {
            self.resolve_bare(specifier)
        };

        if let Resolution::Unresolved(reason) = &resolution {
            tracing::debug!(
                specifier,
                from = %self.projects.get(from_project).name,
                file = from_file,
                ?reason,
                "unresolved specifier"
            );
        }
        resolution
    }

    fn resolve_relative(&self, specifier: &str, project: ProjectId, from_file: &str) -> Resolution {
        let Some(candidate) = join_normalized(parent_dir(from_file), specifier) else {
            return Resolution::Unresolved(Unresolved::EscapesProject);
        };
        self.locate_in(project, &candidate)
    }

    fn resolve_bare(&self, specifier: &str) -> Resolution {
        for &(name, id) in &self.names {
            let Some(rest) = specifier.strip_prefix(name) else {
                continue;
            };
            if rest.is_empty() {
                return match self.projects.get(id).entry() {
                    Some(entry) => Resolution::Resolved(ModuleRef {
                        project: id,
                        file: entry.to_owned(),
                    }),
                    None => Resolution::Unresolved(Unresolved::NoEntryPoint),
                };
            }
            if let Some(subpath) = rest.strip_prefix('/') {
                // Subpath imports go straight to the file, bypassing the entry point.
                return match join_normalized(".", subpath) {
                    Some(candidate) => self.locate_in(id, &candidate),
                    None => Resolution::Unresolved(Unresolved::EscapesProject),
                };
            }
        }

        let (package, _) = split_package_specifier(specifier);
        tracing::trace!(package, "not a configured project");
        Resolution::Unresolved(Unresolved::UnknownPackage)
    }

    fn locate_in(&self, id: ProjectId, candidate: &str) -> Resolution {
        let project = self.projects.get(id);
        match locate(candidate, |p| project.contains(p)) {
            Some(file) => Resolution::Resolved(ModuleRef { project: id, file }),
            None => Resolution::Unresolved(Unresolved::FileNotFound),
        }
    }
}
