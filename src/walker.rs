use std::path::{Path, PathBuf};

use crate::config::HeritageConfig;
use crate::parser::languages::SOURCE_EXTENSIONS;

/// Walk a project directory and collect JS/TS source files.
///
/// Respects `.gitignore` rules, always excludes `node_modules`, and applies any
/// additional exclusions from `config.exclude`. Entries are visited sorted by file
/// name so the returned order is stable across runs and platforms.
pub fn walk_project(root: &Path, config: &HeritageConfig) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even when the directory is not inside a git repository.
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(root = %root.display(), "walk error: {err}");
                continue;
            }
        };

        let path = entry.path();

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        // `node_modules` is always excluded, whatever the ignore files say.
        let relative = path.strip_prefix(root).unwrap_or(path);
        if path_contains_node_modules(relative) {
            continue;
        }

        if is_excluded_by_config(relative, config) {
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SOURCE_EXTENSIONS.contains(&ext) {
            continue;
        }

        tracing::trace!(path = %path.display(), "discovered");
        files.push(path.to_path_buf());
    }

    files
}

/// Returns true if any component of `path` is named `node_modules`.
fn path_contains_node_modules(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| s == "node_modules")
            .unwrap_or(false)
    })
}

/// Returns true if `path` (relative to the project root) matches any exclusion pattern from config.
fn is_excluded_by_config(path: &Path, config: &HeritageConfig) -> bool {
    let patterns = match &config.exclude {
        Some(p) => p,
        None => return false,
    };

    let path_str = path.to_string_lossy().replace('\\', "/");

    for pattern in patterns {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            continue;
        };
        if matcher.matches(&path_str) {
            return true;
        }
        // Also check if any component matches the pattern directly.
        for component in path.components() {
            if let Some(s) = component.as_os_str().to_str()
                && matcher.matches(s)
            {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_walk_returns_only_source_files_sorted() {
        let dir = tmp();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/b.ts"), "export {}").unwrap();
        fs::write(dir.path().join("src/a.js"), "export {}").unwrap();
        fs::write(dir.path().join("index.mjs"), "export {}").unwrap();
        fs::write(dir.path().join("README.md"), "# Hello").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let files = walk_project(dir.path(), &HeritageConfig::default());
        assert_eq!(names(dir.path(), &files), vec!["index.mjs", "src/a.js", "src/b.ts"]);
    }

    #[test]
    fn test_walk_excludes_node_modules() {
        let dir = tmp();
        let nm = dir.path().join("node_modules").join("pkg");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("index.js"), "export {}").unwrap();
        fs::write(dir.path().join("index.js"), "export {}").unwrap();

        let files = walk_project(dir.path(), &HeritageConfig::default());
        assert_eq!(names(dir.path(), &files), vec!["index.js"]);
    }

    #[test]
    fn test_walk_respects_exclude_patterns() {
        let dir = tmp();
        fs::create_dir_all(dir.path().join("fixtures")).unwrap();
        fs::write(dir.path().join("fixtures/x.js"), "export {}").unwrap();
        fs::write(dir.path().join("index.js"), "export {}").unwrap();

        let config = HeritageConfig {
            exclude: Some(vec!["fixtures".to_string()]),
            ..HeritageConfig::default()
        };
        let files = walk_project(dir.path(), &config);
        assert_eq!(names(dir.path(), &files), vec!["index.js"]);
    }

    #[test]
    fn test_walk_respects_gitignore_without_git() {
        let dir = tmp();
        fs::write(dir.path().join(".gitignore"), "dist/\n").unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/bundle.js"), "export {}").unwrap();
        fs::write(dir.path().join("index.js"), "export {}").unwrap();

        let files = walk_project(dir.path(), &HeritageConfig::default());
        assert_eq!(names(dir.path(), &files), vec!["index.js"]);
    }
}
