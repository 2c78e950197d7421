//! Project-relative path arithmetic. Every path handled here has the `./a/b.js`
//! shape used in specifier ids: forward slashes, rooted at the project with `./`.

/// Extensions appended, in order, when a specifier omits one.
pub const LOOKUP_EXTENSIONS: [&str; 8] = ["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts"];

/// `./local`, `../parent`, `.` and `..` are relative; everything else is a package.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Directory part of a project-relative file path: `./a/b.js` → `./a`, `./b.js` → `.`.
pub fn parent_dir(file: &str) -> &str {
    match file.rfind('/') {
        Some(idx) => &file[..idx],
        None => ".",
    }
}

/// Join `specifier` onto `base_dir` and collapse `.` / `..` segments.
///
/// Returns `None` when the result would climb above the project root.
pub fn join_normalized(base_dir: &str, specifier: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base_dir.split('/').chain(specifier.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        Some(".".to_owned())
    } else {
        Some(format!("./{}", segments.join("/")))
    }
}

/// Find the file a module path refers to.
///
/// Lookup order: the exact path, the TypeScript source behind a `.js`-style
/// extension, each of [`LOOKUP_EXTENSIONS`] appended, then `index.<ext>` inside the
/// path taken as a directory.
pub fn locate(candidate: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
    if candidate != "." && exists(candidate) {
        return Some(candidate.to_owned());
    }

    for (js_ext, ts_exts) in [
        (".js", &[".ts", ".tsx"][..]),
        (".mjs", &[".mts"][..]),
        (".cjs", &[".cts"][..]),
        (".jsx", &[".tsx"][..]),
    ] {
        if let Some(stem) = candidate.strip_suffix(js_ext) {
            for ts_ext in ts_exts {
                let aliased = format!("{stem}{ts_ext}");
                if exists(&aliased) {
                    return Some(aliased);
                }
            }
        }
    }

    if candidate != "." {
        for ext in LOOKUP_EXTENSIONS {
            let with_ext = format!("{candidate}.{ext}");
            if exists(&with_ext) {
                return Some(with_ext);
            }
        }
    }

    for ext in LOOKUP_EXTENSIONS {
        let index = format!("{candidate}/index.{ext}");
        if exists(&index) {
            return Some(index);
        }
    }

    None
}

/// Split a bare specifier into the package name and the optional subpath.
///
/// - `react` → (`react`, None)
/// - `lodash/merge` → (`lodash`, Some(`merge`))
/// - `@org/utils/helpers` → (`@org/utils`, Some(`helpers`))
pub fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        // Scoped package: `@scope/name[/subpath]` keeps the first two segments.
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(idx, _)| idx)
            .unwrap_or(specifier.len())
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };
    let (name, rest) = specifier.split_at(name_end);
    (name, rest.strip_prefix('/').filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_relative() {
        assert!(is_relative("./local"));
        assert!(is_relative("../parent"));
        assert!(is_relative("."));
        assert!(!is_relative("react"));
        assert!(!is_relative("@org/utils"));
        assert!(!is_relative(".hidden"));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("./ref-src/core.js"), "./ref-src");
        assert_eq!(parent_dir("./index.js"), ".");
    }

    #[test]
    fn test_join_normalized() {
        assert_eq!(join_normalized(".", "./ref-src/core.js").as_deref(), Some("./ref-src/core.js"));
        assert_eq!(join_normalized("./a/b", "../c.js").as_deref(), Some("./a/c.js"));
        assert_eq!(join_normalized("./a", "..").as_deref(), Some("."));
        assert_eq!(join_normalized(".", "lib/main.js").as_deref(), Some("./lib/main.js"));
        assert_eq!(join_normalized("./a", "../../outside.js"), None);
    }

    #[test]
    fn test_locate_order() {
        let files = ["./core.ts", "./core.js", "./lib/index.ts", "./util.mts"];
        let exists = |p: &str| files.contains(&p);

        assert_eq!(locate("./core.js", exists).as_deref(), Some("./core.js"));
        assert_eq!(locate("./core", exists).as_deref(), Some("./core.js"));
        assert_eq!(locate("./lib", exists).as_deref(), Some("./lib/index.ts"));
        assert_eq!(locate("./util.mjs", exists).as_deref(), Some("./util.mts"));
        assert_eq!(locate("./missing", exists), None);
    }

    #[test]
    fn test_locate_typescript_source_behind_js_extension() {
        let files = ["./ref-src/core.ts"];
        let exists = |p: &str| files.contains(&p);
        assert_eq!(locate("./ref-src/core.js", exists).as_deref(), Some("./ref-src/core.ts"));
    }

    #[test]
    fn test_locate_project_root_index() {
        let files = ["./index.js"];
        let exists = |p: &str| files.contains(&p);
        assert_eq!(locate(".", exists).as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(split_package_specifier("react"), ("react", None));
        assert_eq!(split_package_specifier("lodash/merge"), ("lodash", Some("merge")));
        assert_eq!(split_package_specifier("@org/utils"), ("@org/utils", None));
        assert_eq!(
            split_package_specifier("@org/utils/helpers/a.js"),
            ("@org/utils", Some("helpers/a.js"))
        );
    }
}
