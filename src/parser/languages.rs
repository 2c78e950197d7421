use tree_sitter::Language;

/// Grammar family used for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    TypeScript,
    Tsx,
    JavaScript,
}

/// File extensions (without the dot) that are indexed.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Pick the grammar for a file extension, or `None` if the extension is not supported.
///
/// `.ts` and `.tsx` MUST use different grammars: the TypeScript grammar cannot parse
/// JSX, and the TSX grammar breaks angle-bracket type assertions (`<T>expr`).
pub fn grammar_for_extension(ext: &str) -> Option<Grammar> {
    match ext {
        "ts" | "mts" | "cts" => Some(Grammar::TypeScript),
        "tsx" => Some(Grammar::Tsx),
        "js" | "mjs" | "cjs" | "jsx" => Some(Grammar::JavaScript),
        _ => None,
    }
}

/// Grammar for a relative file path such as `./src/index.js`.
pub fn grammar_for_path(path: &str) -> Option<Grammar> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file_name.rsplit_once('.')?;
    grammar_for_extension(ext)
}

impl Grammar {
    pub fn language(self) -> Language {
        match self {
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}
