pub mod exports;
pub mod heritage;
pub mod imports;
pub mod languages;
pub mod mixin;

use std::cell::RefCell;
use std::thread::LocalKey;

use tree_sitter::{Node, Parser, Tree};

use languages::{Grammar, grammar_for_path};

/// Name recorded for default exports and default imports.
///
/// Not a legal identifier, so it can never collide with a named export.
pub const DEFAULT_NAME: &str = "[default]";

// One Parser per grammar per rayon worker thread.
// Each Parser is initialised once per thread with the appropriate grammar.
thread_local! {
    static PARSER_TS: RefCell<Parser> = RefCell::new(new_parser(Grammar::TypeScript));
    static PARSER_TSX: RefCell<Parser> = RefCell::new(new_parser(Grammar::Tsx));
    static PARSER_JS: RefCell<Parser> = RefCell::new(new_parser(Grammar::JavaScript));
}

fn new_parser(grammar: Grammar) -> Parser {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.language())
        .expect("bundled grammar must match the tree-sitter ABI");
    parser
}

/// Why a file could not be turned into a usable syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("tree-sitter returned no tree")]
    NoTree,
    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },
}

/// Parse a source file using the thread-local parser for its grammar.
///
/// # Errors
/// - the extension of `path` is not a JS/TS extension
/// - tree-sitter returns `None`
/// - the tree contains an ERROR or MISSING node: a partially recovered tree would
///   silently drop or invent declarations, so the whole file is rejected
pub fn parse_source(path: &str, source: &[u8]) -> Result<Tree, ParseError> {
    let grammar =
        grammar_for_path(path).ok_or_else(|| ParseError::UnsupportedExtension(path.to_owned()))?;

    let key: &'static LocalKey<RefCell<Parser>> = match grammar {
        Grammar::TypeScript => &PARSER_TS,
        Grammar::Tsx => &PARSER_TSX,
        Grammar::JavaScript => &PARSER_JS,
    };

    let tree = key
        .with(|p| p.borrow_mut().parse(source, None))
        .ok_or(ParseError::NoTree)?;

    if tree.root_node().has_error() {
        let (line, column) = first_error_position(tree.root_node());
        return Err(ParseError::Syntax { line, column });
    }

    Ok(tree)
}

/// 1-based line/column of the first ERROR or MISSING node under `root`.
fn first_error_position(root: Node) -> (usize, usize) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return (pos.row + 1, pos.column + 1);
        }
        // Push in reverse so the leftmost child is visited first.
        let mut cursor = node.walk();
        let mut children: Vec<Node> = node
            .children(&mut cursor)
            .filter(|c| c.has_error() || c.is_missing())
            .collect();
        children.reverse();
        stack.extend(children);
    }
    let pos = root.start_position();
    (pos.row + 1, pos.column + 1)
}

// ---------------------------------------------------------------------------
// Helper utilities shared by the extractors
// ---------------------------------------------------------------------------

pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Named children of `node`, comments excluded.
pub(crate) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

/// First direct child of `node` with the given kind.
pub(crate) fn find_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// `true` if any direct child (named or anonymous) has the given kind.
pub(crate) fn has_child_of_kind(node: Node, kind: &str) -> bool {
    find_child_of_kind(node, kind).is_some()
}

/// Unquoted contents of a `string` node: `'./core.js'` → `./core.js`.
pub(crate) fn string_value(node: Node, source: &[u8]) -> String {
    let mut value = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "string_fragment" | "escape_sequence") {
            value.push_str(node_text(child, source));
        }
    }
    value
}

/// Strip any number of `( … )` around an expression.
pub(crate) fn unwrap_parens(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Exported / imported name as written, mapping the `default` keyword to [`DEFAULT_NAME`].
pub(crate) fn module_export_name(node: Node, source: &[u8]) -> String {
    let text = if node.kind() == "string" {
        string_value(node, source)
    } else {
        node_text(node, source).to_owned()
    };
    if text == "default" {
        DEFAULT_NAME.to_owned()
    } else {
        text
    }
}

/// The expression after `extends` in a class's heritage clause, if any.
///
/// The JavaScript grammar puts the expression directly under `class_heritage`;
/// the TypeScript grammar wraps it in `extends_clause` with a `value` field.
pub(crate) fn class_heritage_expression(class_node: Node) -> Option<Node> {
    let heritage = find_child_of_kind(class_node, "class_heritage")?;
    if let Some(extends) = find_child_of_kind(heritage, "extends_clause") {
        return extends
            .child_by_field_name("value")
            .or_else(|| named_children(extends).into_iter().next());
    }
    if has_child_of_kind(heritage, "implements_clause") && !has_child_of_kind(heritage, "extends") {
        return None;
    }
    named_children(heritage).into_iter().next()
}

/// Method and field names declared in a class body, in declaration order.
pub(crate) fn class_member_names(class_node: Node, source: &[u8]) -> Vec<String> {
    let Some(body) = class_node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut members = Vec::new();
    for member in named_children(body) {
        let name_node = match member.kind() {
            "method_definition" | "public_field_definition" | "abstract_method_signature" => {
                member.child_by_field_name("name")
            }
            "field_definition" => member.child_by_field_name("property"),
            _ => None,
        };
        if let Some(name_node) = name_node {
            let name = node_text(name_node, source);
            if !name.is_empty() && name != "constructor" && !members.iter().any(|m| m == name) {
                members.push(name.to_owned());
            }
        }
    }
    members
}
