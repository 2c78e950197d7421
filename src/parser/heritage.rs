use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use super::imports::{ImportBinding, extract_import_bindings};
use super::{
    DEFAULT_NAME, class_heritage_expression, class_member_names, named_children, node_text,
    unwrap_parens,
};

/// The innermost operand of an `extends` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeritageRoot {
    /// `extends RefClass`
    Identifier(String),
    /// `extends ns.RefClass`
    Member { object: String, property: String },
}

impl HeritageRoot {
    /// The local name the root is looked up under (`ns` for `ns.RefClass`).
    pub fn binding_name(&self) -> &str {
        match self {
            HeritageRoot::Identifier(name) => name,
            HeritageRoot::Member { object, .. } => object,
        }
    }

    /// Read a wrapper callee (`Mixin`, `mixins.Mixin`) back as a root. Other callee
    /// shapes (`a.b.c`, `this.f`, `f()`) are not lookups and yield `None`.
    pub fn from_callee(callee: &str) -> Option<Self> {
        let is_ident = |s: &str| {
            !s.is_empty()
                && s != "this"
                && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        };
        match callee.split_once('.') {
            None if is_ident(callee) => Some(HeritageRoot::Identifier(callee.to_owned())),
            Some((object, property)) if is_ident(object) && is_ident(property) => {
                Some(HeritageRoot::Member {
                    object: object.to_owned(),
                    property: property.to_owned(),
                })
            }
            _ => None,
        }
    }
}

/// An `extends` clause decomposed into its root operand and the calls wrapped around it.
///
/// `ForeignMixin(Mixin(RefClass))` → root `RefClass`, wrappers `["ForeignMixin", "Mixin"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeritageExpression {
    pub root: HeritageRoot,
    /// Callee text of each wrapping call, outer to inner.
    pub wrappers: Vec<String>,
}

/// A class that extends something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHeritage {
    /// Class name; [`DEFAULT_NAME`] for an anonymous `export default class extends …`.
    pub class_name: String,
    pub heritage: HeritageExpression,
    /// Method / field names declared in the class body.
    pub members: Vec<String>,
    /// 1-based line of the class.
    pub line: usize,
}

/// Everything the subclass matcher needs from one target file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeritage {
    pub imports: Vec<ImportBinding>,
    pub classes: Vec<ClassHeritage>,
    /// Top-level `const Base = Mixin(RefClass)` bindings, in declaration order.
    pub local_aliases: Vec<(String, HeritageExpression)>,
}

impl FileHeritage {
    pub fn import_binding(&self, local: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|b| b.local == local)
    }

    pub fn local_alias(&self, local: &str) -> Option<&HeritageExpression> {
        self.local_aliases
            .iter()
            .find(|(name, _)| name == local)
            .map(|(_, expr)| expr)
    }
}

/// Extract imports, classes with an `extends` clause, and local heritage aliases.
///
/// Classes are collected from anywhere in the file (a class declared inside a function
/// still extends its base). Class expressions count only when they are named through an
/// export default or a variable declarator; the class expression returned by a mixin body
/// is not a subclass of anything concrete.
pub fn extract_heritage(tree: &Tree, source: &[u8]) -> FileHeritage {
    let root = tree.root_node();
    let imports = extract_import_bindings(tree, source);

    let mut classes = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(class) = class_heritage(node, source) {
            classes.push(class);
        }
        let mut children = named_children(node);
        children.reverse();
        stack.extend(children);
    }

    let mut local_aliases = Vec::new();
    for stmt in named_children(root) {
        let decl = if stmt.kind() == "export_statement" {
            match stmt.child_by_field_name("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            stmt
        };
        if !matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
            continue;
        }
        for declarator in named_children(decl) {
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }
            if !matches!(
                unwrap_parens(value).kind(),
                "call_expression" | "identifier" | "member_expression"
            ) {
                continue;
            }
            if let Some(expr) = decompose_heritage(value, source) {
                local_aliases.push((node_text(name, source).to_owned(), expr));
            }
        }
    }

    FileHeritage {
        imports,
        classes,
        local_aliases,
    }
}

/// `Some` when `node` is a named class with a decomposable `extends` clause.
fn class_heritage(node: Node, source: &[u8]) -> Option<ClassHeritage> {
    let class_name = match node.kind() {
        "class_declaration" | "abstract_class_declaration" => {
            node_text(node.child_by_field_name("name")?, source).to_owned()
        }
        "class" => {
            let parent = node.parent()?;
            match parent.kind() {
                "export_statement" => match node.child_by_field_name("name") {
                    Some(n) => node_text(n, source).to_owned(),
                    None => DEFAULT_NAME.to_owned(),
                },
                "variable_declarator" => {
                    let name = parent.child_by_field_name("name")?;
                    if name.kind() != "identifier" {
                        return None;
                    }
                    node_text(name, source).to_owned()
                }
                _ => return None,
            }
        }
        _ => return None,
    };

    let heritage = decompose_heritage(class_heritage_expression(node)?, source)?;
    Some(ClassHeritage {
        class_name,
        heritage,
        members: class_member_names(node, source),
        line: node.start_position().row + 1,
    })
}

/// Peel call wrappers off a heritage expression down to its root operand.
///
/// Each call contributes its callee text as a wrapper and recurses into its first
/// argument. Anything that is not an identifier, a `ns.Name` member expression, or a call
/// leading to one (conditionals, arbitrary expressions) is not decomposable.
pub fn decompose_heritage(expr: Node, source: &[u8]) -> Option<HeritageExpression> {
    let mut wrappers = Vec::new();
    let mut node = unwrap_parens(expr);
    loop {
        match node.kind() {
            "identifier" => {
                return Some(HeritageExpression {
                    root: HeritageRoot::Identifier(node_text(node, source).to_owned()),
                    wrappers,
                });
            }
            "member_expression" => {
                let object = node.child_by_field_name("object")?;
                let property = node.child_by_field_name("property")?;
                if object.kind() != "identifier" {
                    return None;
                }
                return Some(HeritageExpression {
                    root: HeritageRoot::Member {
                        object: node_text(object, source).to_owned(),
                        property: node_text(property, source).to_owned(),
                    },
                    wrappers,
                });
            }
            "call_expression" => {
                let callee = node.child_by_field_name("function")?;
                let args = node.child_by_field_name("arguments")?;
                let first = named_children(args).into_iter().next()?;
                wrappers.push(node_text(callee, source).to_owned());
                node = unwrap_parens(first);
            }
            _ => return None,
        }
    }
}
