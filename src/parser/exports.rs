use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use super::imports::{ImportBinding, ImportKind, extract_import_bindings};
use super::mixin::is_mixin_function;
use super::{
    DEFAULT_NAME, class_member_names, has_child_of_kind, module_export_name, named_children,
    node_text, string_value, unwrap_parens,
};
use crate::config::MixinDetection;

/// One export statement (or one name of a multi-name export statement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportDeclaration {
    /// A binding physically exported by this file: `export class X`, `export { x as y }`
    /// of a local `x`, `export default …`, `export * as ns from …`.
    Local {
        /// Exported name ([`DEFAULT_NAME`] for default exports).
        name: String,
        /// The exported value is a mixin function.
        mixin: bool,
        /// Method / field names when the exported value is a class.
        members: Vec<String>,
    },
    /// `export { imported as name } from 'source'`, or `export { x as name }` of an imported
    /// `x`. Does not create an identity of its own.
    ReExport {
        name: String,
        imported: String,
        source: String,
    },
    /// `export * from 'source'`: every non-default name of `source`.
    ReExportAll { source: String },
}

/// Everything exported by a single file, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExports {
    pub declarations: Vec<ExportDeclaration>,
}

/// Facts about a top-level binding that matter once it is exported.
#[derive(Debug, Clone, Default)]
struct LocalBinding {
    mixin: bool,
    members: Vec<String>,
}

/// Extract all export declarations from a parsed syntax tree.
///
/// Only top-level statements are inspected: ES module exports cannot be nested.
pub fn extract_exports(tree: &Tree, source: &[u8], detection: MixinDetection) -> FileExports {
    let root = tree.root_node();
    let statements = named_children(root);

    // Pass 1: every top-level declaration, so `export { X }` / `export default X`
    // can tell whether `X` is a mixin or a class.
    let mut locals: HashMap<String, LocalBinding> = HashMap::new();
    for stmt in &statements {
        let decl = if stmt.kind() == "export_statement" {
            match stmt.child_by_field_name("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            *stmt
        };
        for (name, binding) in declared_bindings(decl, source, detection) {
            locals.entry(name).or_insert(binding);
        }
    }

    // Imported names re-exported through a plain `export { X }` keep their origin.
    let imports: HashMap<String, ImportBinding> = extract_import_bindings(tree, source)
        .into_iter()
        .filter(|b| b.kind != ImportKind::Namespace)
        .map(|b| (b.local.clone(), b))
        .collect();

    // Pass 2: export statements.
    let mut declarations = Vec::new();
    for stmt in statements {
        if stmt.kind() == "export_statement" {
            classify_export(stmt, source, detection, &locals, &imports, &mut declarations);
        }
    }

    FileExports { declarations }
}

/// Classify a single export_statement node.
fn classify_export(
    node: Node,
    source: &[u8],
    detection: MixinDetection,
    locals: &HashMap<String, LocalBinding>,
    imports: &HashMap<String, ImportBinding>,
    out: &mut Vec<ExportDeclaration>,
) {
    // Re-exports: anything with a `from '…'` clause.
    if let Some(source_node) = node.child_by_field_name("source") {
        let module = string_value(source_node, source);

        if let Some(ns) = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "namespace_export")
        {
            // `export * as ns from './module'` is a namespace object, physically owned here.
            if let Some(name_node) = named_children(ns).into_iter().next() {
                out.push(ExportDeclaration::Local {
                    name: module_export_name(name_node, source),
                    mixin: false,
                    members: Vec::new(),
                });
            }
            return;
        }

        if let Some(clause) = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "export_clause")
        {
            for (imported, exported) in export_clause_names(clause, source) {
                out.push(ExportDeclaration::ReExport {
                    name: exported,
                    imported,
                    source: module.clone(),
                });
            }
            return;
        }

        if has_child_of_kind(node, "*") {
            out.push(ExportDeclaration::ReExportAll { source: module });
        }
        return;
    }

    // `export default …`
    if has_child_of_kind(node, "default") {
        let binding = if let Some(decl) = node.child_by_field_name("declaration") {
            declared_bindings(decl, source, detection)
                .into_iter()
                .next()
                .map(|(_, b)| b)
                .unwrap_or_else(|| value_binding(decl, source, detection))
        } else if let Some(value) = node.child_by_field_name("value") {
            let value = unwrap_parens(value);
            if value.kind() == "identifier" {
                locals.get(node_text(value, source)).cloned().unwrap_or_default()
            } else {
                value_binding(value, source, detection)
            }
        } else {
            LocalBinding::default()
        };
        out.push(ExportDeclaration::Local {
            name: DEFAULT_NAME.to_owned(),
            mixin: binding.mixin,
            members: binding.members,
        });
        return;
    }

    // `export class X {}`, `export const a = 1, b = 2;`
    if let Some(decl) = node.child_by_field_name("declaration") {
        for (name, binding) in declared_bindings(decl, source, detection) {
            out.push(ExportDeclaration::Local {
                name,
                mixin: binding.mixin,
                members: binding.members,
            });
        }
        return;
    }

    // `export { a, b as c }`
    if let Some(clause) = named_children(node).into_iter().find(|c| c.kind() == "export_clause") {
        for (local, exported) in export_clause_names(clause, source) {
            if !locals.contains_key(&local)
                && let Some(import) = imports.get(&local)
            {
                out.push(ExportDeclaration::ReExport {
                    name: exported,
                    imported: import.imported.clone(),
                    source: import.source.clone(),
                });
                continue;
            }
            let binding = locals.get(&local).cloned().unwrap_or_default();
            out.push(ExportDeclaration::Local {
                name: exported,
                mixin: binding.mixin,
                members: binding.members,
            });
        }
    }
}

/// `(name, exported_as)` pairs of an export_clause node.
fn export_clause_names(clause_node: Node, source: &[u8]) -> Vec<(String, String)> {
    let mut names = Vec::new();
    for spec in named_children(clause_node) {
        if spec.kind() != "export_specifier" {
            continue;
        }
        // The `name` field holds the original name, `alias` the exported one.
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let name = module_export_name(name_node, source);
        let exported = match spec.child_by_field_name("alias") {
            Some(alias) => module_export_name(alias, source),
            None => name.clone(),
        };
        names.push((name, exported));
    }
    names
}

/// Names bound by a declaration node, with what they are bound to.
fn declared_bindings(
    decl: Node,
    source: &[u8],
    detection: MixinDetection,
) -> Vec<(String, LocalBinding)> {
    let named = |binding: LocalBinding| -> Vec<(String, LocalBinding)> {
        decl.child_by_field_name("name")
            .map(|n| vec![(node_text(n, source).to_owned(), binding)])
            .unwrap_or_default()
    };

    match decl.kind() {
        "function_declaration" | "generator_function_declaration" => named(LocalBinding {
            mixin: is_mixin_function(decl, source, detection),
            members: Vec::new(),
        }),
        "class_declaration" | "abstract_class_declaration" => named(LocalBinding {
            mixin: false,
            members: class_member_names(decl, source),
        }),
        "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
            named(LocalBinding::default())
        }
        "lexical_declaration" | "variable_declaration" => named_children(decl)
            .into_iter()
            .filter(|d| d.kind() == "variable_declarator")
            .filter_map(|d| {
                let name = d.child_by_field_name("name")?;
                // Destructuring patterns cannot hold a class or mixin we could recognise.
                if name.kind() != "identifier" {
                    return None;
                }
                let binding = d
                    .child_by_field_name("value")
                    .map(|v| value_binding(v, source, detection))
                    .unwrap_or_default();
                Some((node_text(name, source).to_owned(), binding))
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// What an arbitrary exported expression amounts to.
fn value_binding(value: Node, source: &[u8], detection: MixinDetection) -> LocalBinding {
    let value = unwrap_parens(value);
    match value.kind() {
        "class" | "class_declaration" | "abstract_class_declaration" => LocalBinding {
            mixin: false,
            members: class_member_names(value, source),
        },
        _ => LocalBinding {
            mixin: is_mixin_function(value, source, detection),
            members: Vec::new(),
        },
    }
}
