use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use super::{DEFAULT_NAME, module_export_name, named_children, node_text, string_value};

/// Name recorded as `imported` for `import * as ns from '…'`.
pub const NAMESPACE_NAME: &str = "*";

/// How a local name was bound by an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import { X } from 'module'` / `import { X as Y } from 'module'`
    Named,
    /// `import X from 'module'` / `import { default as X } from 'module'`
    Default,
    /// `import * as ns from 'module'`
    Namespace,
}

/// A single local binding introduced by a static import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBinding {
    /// The local name visible in this file.
    pub local: String,
    /// The name exported by the source module ([`DEFAULT_NAME`] / [`NAMESPACE_NAME`] for
    /// default and namespace imports).
    pub imported: String,
    /// The module specifier exactly as written, e.g. `"exporting-ref-project"` or `"./core.js"`.
    pub source: String,
    pub kind: ImportKind,
}

/// Extract every binding of every top-level `import … from '…'` statement.
///
/// Side-effect imports (`import './polyfill.js'`) bind nothing and are skipped.
/// TypeScript `import type` statements are skipped as well: they cannot be extended at runtime.
pub fn extract_import_bindings(tree: &Tree, source: &[u8]) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();

    for stmt in named_children(tree.root_node()) {
        if stmt.kind() != "import_statement" || is_type_only(stmt, source) {
            continue;
        }
        let Some(source_node) = stmt.child_by_field_name("source") else {
            continue;
        };
        let module = string_value(source_node, source);

        for child in named_children(stmt) {
            match child.kind() {
                "import_clause" => extract_import_clause(child, source, &module, &mut bindings),
                "namespace_import" => push_namespace(child, source, &module, &mut bindings),
                _ => {}
            }
        }
    }

    bindings
}

fn is_type_only(stmt: Node, source: &[u8]) -> bool {
    let mut cursor = stmt.walk();
    let type_only = stmt
        .children(&mut cursor)
        .take_while(|c| c.kind() != "import_clause")
        .any(|c| node_text(c, source) == "type");
    type_only
}

/// Walk an `import_clause` node: default identifier, `{ named }` and `* as ns`.
fn extract_import_clause(
    clause_node: Node,
    source: &[u8],
    module: &str,
    bindings: &mut Vec<ImportBinding>,
) {
    for child in named_children(clause_node) {
        match child.kind() {
            "identifier" => {
                // Default import: `import React from ...`
                bindings.push(ImportBinding {
                    local: node_text(child, source).to_owned(),
                    imported: DEFAULT_NAME.to_owned(),
                    source: module.to_owned(),
                    kind: ImportKind::Default,
                });
            }
            "named_imports" => extract_named_imports(child, source, module, bindings),
            "namespace_import" => push_namespace(child, source, module, bindings),
            _ => {}
        }
    }
}

/// `* as ns`: the identifier has no field name, find it by kind.
fn push_namespace(ns_node: Node, source: &[u8], module: &str, bindings: &mut Vec<ImportBinding>) {
    if let Some(ident) = named_children(ns_node).into_iter().find(|c| c.kind() == "identifier") {
        bindings.push(ImportBinding {
            local: node_text(ident, source).to_owned(),
            imported: NAMESPACE_NAME.to_owned(),
            source: module.to_owned(),
            kind: ImportKind::Namespace,
        });
    }
}

/// `{ useState, useEffect as UE, default as Base }`
fn extract_named_imports(
    named_imports_node: Node,
    source: &[u8],
    module: &str,
    bindings: &mut Vec<ImportBinding>,
) {
    for spec in named_children(named_imports_node) {
        if spec.kind() != "import_specifier" {
            continue;
        }
        // In `import { foo as bar }`: name="foo" (exported), alias="bar" (local).
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let imported = module_export_name(name_node, source);
        let local = match spec.child_by_field_name("alias") {
            Some(alias) => node_text(alias, source).to_owned(),
            None => node_text(name_node, source).to_owned(),
        };
        let kind = if imported == DEFAULT_NAME {
            ImportKind::Default
        } else {
            ImportKind::Named
        };
        bindings.push(ImportBinding {
            local,
            imported,
            source: module.to_owned(),
            kind,
        });
    }
}
