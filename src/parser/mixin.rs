//! Classification of "mixin functions": functions that take a superclass and return a
//! class expression extending it, e.g.
//! `export const Mixin = superclass => class extends superclass {}`.
//!
//! Anything that is close to, but not exactly, the pattern is treated as "not a mixin".

use tree_sitter::Node;

use super::{class_heritage_expression, named_children, node_text, unwrap_parens};
use crate::config::MixinDetection;

/// Decide whether a function-valued node is mixin-shaped.
///
/// Accepted under [`MixinDetection::Strict`]:
/// - `p => class extends p {}` (optionally parenthesized body)
/// - `(p) => { return class extends p {}; }`
/// - `function (p) { return class extends p {}; }` / `function M(p) { … }`
///
/// [`MixinDetection::Lenient`] additionally accepts statements before the final `return`
/// and a single wrapping call such as `dedupeMixin(p => class extends p {})`.
pub fn is_mixin_function(node: Node, source: &[u8], detection: MixinDetection) -> bool {
    let node = unwrap_parens(node);
    match node.kind() {
        "arrow_function" | "function_expression" | "function" | "function_declaration" => {}
        "call_expression" if detection == MixinDetection::Lenient => {
            let Some(args) = node.child_by_field_name("arguments") else {
                return false;
            };
            // One wrapping call only: the argument must be the function itself.
            return match named_children(args).as_slice() {
                [inner] if unwrap_parens(*inner).kind() != "call_expression" => {
                    is_mixin_function(*inner, source, detection)
                }
                _ => false,
            };
        }
        _ => return false,
    }

    let Some(param) = single_parameter(node, source) else {
        return false;
    };
    let Some(body) = node.child_by_field_name("body") else {
        return false;
    };

    let returned = if body.kind() == "statement_block" {
        let statements = named_children(body);
        let last = match detection {
            MixinDetection::Strict if statements.len() != 1 => return false,
            _ => statements.last().copied(),
        };
        match last {
            Some(stmt) if stmt.kind() == "return_statement" => {
                named_children(stmt).first().copied()
            }
            _ => None,
        }
    } else {
        Some(body)
    };

    let Some(returned) = returned else {
        return false;
    };
    let class_expr = unwrap_parens(returned);
    if class_expr.kind() != "class" {
        return false;
    }

    match class_heritage_expression(class_expr).map(unwrap_parens) {
        Some(sup) => sup.kind() == "identifier" && node_text(sup, source) == param,
        None => false,
    }
}

/// The name of the only parameter, when the function has exactly one plain identifier parameter.
fn single_parameter<'a>(func: Node<'a>, source: &'a [u8]) -> Option<&'a str> {
    // `p => …` binds the lone parameter directly.
    if let Some(param) = func.child_by_field_name("parameter") {
        return (param.kind() == "identifier").then(|| node_text(param, source));
    }

    let params = named_children(func.child_by_field_name("parameters")?);
    let [param] = params.as_slice() else {
        return None;
    };
    match param.kind() {
        "identifier" => Some(node_text(*param, source)),
        // TypeScript: `(superclass: Constructor<T>)`
        "required_parameter" => {
            let pattern = param.child_by_field_name("pattern")?;
            (pattern.kind() == "identifier").then(|| node_text(pattern, source))
        }
        _ => None,
    }
}
