//! Scope identifier validation and qualified-scope bookkeeping.
//!
//! A per-port scope is hosted by a single parent node and entered/exited
//! through scoped ports (GLOSSARY). Scope membership is a DAG by
//! construction — an instance has at most one `parent` — so it is
//! reconstructed as a `qualifiedScope -> instance ids` index rather than
//! stored as back-pointers, mirroring the teacher's `NodeGroup` index
//! (`node-engine::groups`) and spec.md §9's "store parents as
//! back-references and reconstruct children lazily via an index".

use std::collections::BTreeMap;

use super::workflow::{NodeInstance, Workflow};

/// Scope identifiers are valid identifiers: `[A-Za-z_$][A-Za-z0-9_$]*`
/// (invariant 7).
pub fn is_valid_scope_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let first_ok = first.is_ascii_alphabetic() || first == '_' || first == '$';
    if !first_ok {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// A qualified scope name, `id.scope`, used as the key of
/// `Workflow::scopes` (invariant 6).
pub fn qualify(parent_id: &str, scope: &str) -> String {
    format!("{parent_id}.{scope}")
}

/// Split a qualified scope name back into `(parent_id, scope)`. Only the
/// first `.` is significant — instance ids themselves never contain `.`.
pub fn unqualify(qualified: &str) -> Option<(&str, &str)> {
    qualified.split_once('.')
}

/// Recompute `scopes[qualifiedScope] = instance ids` from each instance's
/// `parent` field (§4.3 Reference Resolver: "Compute `scopes[qualifiedScope]`
/// from each instance's `parent`").
pub fn compute_scopes(instances: &[NodeInstance]) -> BTreeMap<String, Vec<String>> {
    let mut scopes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for inst in instances {
        if let Some(parent) = &inst.parent {
            scopes
                .entry(qualify(&parent.id, &parent.scope))
                .or_default()
                .push(inst.id.clone());
        }
    }
    scopes
}

/// Whether `inst` is a "per-port scoped child": it has a `parent`, and
/// that parent's `NodeType` actually declares the named scope (§4.3).
pub fn is_scoped_child(inst: &NodeInstance, workflow: &Workflow) -> bool {
    let Some(parent) = &inst.parent else {
        return false;
    };
    let Some(parent_inst) = workflow.find_instance(&parent.id) else {
        return false;
    };
    let Some(parent_type) = workflow.resolve_node_type(&parent_inst.node_type) else {
        return false;
    };
    parent_type.scope.as_deref() == Some(parent.scope.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        assert!(is_valid_scope_identifier("iteration"));
        assert!(is_valid_scope_identifier("_private"));
        assert!(is_valid_scope_identifier("$loop"));
        assert!(is_valid_scope_identifier("a1_2"));
    }

    #[test]
    fn invalid_identifiers() {
        assert!(!is_valid_scope_identifier("1loop"));
        assert!(!is_valid_scope_identifier(""));
        assert!(!is_valid_scope_identifier("has space"));
        assert!(!is_valid_scope_identifier("has-dash"));
    }

    #[test]
    fn qualify_roundtrip() {
        let q = qualify("loop", "iteration");
        assert_eq!(q, "loop.iteration");
        assert_eq!(unqualify(&q), Some(("loop", "iteration")));
    }
}
