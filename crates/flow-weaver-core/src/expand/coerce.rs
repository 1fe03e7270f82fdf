//! `coerce ID SRC -> DST as T` expansion (§4.2).

use std::collections::HashSet;

use flow_weaver_contracts::NodeType;

use crate::model::workflow::START;
use crate::model::{Connection, Macro, NodeInstance, PortRef, Workflow};

use super::ExpandError;

/// Expand every `Macro::Coerce` recorded on `workflow`.
///
/// Re-running this on an already-expanded workflow is a no-op for
/// macros that were previously expanded (detected by an existing
/// instance at the macro's id already carrying the expected canonical
/// node type) — expansion must be idempotent because invariant 9
/// requires the synthetic instance to persist in the canonical AST
/// alongside its originating macro.
pub fn expand_coerce_macros(workflow: &Workflow) -> (Workflow, Vec<ExpandError>) {
    let mut wf = workflow.clone();
    let mut errors = Vec::new();
    let mut injected_canonical: HashSet<String> = wf
        .node_types
        .iter()
        .filter(|nt| matches!(nt.variant, Some(flow_weaver_contracts::NodeVariant::Coercion)))
        .map(|nt| nt.name.clone())
        .collect();

    let macros = wf.macros.clone();
    for m in &macros {
        let Macro::Coerce { id, from, to, as_type } = m else {
            continue;
        };

        let canonical = as_type.canonical_node_type();

        if let Some(existing) = wf.find_instance(id) {
            if existing.node_type == canonical && existing.parent.is_none() {
                continue;
            }
            errors.push(ExpandError::new(format!(
                "coerce id '{id}' collides with an existing instance"
            )));
            continue;
        }

        if from.node != START && wf.find_instance(&from.node).is_none() {
            errors.push(ExpandError::new(format!(
                "coerce '{id}': source node '{}' is not a declared instance",
                from.node
            )));
            continue;
        }

        if !injected_canonical.contains(canonical) {
            wf.node_types.push(NodeType::coercion(canonical, as_type.produces()));
            injected_canonical.insert(canonical.to_string());
        }

        wf.instances.push(NodeInstance::new(id.clone(), canonical));
        wf.connections.push(Connection::new(from.clone(), PortRef::new(id.clone(), "value")));
        wf.connections.push(Connection::new(PortRef::new(id.clone(), "result"), to.clone()));
    }

    (wf, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_weaver_contracts::Coercion;

    #[test]
    fn expands_a_coerce_macro() {
        let mut wf = Workflow::default();
        wf.instances.push(NodeInstance::new("src", "producer"));
        wf.instances.push(NodeInstance::new("dst", "consumer"));
        wf.macros.push(Macro::Coerce {
            id: "c1".into(),
            from: PortRef::new("src", "text"),
            to: PortRef::new("dst", "amount"),
            as_type: Coercion::Number,
        });

        let (wf2, errors) = expand_coerce_macros(&wf);
        assert!(errors.is_empty());
        assert!(wf2.find_instance("c1").is_some());
        assert_eq!(wf2.connections.len(), 2);
        assert_eq!(
            wf2.node_types
                .iter()
                .filter(|nt| nt.name == "__fw_toNumber")
                .count(),
            1
        );
    }

    #[test]
    fn re_expansion_is_idempotent() {
        let mut wf = Workflow::default();
        wf.instances.push(NodeInstance::new("src", "producer"));
        wf.macros.push(Macro::Coerce {
            id: "c1".into(),
            from: PortRef::new("src", "text"),
            to: PortRef::new("dst", "amount"),
            as_type: Coercion::Number,
        });
        let (wf2, _) = expand_coerce_macros(&wf);
        let (wf3, errors) = expand_coerce_macros(&wf2);
        assert!(errors.is_empty());
        assert_eq!(wf3.instances.len(), wf2.instances.len());
        assert_eq!(wf3.connections.len(), wf2.connections.len());
    }

    #[test]
    fn collision_with_unrelated_instance_is_an_error() {
        let mut wf = Workflow::default();
        wf.instances.push(NodeInstance::new("c1", "something-else"));
        wf.instances.push(NodeInstance::new("src", "producer"));
        wf.macros.push(Macro::Coerce {
            id: "c1".into(),
            from: PortRef::new("src", "text"),
            to: PortRef::new("dst", "amount"),
            as_type: Coercion::Number,
        });
        let (_, errors) = expand_coerce_macros(&wf);
        assert_eq!(errors.len(), 1);
    }
}
