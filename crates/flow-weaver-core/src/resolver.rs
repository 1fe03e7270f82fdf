//! Stage 3: reference resolution (§4.3).
//!
//! Normalizes every `nodeType` reference to its canonical
//! (`functionName`-preferring) key, infers `startPorts`/`exitPorts`
//! entries implied by connections touching `Start`/`Exit`, and
//! recomputes the `scopes` index from each instance's `parent`.

use flow_weaver_contracts::{DataType, PortDef};

use crate::model::scopes::compute_scopes;
use crate::model::workflow::{EXIT, START};
use crate::model::Workflow;

/// Governs the one behavior §9's Open Question leaves to the
/// implementer: whether a `scope:X` port attribute is accepted when no
/// enclosing `@scope X` declaration exists on its `nodeType`.
///
/// Resolved decision: default to strict (`false`) — a `NodeType` with no
/// declared `scope` keeps it absent, and the validator's
/// `SCOPE_WITHOUT_CONTEXT` rule (`validator::ValidateOptions`) is left to
/// flag any port that names a scope without one. When `true`, this stage
/// infers the missing declaration itself: the first scope identifier
/// found on any of the type's own ports (inputs before outputs, in the
/// BTreeMap's key order) becomes `NodeType.scope`, so a `nodeType` block
/// that only ever tags its ports with `scope:X` still resolves into a
/// valid scope host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub lenient_scope: bool,
}

/// Resolve all references on `workflow`, returning a new value.
pub fn resolve(workflow: &Workflow, options: ResolveOptions) -> Workflow {
    let mut wf = workflow.clone();

    for instance in &mut wf.instances {
        if let Some(nt) = workflow.resolve_node_type(&instance.node_type) {
            instance.node_type = nt.function_name.clone();
        }
    }

    if options.lenient_scope {
        for nt in &mut wf.node_types {
            if nt.scope.is_none() {
                nt.scope = nt
                    .inputs
                    .values()
                    .chain(nt.outputs.values())
                    .find_map(|port| port.scope.clone());
            }
        }
    }

    wf.start_ports
        .entry("execute".to_string())
        .or_insert_with(PortDef::control_flow);

    let start_connections: Vec<_> = workflow
        .connections
        .iter()
        .filter(|c| c.from.node == START)
        .map(|c| c.clone())
        .collect();
    for conn in &start_connections {
        wf.start_ports.entry(conn.from.port.clone()).or_insert_with(|| {
            let inferred = workflow
                .find_instance(&conn.to.node)
                .and_then(|inst| workflow.resolve_node_type(&inst.node_type))
                .and_then(|nt| nt.inputs.get(&conn.to.port))
                .map(|p| p.data_type)
                .unwrap_or(DataType::Any);
            PortDef::required(inferred)
        });
    }

    let exit_connections: Vec<_> = workflow
        .connections
        .iter()
        .filter(|c| c.to.node == EXIT)
        .map(|c| c.clone())
        .collect();
    for conn in &exit_connections {
        wf.exit_ports.entry(conn.to.port.clone()).or_insert_with(|| {
            let inferred = workflow
                .find_instance(&conn.from.node)
                .and_then(|inst| workflow.resolve_node_type(&inst.node_type))
                .and_then(|nt| nt.outputs.get(&conn.from.port))
                .map(|p| p.data_type)
                .unwrap_or(DataType::Any);
            PortDef::required(inferred)
        });
    }

    wf.scopes = compute_scopes(&wf.instances);
    wf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, NodeInstance, PortRef};
    use flow_weaver_contracts::NodeType;

    #[test]
    fn canonicalizes_to_function_name() {
        let mut wf = Workflow::default();
        wf.node_types.push(NodeType::new("Process Step", "process_step"));
        wf.instances.push(NodeInstance::new("n1", "Process Step"));
        let resolved = resolve(&wf, ResolveOptions::default());
        assert_eq!(resolved.instances[0].node_type, "process_step");
    }

    #[test]
    fn infers_exit_port_type_from_source() {
        let mut wf = Workflow::default();
        let nt = NodeType::new("p", "p").with_output("result", PortDef::required(DataType::Number));
        wf.node_types.push(nt);
        wf.instances.push(NodeInstance::new("n1", "p"));
        wf.connections
            .push(Connection::new(PortRef::new("n1", "result"), PortRef::new(EXIT, "value")));
        let resolved = resolve(&wf, ResolveOptions::default());
        assert_eq!(resolved.exit_ports["value"].data_type, DataType::Number);
    }

    #[test]
    fn always_has_execute_start_port() {
        let wf = Workflow::default();
        let resolved = resolve(&wf, ResolveOptions::default());
        assert!(resolved.start_ports.contains_key("execute"));
    }

    #[test]
    fn recomputes_scopes_from_parents() {
        let mut wf = Workflow::default();
        wf.instances.push(NodeInstance::new("loop", "for_each"));
        wf.instances
            .push(NodeInstance::new("proc", "process").with_parent("loop", "iteration"));
        let resolved = resolve(&wf, ResolveOptions::default());
        assert_eq!(resolved.scopes["loop.iteration"], vec!["proc".to_string()]);
    }

    #[test]
    fn strict_mode_leaves_an_undeclared_scope_absent() {
        let mut wf = Workflow::default();
        let nt = NodeType::new("ForEach", "for_each")
            .with_output("item", PortDef::required(DataType::Any).with_scope("iteration"));
        wf.node_types.push(nt);
        let resolved = resolve(&wf, ResolveOptions::default());
        assert_eq!(resolved.node_types[0].scope, None);
    }

    #[test]
    fn lenient_mode_infers_scope_from_a_tagged_port() {
        let mut wf = Workflow::default();
        let nt = NodeType::new("ForEach", "for_each")
            .with_output("item", PortDef::required(DataType::Any).with_scope("iteration"));
        wf.node_types.push(nt);
        let resolved = resolve(&wf, ResolveOptions { lenient_scope: true });
        assert_eq!(resolved.node_types[0].scope.as_deref(), Some("iteration"));
    }

    #[test]
    fn lenient_mode_does_not_override_an_explicit_scope() {
        let mut wf = Workflow::default();
        let mut nt = NodeType::new("ForEach", "for_each")
            .with_output("item", PortDef::required(DataType::Any).with_scope("iteration"));
        nt.scope = Some("explicit".to_string());
        wf.node_types.push(nt);
        let resolved = resolve(&wf, ResolveOptions { lenient_scope: true });
        assert_eq!(resolved.node_types[0].scope.as_deref(), Some("explicit"));
    }
}
