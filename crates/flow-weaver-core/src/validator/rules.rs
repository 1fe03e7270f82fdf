//! The fixed core validator rules (§4.4), applied in a single traversal
//! ahead of any rule-registry entries.

use std::collections::HashSet;

use flow_weaver_contracts::DataType;

use crate::graph::topological_order;
use crate::model::workflow::{EXIT, START};
use crate::model::{Connection, Macro, Workflow};

use super::report::{Diagnostic, Location};

/// Run every core rule and return its diagnostics, in the fixed order
/// listed in §4.4.
pub fn run_core_rules(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    diags.extend(duplicate_instance_id(workflow));
    diags.extend(unknown_node_type(workflow));
    diags.extend(invalid_node_type(workflow));
    diags.extend(unknown_port(workflow));
    diags.extend(invalid_port_reference_format(workflow));
    diags.extend(cycle_in_main_flow(workflow));
    diags.extend(dead_end_node(workflow));
    diags.extend(isolated_node(workflow));
    diags.extend(disconnected_output_port(workflow));
    diags.extend(type_coercion_rules(workflow));
    diags.extend(coerce_macro_rules(workflow));
    diags.extend(scope_not_identifier(workflow));
    diags.extend(scope_without_context(workflow, false));
    diags.extend(coercion_nodetype_missing(workflow));
    diags
}

fn duplicate_instance_id(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let mut diags = Vec::new();
    for inst in &workflow.instances {
        if !seen.insert(inst.id.as_str()) {
            diags.push(
                Diagnostic::error("DUPLICATE_INSTANCE_ID", format!("duplicate instance id '{}'", inst.id))
                    .with_location(Location::instance(inst.id.clone())),
            );
        }
    }
    diags
}

fn unknown_node_type(workflow: &Workflow) -> Vec<Diagnostic> {
    workflow
        .instances
        .iter()
        .filter(|inst| workflow.resolve_node_type(&inst.node_type).is_none())
        .map(|inst| {
            Diagnostic::error(
                "UNKNOWN_NODE_TYPE",
                format!("instance '{}' references unknown nodeType '{}'", inst.id, inst.node_type),
            )
            .with_location(Location::instance(inst.id.clone()))
        })
        .collect()
}

fn invalid_node_type(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for nt in &workflow.node_types {
        if nt.has_success_port && !nt.outputs.values().any(|p| p.data_type == DataType::Step && !p.failure) {
            diags.push(Diagnostic::error(
                "INVALID_NODE_TYPE",
                format!("nodeType '{}' declares hasSuccessPort but has no STEP output", nt.name),
            ));
        }
        if nt.has_failure_port && !nt.outputs.values().any(|p| p.data_type == DataType::Step && p.failure) {
            diags.push(Diagnostic::error(
                "INVALID_NODE_TYPE",
                format!("nodeType '{}' declares hasFailurePort but has no failure STEP output", nt.name),
            ));
        }
        if let Some(scope) = &nt.scope {
            let hosts_scope = nt.inputs.values().chain(nt.outputs.values()).any(|p| p.scope.as_deref() == Some(scope));
            if !hosts_scope {
                diags.push(Diagnostic::error(
                    "INVALID_NODE_TYPE",
                    format!("nodeType '{}' declares scope '{scope}' but no port enters or exits it", nt.name),
                ));
            }
        }
    }
    diags
}

fn unknown_port(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for conn in &workflow.connections {
        if workflow.find_instance(&conn.from.node).is_some() || conn.from.node == START {
            if workflow.source_port_def(&conn.from).is_none() {
                diags.push(
                    Diagnostic::error("UNKNOWN_PORT", format!("unknown source port '{}'", conn.from))
                        .with_location(Location::port(conn.from.node.clone(), conn.from.port.clone())),
                );
            }
        }
        if workflow.find_instance(&conn.to.node).is_some() || conn.to.node == EXIT {
            if workflow.target_port_def(&conn.to).is_none() {
                diags.push(
                    Diagnostic::error("UNKNOWN_PORT", format!("unknown target port '{}'", conn.to))
                        .with_location(Location::port(conn.to.node.clone(), conn.to.port.clone())),
                );
            }
        }
    }
    diags
}

fn invalid_port_reference_format(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for conn in &workflow.connections {
        for (label, pref) in [("from", &conn.from), ("to", &conn.to)] {
            if pref.node.is_empty() || pref.port.is_empty() {
                diags.push(Diagnostic::error(
                    "INVALID_PORT_REFERENCE_FORMAT",
                    format!("connection {label} endpoint '{pref}' is not of shape node.port"),
                ));
            }
        }
    }
    diags
}

fn cycle_in_main_flow(workflow: &Workflow) -> Vec<Diagnostic> {
    let ids: Vec<String> = workflow.main_flow_instance_ids().into_iter().map(str::to_string).collect();
    let edges = control_flow_edges(workflow);
    match topological_order(&ids, &edges) {
        Ok(_) => Vec::new(),
        Err(involved) => vec![Diagnostic::error(
            "CYCLE_IN_MAIN_FLOW",
            format!("main flow contains a cycle involving {involved:?}"),
        )],
    }
}

fn control_flow_edges(workflow: &Workflow) -> Vec<(String, String)> {
    workflow
        .main_flow_connections()
        .into_iter()
        .filter(|c| is_control_flow_connection(workflow, c))
        .map(|c| (c.from.node.clone(), c.to.node.clone()))
        .filter(|(from, to)| from != START && to != EXIT)
        .collect()
}

fn is_control_flow_connection(workflow: &Workflow, conn: &Connection) -> bool {
    let from_step = workflow.source_port_def(&conn.from).map(|p| p.data_type == DataType::Step).unwrap_or(false);
    let to_step = workflow.target_port_def(&conn.to).map(|p| p.data_type == DataType::Step).unwrap_or(false);
    from_step || to_step
}

fn dead_end_node(workflow: &Workflow) -> Vec<Diagnostic> {
    crate::query::find_dead_ends(workflow)
        .into_iter()
        .map(|id| {
            Diagnostic::error("DEAD_END_NODE", format!("instance '{id}' never reaches Exit"))
                .with_location(Location::instance(id))
        })
        .collect()
}

fn isolated_node(workflow: &Workflow) -> Vec<Diagnostic> {
    crate::query::find_isolated_nodes(workflow)
        .into_iter()
        .map(|id| {
            Diagnostic::error("ISOLATED_NODE", format!("instance '{id}' has no main-flow connections"))
                .with_location(Location::instance(id))
        })
        .collect()
}

fn disconnected_output_port(workflow: &Workflow) -> Vec<Diagnostic> {
    crate::query::find_disconnected_output_ports(workflow)
        .into_iter()
        .map(|(id, port)| {
            Diagnostic::warning("DISCONNECTED_OUTPUT_PORT", format!("output port '{id}.{port}' is never consumed"))
                .with_location(Location::port(id, port))
        })
        .collect()
}

fn type_coercion_rules(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for conn in &workflow.connections {
        let Some(source) = workflow.source_port_def(&conn.from) else {
            continue;
        };
        let Some(target) = workflow.target_port_def(&conn.to) else {
            continue;
        };

        if source.data_type == DataType::Function || target.data_type == DataType::Function {
            if conn.coerce.is_some() {
                diags.push(
                    Diagnostic::error(
                        "COERCE_ON_FUNCTION_PORT",
                        format!("coerce is not allowed on FUNCTION endpoint '{}' -> '{}'", conn.from, conn.to),
                    )
                    .with_location(Location::port(conn.to.node.clone(), conn.to.port.clone())),
                );
            }
            continue;
        }

        match conn.coerce {
            Some(coercion) => {
                if source.data_type == target.data_type {
                    diags.push(Diagnostic::warning(
                        "REDUNDANT_COERCE",
                        format!("coerce between two ports of the same type '{:?}'", source.data_type),
                    ));
                }
                let produced = coercion.produces();
                if produced != target.data_type {
                    diags.push(Diagnostic::warning(
                        "COERCE_TYPE_MISMATCH",
                        format!(
                            "coerce as {:?} produces {:?} but target '{}' expects {:?}",
                            coercion, produced, conn.to, target.data_type
                        ),
                    ));
                }
            }
            None => {
                let class = source.data_type.lossiness_of(&target.data_type);
                let code = match class {
                    flow_weaver_contracts::CoercionClass::None => continue,
                    flow_weaver_contracts::CoercionClass::Unusual => "UNUSUAL_TYPE_COERCION",
                    flow_weaver_contracts::CoercionClass::Lossy => "LOSSY_TYPE_COERCION",
                    flow_weaver_contracts::CoercionClass::Incompatible => "TYPE_MISMATCH",
                };
                let message = format!(
                    "implicit conversion from {:?} to {:?} on '{}' -> '{}'",
                    source.data_type, target.data_type, conn.from, conn.to
                );
                if workflow.strict_types {
                    diags.push(Diagnostic::error("TYPE_INCOMPATIBLE", message));
                } else {
                    diags.push(Diagnostic::warning(code, message));
                }
            }
        }
    }
    diags
}

/// Same family of diagnostics as [`type_coercion_rules`], but keyed on a
/// `coerce ID SRC -> DST as T` macro's declared endpoints rather than an
/// inline `@connect ... as T` hint, since the macro's own `from`/`to`
/// still name the original (non-synthetic) ports after expansion.
fn coerce_macro_rules(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for m in &workflow.macros {
        let Macro::Coerce { id, from, to, as_type } = m else { continue };
        let Some(source) = workflow.source_port_def(from) else { continue };
        let Some(target) = workflow.target_port_def(to) else { continue };

        if source.data_type == DataType::Function || target.data_type == DataType::Function {
            diags.push(
                Diagnostic::error(
                    "COERCE_ON_FUNCTION_PORT",
                    format!("coerce '{id}' is not allowed on FUNCTION endpoint '{from}' -> '{to}'"),
                )
                .with_location(Location::instance(id.clone())),
            );
            continue;
        }

        if source.data_type == target.data_type {
            diags.push(
                Diagnostic::warning(
                    "REDUNDANT_COERCE",
                    format!("coerce '{id}' between two ports of the same type '{:?}'", source.data_type),
                )
                .with_location(Location::instance(id.clone())),
            );
        }

        let produced = as_type.produces();
        if produced != target.data_type {
            diags.push(
                Diagnostic::warning(
                    "COERCE_TYPE_MISMATCH",
                    format!(
                        "coerce '{id}' as {:?} produces {:?} but target '{to}' expects {:?}",
                        as_type, produced, target.data_type
                    ),
                )
                .with_location(Location::instance(id.clone())),
            );
        }
    }
    diags
}

fn scope_not_identifier(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for nt in &workflow.node_types {
        if let Some(scope) = &nt.scope {
            if !crate::model::scopes::is_valid_scope_identifier(scope) {
                diags.push(Diagnostic::error(
                    "SCOPE_NOT_IDENTIFIER",
                    format!("nodeType '{}' declares invalid scope identifier '{scope}'", nt.name),
                ));
            }
        }
    }
    for inst in &workflow.instances {
        if let Some(parent) = &inst.parent {
            if !crate::model::scopes::is_valid_scope_identifier(&parent.scope) {
                diags.push(
                    Diagnostic::error(
                        "SCOPE_NOT_IDENTIFIER",
                        format!("instance '{}' has invalid scope identifier '{}'", inst.id, parent.scope),
                    )
                    .with_location(Location::instance(inst.id.clone())),
                );
            }
        }
    }
    diags
}

fn scope_without_context(workflow: &Workflow, lenient: bool) -> Vec<Diagnostic> {
    if lenient {
        return Vec::new();
    }
    let mut diags = Vec::new();
    for conn in &workflow.connections {
        for pref in [&conn.from, &conn.to] {
            let Some(scope) = &pref.scope else { continue };
            let hosts = workflow
                .find_instance(&pref.node)
                .and_then(|inst| workflow.resolve_node_type(&inst.node_type))
                .map(|nt| nt.scope.as_deref() == Some(scope.as_str()))
                .unwrap_or(false);
            if !hosts {
                diags.push(
                    Diagnostic::error(
                        "SCOPE_WITHOUT_CONTEXT",
                        format!("'{pref}' references scope '{scope}' with no enclosing declaration"),
                    )
                    .with_location(Location::port(pref.node.clone(), pref.port.clone())),
                );
            }
        }
    }
    diags
}

fn coercion_nodetype_missing(workflow: &Workflow) -> Vec<Diagnostic> {
    workflow
        .macros
        .iter()
        .filter_map(|m| match m {
            Macro::Coerce { id, as_type, .. } => Some((id, as_type)),
            _ => None,
        })
        .filter_map(|(id, as_type)| {
            let canonical = as_type.canonical_node_type();
            let injected = workflow.node_types.iter().any(|nt| nt.name == canonical);
            (!injected).then(|| {
                Diagnostic::error(
                    "COERCION_NODETYPE_MISSING",
                    format!("coerce macro '{id}' refers to '{canonical}' which was never injected into nodeTypes"),
                )
                .with_location(Location::instance(id.clone()))
            })
        })
        .collect()
}
