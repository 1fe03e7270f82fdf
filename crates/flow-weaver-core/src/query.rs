//! Read-only query helpers over a resolved workflow (§6).
//!
//! These are the primitives the validator's `DEAD_END_NODE` /
//! `ISOLATED_NODE` / `DISCONNECTED_OUTPUT_PORT` rules are built on, so a
//! consumer who only wants the underlying lists (for a UI or a CLI
//! `explain` command) doesn't have to re-derive them from diagnostics.

use std::collections::{HashMap, HashSet, VecDeque};

use flow_weaver_contracts::DataType;

use crate::error::PlanError;
use crate::graph;
use crate::model::workflow::{EXIT, START};
use crate::model::{Connection, NodeInstance, Workflow};

pub fn get_node<'a>(workflow: &'a Workflow, id: &str) -> Option<&'a NodeInstance> {
    workflow.find_instance(id)
}

pub fn get_nodes<'a>(workflow: &'a Workflow, filter: impl Fn(&NodeInstance) -> bool) -> Vec<&'a NodeInstance> {
    workflow.instances.iter().filter(|i| filter(i)).collect()
}

pub fn get_incoming_connections<'a>(workflow: &'a Workflow, node_id: &str) -> Vec<&'a Connection> {
    workflow.incoming_connections(node_id).collect()
}

pub fn get_outgoing_connections<'a>(workflow: &'a Workflow, node_id: &str) -> Vec<&'a Connection> {
    workflow.outgoing_connections(node_id).collect()
}

pub fn count_nodes(workflow: &Workflow) -> usize {
    workflow.instances.len()
}

pub fn count_connections(workflow: &Workflow) -> usize {
    workflow.connections.len()
}

fn is_control_flow_connection(workflow: &Workflow, conn: &Connection) -> bool {
    workflow.source_port_def(&conn.from).map(|p| p.data_type == DataType::Step).unwrap_or(false)
        || workflow.target_port_def(&conn.to).map(|p| p.data_type == DataType::Step).unwrap_or(false)
}

/// Predecessor instance ids `node_id` depends on: excludes predecessors
/// reachable only through control-flow edges, and excludes `Start` when
/// the only edge is `Start.execute` (§4.4 edge-case policy).
pub fn get_dependencies(workflow: &Workflow, node_id: &str) -> Vec<String> {
    let mut deps: Vec<String> = get_incoming_connections(workflow, node_id)
        .into_iter()
        .filter(|c| !is_control_flow_connection(workflow, c))
        .filter(|c| !(c.from.node == START && c.from.port == "execute"))
        .map(|c| c.from.node.clone())
        .collect();
    deps.sort();
    deps.dedup();
    deps
}

/// Alias kept distinct from [`get_dependencies`] for callers that want to
/// be explicit that they mean data-carrying predecessors specifically —
/// identical today since `get_dependencies` already excludes every
/// control-flow edge.
pub fn get_data_dependencies(workflow: &Workflow, node_id: &str) -> Vec<String> {
    get_dependencies(workflow, node_id)
}

/// Instance ids that depend on `node_id` (the reverse of [`get_dependencies`]).
pub fn get_dependents(workflow: &Workflow, node_id: &str) -> Vec<String> {
    let mut deps: Vec<String> = get_outgoing_connections(workflow, node_id)
        .into_iter()
        .filter(|c| !is_control_flow_connection(workflow, c))
        .filter(|c| !(c.to.node == EXIT))
        .map(|c| c.to.node.clone())
        .collect();
    deps.sort();
    deps.dedup();
    deps
}

/// The transitive closure of [`get_dependencies`] over `node_id`.
pub fn get_transitive_dependencies(workflow: &Workflow, node_id: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<String> = get_dependencies(workflow, node_id).into_iter().collect();
    let mut out = Vec::new();
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        out.push(id.clone());
        queue.extend(get_dependencies(workflow, &id));
    }
    out.sort();
    out
}

/// Shortest node-id path from `from` to `to` over any connection
/// (control or data), breadth-first, or `None` if unreachable.
pub fn find_path(workflow: &Workflow, from: &str, to: &str) -> Option<Vec<String>> {
    if from == to {
        return Some(vec![from.to_string()]);
    }
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for conn in &workflow.connections {
        adjacency.entry(conn.from.node.as_str()).or_default().push(conn.to.node.as_str());
    }

    let mut visited = HashSet::new();
    visited.insert(from);
    let mut queue = VecDeque::new();
    queue.push_back(vec![from]);

    while let Some(path) = queue.pop_front() {
        let last = *path.last().unwrap();
        for &next in adjacency.get(last).unwrap_or(&Vec::new()) {
            if next == to {
                let mut full = path.clone();
                full.push(next);
                return Some(full.into_iter().map(str::to_string).collect());
            }
            if visited.insert(next) {
                let mut extended = path.clone();
                extended.push(next);
                queue.push_back(extended);
            }
        }
    }
    None
}

fn main_flow_edges(workflow: &Workflow) -> (Vec<String>, Vec<(String, String)>) {
    let ids: Vec<String> = workflow.main_flow_instance_ids().into_iter().map(str::to_string).collect();
    let edges = workflow
        .main_flow_connections()
        .into_iter()
        .map(|c| (c.from.node.clone(), c.to.node.clone()))
        .filter(|(from, to)| from != START && to != EXIT)
        .collect();
    (ids, edges)
}

pub fn get_topological_order(workflow: &Workflow) -> Result<Vec<String>, PlanError> {
    let (ids, edges) = main_flow_edges(workflow);
    graph::topological_order(&ids, &edges).map_err(|involved| PlanError { involved })
}

pub fn get_execution_groups(workflow: &Workflow) -> Result<Vec<Vec<String>>, PlanError> {
    let (ids, edges) = main_flow_edges(workflow);
    graph::execution_groups(&ids, &edges).map_err(|involved| PlanError { involved })
}

/// Per-node DFS over main-flow connections: a node is a dead end unless
/// some path (direct or transitive through dependents) reaches `Exit`
/// (§4.4 edge-case policy).
pub fn find_dead_ends(workflow: &Workflow) -> Vec<String> {
    let adjacency = control_flow_adjacency(workflow);
    workflow
        .main_flow_instance_ids()
        .into_iter()
        .filter(|id| !reaches_exit(id, &adjacency, &mut HashSet::new()))
        .map(str::to_string)
        .collect()
}

fn control_flow_adjacency<'a>(workflow: &'a Workflow) -> HashMap<&'a str, Vec<&'a str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for conn in workflow.main_flow_connections() {
        if is_control_flow_connection(workflow, conn) {
            adjacency.entry(conn.from.node.as_str()).or_default().push(conn.to.node.as_str());
        }
    }
    adjacency
}

fn reaches_exit<'a>(node: &'a str, adjacency: &HashMap<&'a str, Vec<&'a str>>, visiting: &mut HashSet<&'a str>) -> bool {
    if node == EXIT {
        return true;
    }
    if !visiting.insert(node) {
        return false;
    }
    let reached = adjacency
        .get(node)
        .map(|targets| targets.iter().any(|t| reaches_exit(t, adjacency, visiting)))
        .unwrap_or(false);
    visiting.remove(node);
    reached
}

/// Non-scoped instances with no main-flow connections at all.
pub fn find_isolated_nodes(workflow: &Workflow) -> Vec<String> {
    let touched: HashSet<&str> =
        workflow.main_flow_connections().into_iter().flat_map(|c| [c.from.node.as_str(), c.to.node.as_str()]).collect();

    workflow.main_flow_instance_ids().into_iter().filter(|id| !touched.contains(id)).map(str::to_string).collect()
}

/// `(instance id, port name)` pairs for non-control-flow, non-failure,
/// non-scoped output ports that nothing consumes.
pub fn find_disconnected_output_ports(workflow: &Workflow) -> Vec<(String, String)> {
    let consumed: HashSet<(&str, &str)> =
        workflow.connections.iter().map(|c| (c.from.node.as_str(), c.from.port.as_str())).collect();

    let mut out = Vec::new();
    for inst in &workflow.instances {
        if crate::model::scopes::is_scoped_child(inst, workflow) {
            continue;
        }
        let Some(nt) = workflow.resolve_node_type(&inst.node_type) else {
            continue;
        };
        for (name, port) in &nt.outputs {
            if port.data_type == DataType::Step || port.failure || port.scope.is_some() {
                continue;
            }
            if !consumed.contains(&(inst.id.as_str(), name.as_str())) {
                out.push((inst.id.clone(), name.clone()));
            }
        }
    }
    out
}
