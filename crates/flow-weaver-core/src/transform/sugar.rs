//! The sugar optimizer (§4.5): detects maximal linear control-flow
//! chains and records them as `path` macros, dropping macros that have
//! gone stale relative to the current instances/connections.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use flow_weaver_contracts::DataType;

use crate::model::workflow::{EXIT, START};
use crate::model::{Connection, Macro, PathStep, PortRef, Route, Workflow};

use super::Transformer;

pub struct SugarOptimizer;

impl Transformer for SugarOptimizer {
    fn name(&self) -> String {
        "sugarOptimizer".to_string()
    }

    fn transform(&self, workflow: &Workflow) -> Workflow {
        optimize(workflow)
    }
}

pub fn optimize(workflow: &Workflow) -> Workflow {
    let mut wf = workflow.clone();
    let mut macros: Vec<Macro> = filter_stale_macros(&wf)
        .into_iter()
        .filter(|m| !matches!(m, Macro::Path { .. }))
        .collect();

    let mut fresh: Vec<Macro> = enumerate_paths(&wf).into_iter().map(|steps| Macro::Path { steps }).collect();
    fresh.sort_by_key(|m| match m {
        Macro::Path { steps } => steps.iter().map(|s| s.node.clone()).collect::<Vec<_>>().join("/"),
        _ => String::new(),
    });

    macros.extend(fresh);
    wf.macros = macros;
    wf
}

/// All maximal linear control-flow chains, one `PathStep` list per
/// distinct branch taken (§4.5, §8 scenario 2): full `Start -> ... ->
/// Exit` runs, and the shorter internal chains the full runs don't reach
/// — one per fan-out target or merge point, since neither is a simple
/// linear continuation of any single predecessor.
///
/// A node contributes a step to a chain only while its chosen outgoing
/// control-flow port targets exactly one connection ("single-target on
/// the selected route"); a node with two single-target routes (e.g.
/// `onSuccess` and `onFailure` each going somewhere different) forks the
/// enumeration into two chains.
pub fn enumerate_paths(workflow: &Workflow) -> Vec<Vec<PathStep>> {
    let groups = control_flow_groups(workflow);
    let mut out = Vec::new();

    let mut visiting = HashSet::new();
    visiting.insert(START.to_string());
    walk(START, vec![PathStep::ok(START)], &groups, &mut visiting, &mut out);

    for start in chain_start_candidates(&groups) {
        if start == START || start == EXIT {
            continue;
        }
        let mut visiting = HashSet::new();
        visiting.insert(start.clone());
        walk(&start, vec![PathStep::ok(start.clone())], &groups, &mut visiting, &mut out);
    }

    out
}

/// Nodes where a new chain has to begin because no single predecessor
/// "owns" them as a linear continuation: fan-out targets (their source's
/// outgoing route has more than one target, so the source's own walk
/// can't extend into any of them) and merge points (more than one
/// distinct incoming control-flow edge). Sorted for deterministic output.
fn chain_start_candidates(groups: &Groups) -> Vec<String> {
    let mut incoming: BTreeMap<String, BTreeSet<(String, String)>> = BTreeMap::new();
    let mut fan_out_targets: BTreeSet<String> = BTreeSet::new();

    for ((from_node, from_port), conns) in groups {
        if conns.len() > 1 {
            for c in conns {
                fan_out_targets.insert(c.to.node.clone());
            }
        }
        for c in conns {
            incoming.entry(c.to.node.clone()).or_default().insert((from_node.clone(), from_port.clone()));
        }
    }

    let merge_points = incoming.into_iter().filter(|(_, sources)| sources.len() > 1).map(|(node, _)| node);

    fan_out_targets.into_iter().chain(merge_points).collect::<BTreeSet<_>>().into_iter().collect()
}

type Groups = BTreeMap<(String, String), Vec<Connection>>;

fn control_flow_groups(workflow: &Workflow) -> Groups {
    let mut groups: Groups = BTreeMap::new();
    for conn in workflow.main_flow_connections() {
        if conn.touches_scope() {
            continue;
        }
        let is_control = workflow
            .source_port_def(&conn.from)
            .map(|p| p.data_type == DataType::Step)
            .unwrap_or(false)
            || workflow
                .target_port_def(&conn.to)
                .map(|p| p.data_type == DataType::Step)
                .unwrap_or(false);
        if !is_control {
            continue;
        }
        groups
            .entry((conn.from.node.clone(), conn.from.port.clone()))
            .or_default()
            .push(conn.clone());
    }
    groups
}

fn walk(node: &str, acc: Vec<PathStep>, groups: &Groups, visiting: &mut HashSet<String>, out: &mut Vec<Vec<PathStep>>) {
    let outgoing: Vec<&(String, String)> = groups.keys().filter(|(n, _)| n == node).collect();

    let mut extended = false;
    for key in outgoing {
        let conns = &groups[key];
        if conns.len() != 1 {
            // fan-out: not a single-target route, chain can't extend through here
            continue;
        }
        let target = &conns[0].to.node;
        if visiting.contains(target) {
            continue;
        }
        extended = true;
        let route = if key.1 == "onFailure" { Route::Fail } else { Route::Ok };
        let mut next_acc = acc.clone();
        next_acc.push(PathStep { node: target.clone(), route });

        if target == EXIT {
            out.push(next_acc);
        } else {
            visiting.insert(target.clone());
            walk(target, next_acc, groups, visiting, out);
            visiting.remove(target);
        }
    }

    // Dead end: no outgoing edge, or every outgoing route was a fan-out this
    // node can't linearly extend through. The chain built so far still
    // belongs in the output — it's one of the "shorter chains" a full
    // Start-to-Exit run never reaches.
    if !extended && acc.len() > 1 {
        out.push(acc);
    }
}

/// Drop macros whose referenced instances or implied connections no
/// longer exist on `workflow`.
pub fn filter_stale_macros(workflow: &Workflow) -> Vec<Macro> {
    workflow.macros.iter().filter(|m| !is_stale(m, workflow)).cloned().collect()
}

fn is_stale(m: &Macro, workflow: &Workflow) -> bool {
    match m {
        Macro::Path { steps } => {
            steps.iter().any(|s| s.node != START && s.node != EXIT && workflow.find_instance(&s.node).is_none())
                || !path_edges(steps).iter().all(|(from, to)| workflow.connections.iter().any(|c| c.from == *from && c.to == *to))
        }
        Macro::FanOut { from, targets } => {
            !endpoint_exists(from, workflow) || targets.iter().any(|t| !endpoint_exists(t, workflow))
        }
        Macro::FanIn { sources, target } => {
            !endpoint_exists(target, workflow) || sources.iter().any(|s| !endpoint_exists(s, workflow))
        }
        Macro::Coerce { id, .. } => workflow.find_instance(id).is_none(),
        Macro::Map { entries } => entries.iter().any(|(from, to)| !endpoint_exists(from, workflow) || !endpoint_exists(to, workflow)),
    }
}

fn endpoint_exists(port_ref: &PortRef, workflow: &Workflow) -> bool {
    port_ref.node == START || port_ref.node == EXIT || workflow.find_instance(&port_ref.node).is_some()
}

fn path_edges(steps: &[PathStep]) -> Vec<(PortRef, PortRef)> {
    steps
        .windows(2)
        .map(|pair| {
            let prev = &pair[0];
            let next = &pair[1];
            let from_port = if prev.node == START { "execute".to_string() } else { route_port(next.route) };
            let to_port = if next.node == EXIT { route_port(next.route) } else { "execute".to_string() };
            (PortRef::new(prev.node.clone(), from_port), PortRef::new(next.node.clone(), to_port))
        })
        .collect()
}

fn route_port(route: Route) -> String {
    match route {
        Route::Ok => "onSuccess".to_string(),
        Route::Fail => "onFailure".to_string(),
    }
}

/// Whether `connection` is implied by some recorded `path` macro, either
/// as control flow along the path or as same-name data forwarding
/// between path-adjacent nodes (§4.5).
pub fn is_connection_covered_by_sugar(connection: &Connection, workflow: &Workflow) -> bool {
    for m in &workflow.macros {
        let Macro::Path { steps } = m else { continue };
        if path_edges(steps).iter().any(|(from, to)| *from == connection.from && *to == connection.to) {
            return true;
        }
        let adjacent = steps.windows(2).any(|pair| pair[0].node == connection.from.node && pair[1].node == connection.to.node);
        if adjacent && connection.from.port == connection.to.port {
            return true;
        }
    }
    false
}
