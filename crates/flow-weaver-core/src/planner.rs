//! The planner (§4.6): turns a validated workflow into an execution
//! plan a code-generator backend can consume.

use std::collections::BTreeMap;

use crate::error::PlanError;
use crate::graph;
use crate::model::Workflow;

/// `{order, groups, scopes}` — §6's `plan(workflow)` return shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub order: Vec<String>,
    pub groups: Vec<Vec<String>>,
    pub scopes: BTreeMap<String, Plan>,
}

/// Build a plan for `workflow`, recursing into every declared scope.
/// Raises [`PlanError`] — "the only condition where a plan is
/// impossible" (§7) — on the outer plan or any scope plan.
pub fn plan(workflow: &Workflow) -> Result<Plan, PlanError> {
    let ids: Vec<String> = workflow.main_flow_instance_ids().into_iter().map(str::to_string).collect();
    let edges: Vec<(String, String)> = workflow
        .main_flow_connections()
        .into_iter()
        .map(|c| (c.from.node.clone(), c.to.node.clone()))
        .filter(|(from, to)| from != crate::model::workflow::START && to != crate::model::workflow::EXIT)
        .collect();

    let groups = graph::execution_groups(&ids, &edges).map_err(|involved| PlanError { involved })?;
    let order = groups.iter().flatten().cloned().collect();

    let mut scopes = BTreeMap::new();
    for (scope_key, member_ids) in &workflow.scopes {
        scopes.insert(scope_key.clone(), plan_scope(workflow, member_ids)?);
    }

    Ok(Plan { order, groups, scopes })
}

fn plan_scope(workflow: &Workflow, member_ids: &[String]) -> Result<Plan, PlanError> {
    let ids: Vec<String> = member_ids.to_vec();
    let members: std::collections::HashSet<&str> = ids.iter().map(String::as_str).collect();
    let edges: Vec<(String, String)> = workflow
        .connections
        .iter()
        .filter(|c| members.contains(c.from.node.as_str()) && members.contains(c.to.node.as_str()))
        .map(|c| (c.from.node.clone(), c.to.node.clone()))
        .collect();

    let groups = graph::execution_groups(&ids, &edges).map_err(|involved| PlanError { involved })?;
    let order = groups.iter().flatten().cloned().collect();
    Ok(Plan { order, groups, scopes: BTreeMap::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::workflow::{EXIT, START};
    use crate::model::{Connection, NodeInstance, PortRef};
    use flow_weaver_contracts::{NodeType, PortDef};

    fn process_type() -> NodeType {
        NodeType::new("Process", "process")
            .with_input("execute", PortDef::control_flow())
            .with_output("onSuccess", PortDef::control_flow())
    }

    #[test]
    fn orders_a_linear_pipeline() {
        let mut wf = Workflow::default();
        wf.node_types.push(process_type());
        wf.instances.push(NodeInstance::new("step1", "process"));
        wf.instances.push(NodeInstance::new("step2", "process"));
        wf.connections.push(Connection::new(PortRef::new(START, "execute"), PortRef::new("step1", "execute")));
        wf.connections.push(Connection::new(PortRef::new("step1", "onSuccess"), PortRef::new("step2", "execute")));
        wf.connections.push(Connection::new(PortRef::new("step2", "onSuccess"), PortRef::new(EXIT, "onSuccess")));

        let result = plan(&wf).unwrap();
        assert_eq!(result.order, vec!["step1".to_string(), "step2".to_string()]);
        assert_eq!(result.groups, vec![vec!["step1".to_string()], vec!["step2".to_string()]]);
    }

    #[test]
    fn cycle_is_an_error() {
        let mut wf = Workflow::default();
        wf.node_types.push(process_type());
        wf.instances.push(NodeInstance::new("a", "process"));
        wf.instances.push(NodeInstance::new("b", "process"));
        wf.connections.push(Connection::new(PortRef::new("a", "onSuccess"), PortRef::new("b", "execute")));
        wf.connections.push(Connection::new(PortRef::new("b", "onSuccess"), PortRef::new("a", "execute")));

        assert!(matches!(plan(&wf), Err(PlanError { .. })));
    }

    #[test]
    fn scoped_child_is_excluded_from_outer_order_but_planned_separately() {
        let mut wf = Workflow::default();
        let mut host = NodeType::new("ForEach", "for_each");
        host.scope = Some("iteration".to_string());
        wf.node_types.push(host);
        wf.node_types.push(process_type());
        wf.instances.push(NodeInstance::new("loop", "for_each"));
        wf.instances.push(NodeInstance::new("proc", "process").with_parent("loop", "iteration"));
        wf.scopes.insert("loop.iteration".to_string(), vec!["proc".to_string()]);

        let result = plan(&wf).unwrap();
        assert!(!result.order.contains(&"proc".to_string()));
        assert_eq!(result.scopes["loop.iteration"].order, vec!["proc".to_string()]);
    }
}
