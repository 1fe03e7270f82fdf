//! Deterministic Kahn's-algorithm topological sort, shared by the
//! validator's `CYCLE_IN_MAIN_FLOW` rule and the planner (§4.4, §4.6).
//!
//! Grounded on the teacher's `detect_cycles`/`detect_orchestration_cycles`
//! (`node_engine::validation`), generalized from "cycle yes/no" to a full
//! order and fixed to be deterministic: the teacher's version drains a
//! `HashMap`-backed queue in arbitrary order, so two runs over the same
//! graph can disagree on tie-breaks. This version pops the
//! lexicographically smallest ready id every step (§4.6: "tie-break by
//! ascending instance id").

use std::collections::{BTreeMap, BTreeSet};

/// Topologically sort `ids` under `edges` (`from -> to` pairs). On
/// success, `order[i] < order[j]` for every edge `i -> j`. On a cycle,
/// returns the ids that never reached in-degree zero.
pub fn topological_order(ids: &[String], edges: &[(String, String)]) -> Result<Vec<String>, Vec<String>> {
    let groups = execution_groups(ids, edges)?;
    Ok(groups.into_iter().flatten().collect())
}

/// A layered topological order: each group has zero effective
/// in-degree once every earlier group is removed. Flattening the
/// result equals [`topological_order`]'s output (§8: "as multisets").
pub fn execution_groups(ids: &[String], edges: &[(String, String)]) -> Result<Vec<Vec<String>>, Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = ids.iter().map(|id| (id.as_str(), 0)).collect();
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (from, to) in edges {
        if !in_degree.contains_key(from.as_str()) || !in_degree.contains_key(to.as_str()) {
            continue;
        }
        *in_degree.get_mut(to.as_str()).unwrap() += 1;
        adjacency.entry(from.as_str()).or_default().push(to.as_str());
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut visited = 0usize;

    while !ready.is_empty() {
        let current: Vec<&str> = ready.iter().copied().collect();
        ready.clear();
        for &id in &current {
            visited += 1;
            if let Some(targets) = adjacency.get(id) {
                for &target in targets {
                    let deg = in_degree.get_mut(target).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(target);
                    }
                }
            }
        }
        groups.push(current.into_iter().map(str::to_string).collect());
    }

    if visited < ids.len() {
        let involved = in_degree
            .into_iter()
            .filter(|(_, deg)| *deg > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(involved);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn e(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn orders_a_linear_chain() {
        let order = topological_order(&s(&["a", "b", "c"]), &e(&[("a", "b"), ("b", "c")])).unwrap();
        assert_eq!(order, s(&["a", "b", "c"]));
    }

    #[test]
    fn ties_break_ascending() {
        let order = topological_order(&s(&["z", "a", "m"]), &[]).unwrap();
        assert_eq!(order, s(&["a", "m", "z"]));
    }

    #[test]
    fn detects_cycle() {
        let err = topological_order(&s(&["a", "b"]), &e(&[("a", "b"), ("b", "a")])).unwrap_err();
        let mut err = err;
        err.sort();
        assert_eq!(err, s(&["a", "b"]));
    }

    #[test]
    fn groups_flatten_to_topological_order() {
        let ids = s(&["a", "b", "c", "d"]);
        let edges = e(&[("a", "c"), ("b", "c"), ("c", "d")]);
        let groups = execution_groups(&ids, &edges).unwrap();
        assert_eq!(groups, vec![s(&["a", "b"]), s(&["c"]), s(&["d"])]);
        let order = topological_order(&ids, &edges).unwrap();
        assert_eq!(order, s(&["a", "b", "c", "d"]));
    }
}
