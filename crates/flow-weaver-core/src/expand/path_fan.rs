//! `path` / `fanOut` / `fanIn` / `map` expansion (§4.2).
//!
//! Unlike `coerce`, these variants are never written by hand in source
//! — they are emitted by the sugar optimizer (§4.5) to describe
//! connections that already exist. Expanding them here re-derives those
//! connections so a workflow rebuilt purely from its macros and
//! instances (without its original connection list) is equivalent.
//! `map` is the bulk data-forwarding counterpart of `fanOut`/`fanIn`: one
//! connection per `(from, to)` entry, with no shared source or target.

use crate::model::workflow::{EXIT, START};
use crate::model::{Connection, Macro, PortRef, Route, Workflow};

pub fn expand_path_fan_macros(workflow: &Workflow) -> Workflow {
    let mut wf = workflow.clone();
    let macros = wf.macros.clone();
    for m in &macros {
        match m {
            Macro::Path { steps } => {
                for pair in steps.windows(2) {
                    let [prev, next] = pair else { continue };
                    let from_port = if prev.node == START {
                        "execute".to_string()
                    } else {
                        route_port(next.route)
                    };
                    let to_port = if next.node == EXIT {
                        route_port(next.route)
                    } else {
                        "execute".to_string()
                    };
                    wf.connections
                        .push(Connection::new(PortRef::new(prev.node.clone(), from_port), PortRef::new(next.node.clone(), to_port)));
                }
            }
            Macro::FanOut { from, targets } => {
                for target in targets {
                    wf.connections.push(Connection::new(from.clone(), target.clone()));
                }
            }
            Macro::FanIn { sources, target } => {
                for source in sources {
                    wf.connections.push(Connection::new(source.clone(), target.clone()));
                }
            }
            Macro::Map { entries } => {
                for (from, to) in entries {
                    wf.connections.push(Connection::new(from.clone(), to.clone()));
                }
            }
            Macro::Coerce { .. } => {}
        }
    }
    wf
}

fn route_port(route: Route) -> String {
    match route {
        Route::Ok => "onSuccess".to_string(),
        Route::Fail => "onFailure".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PathStep;

    #[test]
    fn expands_a_linear_path() {
        let mut wf = Workflow::default();
        wf.macros.push(Macro::Path {
            steps: vec![
                PathStep::ok(START),
                PathStep::ok("step1"),
                PathStep::ok("step2"),
                PathStep::ok(EXIT),
            ],
        });
        let wf2 = expand_path_fan_macros(&wf);
        assert_eq!(wf2.connections.len(), 3);
        assert_eq!(wf2.connections[0].from.port, "execute");
        assert_eq!(wf2.connections[0].to.port, "execute");
        assert_eq!(wf2.connections[2].to.port, "onSuccess");
    }

    #[test]
    fn expands_a_failure_branch() {
        let mut wf = Workflow::default();
        wf.macros.push(Macro::Path {
            steps: vec![PathStep::ok("step1"), PathStep::fail("err"), PathStep::ok(EXIT)],
        });
        let wf2 = expand_path_fan_macros(&wf);
        assert_eq!(wf2.connections[0].from.port, "onFailure");
        assert_eq!(wf2.connections[1].to.port, "onSuccess");
    }

    #[test]
    fn expands_fan_out() {
        let mut wf = Workflow::default();
        wf.macros.push(Macro::FanOut {
            from: PortRef::new("src", "out"),
            targets: vec![PortRef::new("a", "in"), PortRef::new("b", "in")],
        });
        let wf2 = expand_path_fan_macros(&wf);
        assert_eq!(wf2.connections.len(), 2);
    }

    #[test]
    fn expands_map() {
        let mut wf = Workflow::default();
        wf.macros.push(Macro::Map {
            entries: vec![
                (PortRef::new("a", "out"), PortRef::new("x", "in")),
                (PortRef::new("b", "out"), PortRef::new("y", "in")),
            ],
        });
        let wf2 = expand_path_fan_macros(&wf);
        assert_eq!(wf2.connections.len(), 2);
        assert_eq!(wf2.connections[0].from.node, "a");
        assert_eq!(wf2.connections[0].to.node, "x");
        assert_eq!(wf2.connections[1].from.node, "b");
        assert_eq!(wf2.connections[1].to.node, "y");
    }
}
