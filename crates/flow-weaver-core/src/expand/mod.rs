//! Stage 2: macro expansion (§4.2).
//!
//! Turns the sugar recorded in `Workflow::macros` into concrete
//! instances and connections: `coerce` synthesizes a type-adapter node
//! (see [`coerce`]); `path`/`fanOut`/`fanIn` synthesize plain
//! control-flow or bulk-wiring connections (see [`path_fan`]).

pub mod coerce;
pub mod path_fan;

use std::collections::HashSet;

use thiserror::Error;

use crate::model::Workflow;

/// A non-fatal macro-expansion failure. Aggregated rather than thrown,
/// per §7's "macro expansion... aggregate errors into a per-workflow
/// list and continue producing a best-effort AST where possible".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExpandError {
    pub message: String,
}

impl ExpandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// The outcome of expanding every macro recorded on a workflow.
#[derive(Debug, Clone)]
pub struct ExpandOutput {
    pub workflow: Workflow,
    pub errors: Vec<ExpandError>,
}

/// Expand every macro on `workflow` into its canonical AST, the canonical
/// form: `coerce` first (it may introduce new instances that a later
/// `path` macro could plausibly reference), then `path`/`fanOut`/`fanIn`,
/// then a final connection de-duplication pass (§4.2: "de-duplicated by
/// `(from, to, coerce?)` tuple equality").
pub fn expand(workflow: &Workflow) -> ExpandOutput {
    let (workflow, mut errors) = coerce::expand_coerce_macros(workflow);
    let workflow = path_fan::expand_path_fan_macros(&workflow);
    let workflow = dedup_connections(workflow);
    errors.sort_by(|a, b| a.message.cmp(&b.message));
    ExpandOutput { workflow, errors }
}

fn dedup_connections(mut workflow: Workflow) -> Workflow {
    let mut seen = HashSet::new();
    workflow.connections.retain(|c| seen.insert(c.dedup_key()));
    workflow
}
