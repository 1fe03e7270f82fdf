//! Flow Weaver - a pure-functional workflow compilation pipeline.
//!
//! Annotated source text (doc-comment tags such as `@workflow`, `@node`,
//! `@connect`) is compiled through six stages, each a pure `Workflow ->
//! Workflow` (or `Workflow -> Report`/`Plan`) function with no shared
//! mutable state:
//!
//! 1. [`parser`] — annotation text to a raw AST
//! 2. [`expand`] — macro expansion (`coerce`, `path`, `fanOut`/`fanIn`)
//! 3. [`resolver`] — reference canonicalization and scope indexing
//! 4. [`validator`] — fixed core rules plus a pluggable rule registry
//! 5. [`transform`] — named, composable AST-to-AST passes
//! 6. [`planner`] — a deterministic execution plan
//!
//! [`query`] exposes read-only traversal helpers used by both the
//! validator and external consumers (UIs, codegen backends); [`builder`]
//! exposes a draft-and-commit mutation surface for programmatic editing.

pub mod builder;
pub mod error;
pub mod expand;
pub mod graph;
pub mod model;
pub mod parser;
pub mod planner;
pub mod query;
pub mod resolver;
pub mod transform;
pub mod validator;

pub use error::{BuilderValidationError, FlowWeaverError, ParseError, PlanError, Result};
pub use model::{Connection, Macro, NodeInstance, ParentRef, PathStep, PortRef, Route, Workflow};
pub use planner::Plan;
pub use validator::{Diagnostic, Report};

use std::sync::Arc;

/// Run stages 1-3 (parse, expand, resolve) over `source`, producing a
/// workflow per `@workflow` anchor. Parse errors and macro-expansion
/// errors are aggregated onto each [`ParseOutput`](parser::ParseOutput)
/// rather than raised, per the "best-effort AST" error policy.
pub fn parse(source: &str, options: Option<parser::ParseOptions>) -> parser::ParseOutput {
    log::debug!("parsing {} bytes of annotated source", source.len());
    let mut out = parser::parse(source, options);
    for wf in &mut out.workflows {
        let expanded = expand::expand(wf);
        for err in &expanded.errors {
            out.warnings.push(format!("macro expansion: {err}"));
        }
        let resolved = resolver::resolve(&expanded.workflow, resolver::ResolveOptions::default());
        *wf = resolved;
    }
    log::info!("parsed {} workflow(s), {} error(s)", out.workflows.len(), out.errors.len());
    out
}

/// Run stage 4 (validate) with default options and no extra rules.
pub fn validate(workflow: &Workflow, extra_rules: Option<&validator::RuleRegistry>) -> Report {
    validator::validate(workflow, extra_rules)
}

/// Run a single named transformer (stage 5).
pub fn transform(workflow: &Workflow, transformer: &dyn transform::Transformer) -> Workflow {
    transform::transform(workflow, transformer)
}

/// Run transformers left-to-right (stage 5).
pub fn apply_transformations(workflow: &Workflow, transformers: &[Arc<dyn transform::Transformer>]) -> Workflow {
    transform::apply_transformations(workflow, transformers)
}

/// Fold transformers into one named transformer (stage 5).
pub fn compose_transformers(transformers: Vec<Arc<dyn transform::Transformer>>) -> Arc<dyn transform::Transformer> {
    transform::compose_transformers(transformers)
}

/// Run stage 6 (plan) over a validated workflow.
pub fn plan(workflow: &Workflow) -> std::result::Result<Plan, PlanError> {
    log::debug!("planning workflow '{}'", workflow.name);
    planner::plan(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_expands_and_resolves_in_one_call() {
        let src = r#"
/**
 * @nodeType Process process
 * @input execute [type:STEP]
 * @output onSuccess [type:STEP]
 */

/**
 * @workflow Pipeline pipeline
 * @node step1 process
 * @node step2 process
 * @connect Start.execute -> step1.execute
 * @connect step1.onSuccess -> step2.execute
 * @connect step2.onSuccess -> Exit.onSuccess
 */
"#;
        let out = parse(src, None);
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        let wf = &out.workflows[0];
        assert_eq!(wf.instances[0].node_type, "process");

        let report = validate(wf, None);
        assert!(report.valid, "unexpected diagnostics: {:?}", report.errors);

        let plan = plan(wf).unwrap();
        assert_eq!(plan.order, vec!["step1".to_string(), "step2".to_string()]);
    }
}
