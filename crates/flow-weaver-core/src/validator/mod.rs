//! The validator (§4.4): fixed core rules plus a pluggable rule registry,
//! composed into a single `{valid, errors, warnings}` report.

pub mod registry;
pub mod report;
mod rules;

pub use registry::{FnRule, Rule, RuleRegistry};
pub use report::{Diagnostic, Location, Report, Severity};

use crate::model::Workflow;

/// Toggles that don't fit `RuleRegistry` itself — currently just the
/// `scope:`-without-`@scope` leniency mode the Open Question in §9 asks
/// for (default strict).
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    pub lenient_scope: bool,
}

/// Run the fixed core rules, then every rule in `extra_rules` (snapshotted
/// first, per §5), and fold both into one report.
///
/// Core diagnostics are emitted before registry diagnostics; within each
/// group, order matches the order the rules ran in, which is itself fixed
/// (core) or name-sorted (registry) — so two runs on identical input
/// produce a byte-identical report (§5: "Diagnostics within a stage
/// preserve insertion order").
pub fn validate(workflow: &Workflow, extra_rules: Option<&RuleRegistry>) -> Report {
    validate_with_options(workflow, extra_rules, ValidateOptions::default())
}

pub fn validate_with_options(
    workflow: &Workflow,
    extra_rules: Option<&RuleRegistry>,
    options: ValidateOptions,
) -> Report {
    let mut diags = rules::run_core_rules(workflow);
    if options.lenient_scope {
        diags.retain(|d| d.code != "SCOPE_WITHOUT_CONTEXT");
    }
    if let Some(registry) = extra_rules {
        let snapshot = registry.snapshot();
        diags.extend(snapshot.validate_all(workflow));
    }
    Report::from_diagnostics(diags)
}
