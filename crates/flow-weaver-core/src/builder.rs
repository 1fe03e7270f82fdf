//! The draft-and-commit builder surface (§6, §9).
//!
//! Replaces the teacher's fluent `WorkflowBuilder`/`OrchestrationBuilder`
//! (`node-engine::builder`), whose methods mutate and return `Self`
//! directly against the live graph, with a draft value: a caller chains
//! `add_*`/`remove_*` calls against a cloned copy, and only one of the
//! three wrapper functions below turns that draft back into a committed,
//! immutable `Workflow` — re-running validation along the way.

use crate::error::BuilderValidationError;
use crate::model::{Connection, Macro, NodeInstance, Workflow};
use crate::validator::{self, Diagnostic, RuleRegistry};

/// A working copy of a [`Workflow`] under construction. Every method
/// consumes and returns `Self`, mirroring the teacher's `add_node`/
/// `add_edge` chain, but against a private scratch copy rather than the
/// value a caller already holds elsewhere.
pub struct WorkflowDraft {
    workflow: Workflow,
}

impl WorkflowDraft {
    fn new(workflow: Workflow) -> Self {
        Self { workflow }
    }

    pub fn add_instance(mut self, instance: NodeInstance) -> Self {
        self.workflow.instances.push(instance);
        self
    }

    pub fn remove_instance(mut self, id: &str) -> Self {
        self.workflow.instances.retain(|i| i.id != id);
        self.workflow.connections.retain(|c| c.from.node != id && c.to.node != id);
        self
    }

    pub fn add_connection(mut self, connection: Connection) -> Self {
        self.workflow.connections.push(connection);
        self
    }

    pub fn remove_connection(mut self, connection: &Connection) -> Self {
        self.workflow.connections.retain(|c| c != connection);
        self
    }

    pub fn add_macro(mut self, m: Macro) -> Self {
        self.workflow.macros.push(m);
        self
    }

    pub fn set_strict_types(mut self, strict: bool) -> Self {
        self.workflow.strict_types = strict;
        self
    }

    /// Escape hatch for edits the other methods don't cover.
    pub fn edit(mut self, f: impl FnOnce(&mut Workflow)) -> Self {
        f(&mut self.workflow);
        self
    }

    fn finish(self) -> Workflow {
        self.workflow
    }
}

fn first_three_messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().take(3).map(|d| format!("{}: {}", d.code, d.message)).collect()
}

/// Commit a draft, re-running the full validator; throws (returns `Err`)
/// when any error diagnostic remains (§6, §7).
pub fn with_validation(
    workflow: &Workflow,
    draft: impl FnOnce(WorkflowDraft) -> WorkflowDraft,
) -> Result<Workflow, BuilderValidationError> {
    with_validation_against(workflow, None, draft)
}

/// As [`with_validation`], but also runs `extra_rules` (a snapshotted
/// registry) alongside the core rules.
pub fn with_validation_against(
    workflow: &Workflow,
    extra_rules: Option<&RuleRegistry>,
    draft: impl FnOnce(WorkflowDraft) -> WorkflowDraft,
) -> Result<Workflow, BuilderValidationError> {
    let next = draft(WorkflowDraft::new(workflow.clone())).finish();
    let report = validator::validate(&next, extra_rules);
    if report.valid {
        Ok(next)
    } else {
        Err(BuilderValidationError {
            first_three: first_three_messages(&report.errors),
            total_errors: report.errors.len(),
        })
    }
}

/// Commit a draft, checking only the operation-specific assertions the
/// caller supplies rather than the full validator (§6: "operation-specific
/// assertions").
pub fn with_minimal_validation(
    workflow: &Workflow,
    draft: impl FnOnce(WorkflowDraft) -> WorkflowDraft,
    assertions: impl Fn(&Workflow) -> Vec<Diagnostic>,
) -> Result<Workflow, BuilderValidationError> {
    let next = draft(WorkflowDraft::new(workflow.clone())).finish();
    let errors: Vec<Diagnostic> = assertions(&next).into_iter().filter(|d| d.is_error()).collect();
    if errors.is_empty() {
        Ok(next)
    } else {
        Err(BuilderValidationError {
            first_three: first_three_messages(&errors),
            total_errors: errors.len(),
        })
    }
}

/// Commit a draft with no validation at all — for cosmetic edits (§6).
pub fn without_validation(workflow: &Workflow, draft: impl FnOnce(WorkflowDraft) -> WorkflowDraft) -> Workflow {
    draft(WorkflowDraft::new(workflow.clone())).finish()
}
