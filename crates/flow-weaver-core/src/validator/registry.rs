//! The pluggable agent-rule registry (§4.4, §5, §9).
//!
//! Mirrors the teacher's node-type registry: a name-keyed map supporting
//! registration and override-on-merge, modeled as an explicit value
//! threaded through `validate` rather than process-wide global state
//! (§9: "Model the registry as an explicit parameter threaded through
//! compile calls"). A compile snapshots the registry it's given before
//! running (`RuleRegistry::snapshot`) so later registrations can't
//! change diagnostics for a compile already in flight.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::Workflow;

use super::report::Diagnostic;

/// A single pluggable rule: `{name, validate(ast) -> Diagnostic[]}`.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic>;
}

/// Wraps a plain closure as a [`Rule`], for callers that don't want to
/// define a type.
pub struct FnRule<F> {
    name: String,
    f: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Workflow) -> Vec<Diagnostic> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Workflow) -> Vec<Diagnostic> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        (self.f)(workflow)
    }
}

/// A registry of agent/user-supplied rules, keyed by name so a later
/// registration overrides an earlier one with the same name.
///
/// Rules are applied in name order: they are required to be pure and
/// order-independent (§4.4), so any deterministic order produces the
/// same report, and sorting by name keeps two runs byte-identical
/// without the registry needing to remember insertion order.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    entries: BTreeMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        self.entries.insert(rule.name().to_string(), rule);
    }

    pub fn register_fn(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Workflow) -> Vec<Diagnostic> + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.register(Arc::new(FnRule::new(name, f)));
    }

    /// Merge `other` into `self`; entries in `other` override entries
    /// in `self` sharing a name.
    pub fn merge(&mut self, other: RuleRegistry) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Run every registered rule against `workflow`, in name order.
    pub fn validate_all(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        self.entries.values().flat_map(|rule| rule.validate(workflow)).collect()
    }

    /// An owned copy, taken once at compile start (§5: "each compile
    /// must snapshot the registry at start").
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_registration_overrides_same_name() {
        let mut reg = RuleRegistry::new();
        reg.register_fn("r", |_| vec![Diagnostic::warning("A", "first")]);
        reg.register_fn("r", |_| vec![Diagnostic::warning("B", "second")]);
        assert_eq!(reg.len(), 1);
        let wf = Workflow::default();
        let diags = reg.validate_all(&wf);
        assert_eq!(diags[0].code, "B");
    }

    #[test]
    fn merge_prefers_other() {
        let mut a = RuleRegistry::new();
        a.register_fn("shared", |_| vec![Diagnostic::warning("A", "a")]);
        let mut b = RuleRegistry::new();
        b.register_fn("shared", |_| vec![Diagnostic::warning("B", "b")]);
        a.merge(b);
        let diags = a.validate_all(&Workflow::default());
        assert_eq!(diags[0].code, "B");
    }
}
