//! Crate-wide error types.
//!
//! Mirrors the teacher's `node_engine::error` shape: one `thiserror` enum
//! per failure surface, aggregated by a crate-level error for callers that
//! don't care which stage failed.

use thiserror::Error;

/// Result type alias using [`FlowWeaverError`].
pub type Result<T> = std::result::Result<T, FlowWeaverError>;

/// A malformed annotation, located by line and column (error taxonomy
/// kind 1 — spec.md §7).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Raised by [`crate::planner::plan`] when the main-flow subgraph contains
/// a cycle — the only condition under which a plan is impossible
/// (spec.md §4.6, §7).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot plan workflow: cycle in main flow involving {involved:?}")]
pub struct PlanError {
    pub involved: Vec<String>,
}

/// Raised by the `with_validation` builder wrapper when the committed
/// draft fails post-commit validation. Carries the first three offending
/// diagnostics verbatim, as spec.md §7 requires ("including the first
/// three offending diagnostics verbatim in the error text, followed by a
/// count").
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct BuilderValidationError {
    pub first_three: Vec<String>,
    pub total_errors: usize,
}

impl std::fmt::Display for BuilderValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "draft failed validation with {} error(s):", self.total_errors)?;
        for msg in &self.first_three {
            write!(f, "\n  - {msg}")?;
        }
        if self.total_errors > self.first_three.len() {
            write!(f, "\n  ... and {} more", self.total_errors - self.first_three.len())?;
        }
        Ok(())
    }
}

/// Top-level error for the compilation pipeline.
///
/// Error taxonomy kind 4 ("invariant violations") is represented by
/// [`FlowWeaverError::Invariant`]; semantic errors and warnings (kinds 2-3)
/// never appear here — they are [`crate::validator::Diagnostic`] values
/// inside a [`crate::validator::Report`], which the validator always
/// returns rather than raising.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowWeaverError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    BuilderValidation(#[from] BuilderValidationError),

    /// A bug: a production stage produced an AST that violates an
    /// invariant it is responsible for upholding (e.g. a coerce-macro
    /// expansion that didn't inject its canonical NodeType).
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
