//! The reconstructed workflow AST: scopes, instances, connections, and
//! macros, built on top of the canonical contracts in
//! `flow-weaver-contracts`.

pub mod scopes;
pub mod workflow;

pub use scopes::is_valid_scope_identifier;
pub use workflow::{
    Connection, Macro, NodeInstance, ParentRef, PathStep, PortRef, Route, Workflow,
};
