//! `NodeType`: the declaration of a reusable node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::port::PortDef;

/// How a node with multiple control-flow *inputs* decides it is ready to
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecuteWhen {
    Conjunction,
    Disjunction,
    Custom,
}

/// How a node with multiple control-flow *outputs* decides which branch to
/// take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchingStrategy {
    None,
    ExceptionBased,
    ValueBased,
}

/// Marks a node type as something other than an ordinary task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeVariant {
    Coercion,
}

/// Visual hints carried through round-trips but not interpreted by the
/// core pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeVisuals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The declaration of a reusable node: its ports, its control-flow shape,
/// and whether it hosts a per-port scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    pub name: String,
    pub function_name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, PortDef>,
    #[serde(default)]
    pub outputs: BTreeMap<String, PortDef>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_success_port: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_failure_port: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_async: bool,
    #[serde(default = "default_execute_when")]
    pub execute_when: ExecuteWhen,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branching_strategy: Option<BranchingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<NodeVariant>,
    /// Node evaluates without participating in control flow (no `execute`
    /// input, no `onSuccess`/`onFailure` outputs required).
    #[serde(default, skip_serializing_if = "is_false")]
    pub expression: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_config: Option<serde_json::Value>,
    /// Declares that instances of this type host a per-port scope under
    /// this identifier (invariant 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_execution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visuals: Option<NodeVisuals>,
}

fn default_execute_when() -> ExecuteWhen {
    ExecuteWhen::Conjunction
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl NodeType {
    /// A minimal node type with no ports, suitable as a builder base.
    pub fn new(name: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function_name: function_name.into(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            has_success_port: false,
            has_failure_port: false,
            is_async: false,
            execute_when: ExecuteWhen::Conjunction,
            branching_strategy: None,
            branch_field: None,
            variant: None,
            expression: false,
            default_config: None,
            scope: None,
            pull_execution: None,
            visuals: None,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, port: PortDef) -> Self {
        self.inputs.insert(name.into(), port);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, port: PortDef) -> Self {
        self.outputs.insert(name.into(), port);
        self
    }

    /// Whether this type's `name` or `functionName` matches the given
    /// lookup key (reference-resolver identity: `functionName` wins when
    /// both exist — §4.3).
    pub fn matches_key(&self, key: &str) -> bool {
        self.function_name == key || self.name == key
    }

    /// The canonical coercion node type used by invariant 9 /
    /// `COERCE_TYPE_MISMATCH`.
    pub fn coercion(node_type: &str, result: crate::data_type::DataType) -> Self {
        Self::new(node_type, node_type)
            .with_input("value", PortDef::required(crate::data_type::DataType::Any))
            .with_output("result", PortDef::required(result))
            .with_variant(NodeVariant::Coercion)
    }

    pub fn with_variant(mut self, variant: NodeVariant) -> Self {
        self.variant = Some(variant);
        self
    }
}
