//! Port definitions: the declared shape of a [`crate::NodeType`]'s inputs
//! and outputs.

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;

/// Where a port's label should be placed when a node is rendered.
///
/// Carried only for round-tripping the `placement:TOP|BOTTOM` annotation
/// attribute; the compiler core does not interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortPlacement {
    Top,
    Bottom,
}

/// The declared shape of a single input or output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDef {
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_control_flow: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub failure: bool,
    /// Per-port scope identifier: present when this port is the entry or
    /// exit of a per-port scope hosted by the owning node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// `input`/`output` declaration ordering hint (`order:N` attribute).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PortPlacement>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl PortDef {
    /// A required data port of the given type.
    pub fn required(data_type: DataType) -> Self {
        Self {
            data_type,
            optional: false,
            default: None,
            label: None,
            description: None,
            is_control_flow: data_type == DataType::Step,
            failure: false,
            scope: None,
            order: None,
            placement: None,
        }
    }

    /// An optional data port with the given default value.
    pub fn optional_with_default(data_type: DataType, default: serde_json::Value) -> Self {
        Self {
            optional: true,
            default: Some(default),
            ..Self::required(data_type)
        }
    }

    /// The reserved `STEP`-typed control flow port used on every
    /// `startPorts`/`exitPorts` map (`{execute: STEP}`, `onSuccess`,
    /// `onFailure`).
    pub fn control_flow() -> Self {
        Self {
            is_control_flow: true,
            ..Self::required(DataType::Step)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn as_failure(mut self) -> Self {
        self.failure = true;
        self
    }
}
