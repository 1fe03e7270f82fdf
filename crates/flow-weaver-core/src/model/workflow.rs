//! Core AST value types: `PortRef`, `Connection`, `Macro`, `NodeInstance`,
//! and the `Workflow` they compose into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use flow_weaver_contracts::{Coercion, NodeType, PortDef};

/// Reserved pseudo-node representing the workflow's input.
pub const START: &str = "Start";
/// Reserved pseudo-node representing the workflow's output.
pub const EXIT: &str = "Exit";

/// A reference to a single port, optionally disambiguated by the
/// per-port scope it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node: String,
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl PortRef {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            scope: None,
        }
    }

    pub fn scoped(node: impl Into<String>, port: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            scope: Some(scope.into()),
        }
    }

    /// Parses the string shape `node.port` or `node.port@scope` used by
    /// the `connect`/`coerce` annotation tags (`INVALID_PORT_REFERENCE_FORMAT`
    /// fires when this returns `None`).
    pub fn parse(s: &str) -> Option<Self> {
        let (rest, scope) = match s.split_once('@') {
            Some((rest, scope)) => (rest, Some(scope.to_string())),
            None => (s, None),
        };
        let (node, port) = rest.split_once('.')?;
        if node.is_empty() || port.is_empty() {
            return None;
        }
        Some(Self {
            node: node.to_string(),
            port: port.to_string(),
            scope,
        })
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}.{}@{}", self.node, self.port, scope),
            None => write!(f, "{}.{}", self.node, self.port),
        }
    }
}

/// An edge between two ports. A `coerce` hint names the adapter
/// applied to the value in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coerce: Option<Coercion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Connection {
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self {
            from,
            to,
            coerce: None,
            metadata: None,
        }
    }

    pub fn with_coerce(mut self, coerce: Coercion) -> Self {
        self.coerce = Some(coerce);
        self
    }

    /// Whether either endpoint carries a scope qualifier — such
    /// connections are excluded from the main-flow subgraph (GLOSSARY).
    pub fn touches_scope(&self) -> bool {
        self.from.scope.is_some() || self.to.scope.is_some()
    }

    /// Identity used to de-duplicate connections produced by macro
    /// expansion (§4.2: "de-duplicated by `(from, to, coerce?)` tuple
    /// equality").
    pub fn dedup_key(&self) -> (PortRef, PortRef, Option<Coercion>) {
        (self.from.clone(), self.to.clone(), self.coerce)
    }
}

/// Which control-flow output a `path` step follows to reach the next
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Ok,
    Fail,
}

impl Default for Route {
    fn default() -> Self {
        Route::Ok
    }
}

/// One step of a `path` macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub node: String,
    #[serde(default, skip_serializing_if = "is_default_route")]
    pub route: Route,
}

fn is_default_route(r: &Route) -> bool {
    matches!(r, Route::Ok)
}

impl PathStep {
    pub fn ok(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            route: Route::Ok,
        }
    }

    pub fn fail(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            route: Route::Fail,
        }
    }
}

/// A sugar-optimizer or coerce-macro record (§3, §4.2, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Macro {
    Path { steps: Vec<PathStep> },
    FanOut { from: PortRef, targets: Vec<PortRef> },
    FanIn { sources: Vec<PortRef>, target: PortRef },
    Coerce {
        id: String,
        from: PortRef,
        to: PortRef,
        #[serde(rename = "as")]
        as_type: Coercion,
    },
    Map { entries: Vec<(PortRef, PortRef)> },
}

impl Macro {
    /// All instance ids a path macro's steps reference, in order.
    pub fn path_node_ids(&self) -> Vec<&str> {
        match self {
            Macro::Path { steps } => steps.iter().map(|s| s.node.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// `{id, scope}`: identifies the per-port scope a child instance lives
/// inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub id: String,
    pub scope: String,
}

/// Cosmetic / non-structural configuration carried on a `NodeInstance`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Per-port literal expressions, `[expr: port="..."]`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub port_expressions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// The port whose demand triggers pull-mode execution of this
    /// instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_execution: Option<String>,
}

/// A placed occurrence of a [`NodeType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    pub id: String,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<InstanceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, id: impl Into<String>, scope: impl Into<String>) -> Self {
        self.parent = Some(ParentRef {
            id: id.into(),
            scope: scope.into(),
        });
        self
    }
}

/// The full reconstructed workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub name: String,
    pub function_name: String,
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub node_types: Vec<NodeType>,
    #[serde(default)]
    pub instances: Vec<NodeInstance>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub macros: Vec<Macro>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scopes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub start_ports: BTreeMap<String, PortDef>,
    #[serde(default)]
    pub exit_ports: BTreeMap<String, PortDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// `@strictTypes`: promotes implicit-coercion warnings to errors.
    #[serde(default, skip_serializing_if = "is_false")]
    pub strict_types: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Workflow {
    pub fn find_instance(&self, id: &str) -> Option<&NodeInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Resolve a `NodeInstance.node_type` reference to its declaration,
    /// preferring `functionName` when both exist (§4.3).
    pub fn resolve_node_type(&self, key: &str) -> Option<&NodeType> {
        self.node_types
            .iter()
            .find(|nt| nt.function_name == key)
            .or_else(|| self.node_types.iter().find(|nt| nt.name == key))
    }

    pub fn incoming_connections<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.to.node == node_id)
    }

    pub fn outgoing_connections<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.from.node == node_id)
    }

    /// All non-scoped instance ids, in declaration order.
    pub fn main_flow_instance_ids(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|i| !crate::model::scopes::is_scoped_child(i, self))
            .map(|i| i.id.as_str())
            .collect()
    }

    /// The subset of connections that participate in the main flow:
    /// neither endpoint carries a scope, and neither endpoint is a
    /// per-port scoped child instance (§4.4 topological order policy).
    pub fn main_flow_connections(&self) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| !c.touches_scope())
            .filter(|c| !self.endpoint_is_scoped_child(&c.from.node))
            .filter(|c| !self.endpoint_is_scoped_child(&c.to.node))
            .collect()
    }

    fn endpoint_is_scoped_child(&self, node_id: &str) -> bool {
        self.find_instance(node_id)
            .map(|i| crate::model::scopes::is_scoped_child(i, self))
            .unwrap_or(false)
    }

    /// The declared shape of `port_ref` as a connection *source*:
    /// `Start`'s own `startPorts`, or the instance's resolved output
    /// ports.
    pub fn source_port_def(&self, port_ref: &PortRef) -> Option<&flow_weaver_contracts::PortDef> {
        if port_ref.node == START {
            return self.start_ports.get(&port_ref.port);
        }
        self.find_instance(&port_ref.node)
            .and_then(|inst| self.resolve_node_type(&inst.node_type))
            .and_then(|nt| nt.outputs.get(&port_ref.port))
    }

    /// The declared shape of `port_ref` as a connection *target*:
    /// `Exit`'s own `exitPorts`, or the instance's resolved input ports.
    pub fn target_port_def(&self, port_ref: &PortRef) -> Option<&flow_weaver_contracts::PortDef> {
        if port_ref.node == EXIT {
            return self.exit_ports.get(&port_ref.port);
        }
        self.find_instance(&port_ref.node)
            .and_then(|inst| self.resolve_node_type(&inst.node_type))
            .and_then(|nt| nt.inputs.get(&port_ref.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_ref_parse_plain() {
        let r = PortRef::parse("step1.execute").unwrap();
        assert_eq!(r.node, "step1");
        assert_eq!(r.port, "execute");
        assert!(r.scope.is_none());
    }

    #[test]
    fn port_ref_parse_scoped() {
        let r = PortRef::parse("loop.item@iteration").unwrap();
        assert_eq!(r.node, "loop");
        assert_eq!(r.port, "item");
        assert_eq!(r.scope.as_deref(), Some("iteration"));
    }

    #[test]
    fn port_ref_parse_rejects_malformed() {
        assert!(PortRef::parse("no-dot").is_none());
        assert!(PortRef::parse(".port").is_none());
        assert!(PortRef::parse("node.").is_none());
    }

    #[test]
    fn connection_touches_scope() {
        let c = Connection::new(
            PortRef::scoped("loop", "item", "iteration"),
            PortRef::new("proc", "input"),
        );
        assert!(c.touches_scope());
    }

    #[test]
    fn resolve_node_type_prefers_function_name() {
        let mut wf = Workflow::default();
        wf.node_types.push(NodeType::new("Process Step", "process_step"));
        assert!(wf.resolve_node_type("process_step").is_some());
        assert!(wf.resolve_node_type("Process Step").is_some());
        assert!(wf.resolve_node_type("missing").is_none());
    }

    #[test]
    fn serde_field_layout_omits_defaults() {
        let wf = Workflow {
            name: "wf".into(),
            function_name: "wf".into(),
            source_file: "wf.ts".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&wf).unwrap();
        assert!(v.get("macros").is_none());
        assert!(v.get("scopes").is_none());
        assert!(v.get("metadata").is_none());
    }
}
