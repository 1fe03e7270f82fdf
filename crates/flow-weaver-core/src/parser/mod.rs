//! Stage 1: turn annotated source text into a raw AST (§4.1).
//!
//! A line-oriented tokenizer ([`lexer`]) finds `/** … */` blocks and
//! strips comment decoration; a small per-line grammar ([`tags`])
//! structures each line into a tag, its positional arguments, its
//! attribute brackets, and an optional trailing label. This module
//! walks that tag stream and accumulates [`crate::model::Workflow`]
//! values.

pub mod escape;
pub mod lexer;
pub mod tags;

use std::collections::BTreeSet;

use flow_weaver_contracts::{Coercion, DataType, NodeType, PortDef, PortPlacement};

use crate::error::ParseError;
use crate::model::scopes::is_valid_scope_identifier;
use crate::model::{Connection, Macro, NodeInstance, ParentRef, PortRef, Workflow};
use crate::model::workflow::InstanceConfig;
use tags::{parse_tag_line, Attrs, TagLine};

/// Options accepted by [`parse`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Recorded on every workflow's `sourceFile` field. Defaults to
    /// `"<anonymous>"` when omitted.
    pub source_file: Option<String>,
}

/// The result of parsing one source text. A file may declare more than
/// one `@workflow` anchor; each becomes one [`Workflow`].
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub workflows: Vec<Workflow>,
    pub errors: Vec<ParseError>,
    pub warnings: Vec<String>,
}

enum Anchor {
    None,
    NodeType(NodeType),
    Workflow(Workflow, BTreeSet<String>),
}

/// Parse `source` into zero or more workflows.
///
/// Parse errors halt only the affected workflow; a malformed line is
/// skipped and parsing continues with the next line, per §7 ("halt the
/// affected workflow's pipeline after parse; other workflows in the
/// same file continue"). In practice this implementation continues
/// line-by-line and simply records the error, since a single workflow
/// spans many lines and abandoning the whole anchor on the first typo
/// would be needlessly destructive.
pub fn parse(source: &str, options: Option<ParseOptions>) -> ParseOutput {
    let options = options.unwrap_or_default();
    let source_file = options.source_file.unwrap_or_else(|| "<anonymous>".to_string());

    let mut out = ParseOutput::default();
    let mut node_types: Vec<NodeType> = Vec::new();
    let mut pending: Vec<(Workflow, BTreeSet<String>)> = Vec::new();
    let mut anchor = Anchor::None;

    for block in lexer::lex(source) {
        for line in block.lines {
            let Some(parsed) = parse_tag_line(&line.text) else {
                continue;
            };
            let tag_line = match parsed {
                Ok(t) => t,
                Err(message) => {
                    out.errors.push(ParseError::new(line.line, line.column, message));
                    continue;
                }
            };

            match tag_line.tag.as_str() {
                "nodeType" => {
                    finish_anchor(&mut anchor, &mut node_types, &mut pending);
                    match new_node_type(&tag_line, line.line, line.column) {
                        Ok(nt) => anchor = Anchor::NodeType(nt),
                        Err(e) => out.errors.push(e),
                    }
                }
                "workflow" => {
                    finish_anchor(&mut anchor, &mut node_types, &mut pending);
                    match new_workflow(&tag_line, &source_file, line.line, line.column) {
                        Ok(wf) => anchor = Anchor::Workflow(wf, BTreeSet::new()),
                        Err(e) => out.errors.push(e),
                    }
                }
                _ => match &mut anchor {
                    Anchor::NodeType(nt) => {
                        handle_node_type_tag(nt, &tag_line, &line, &mut out);
                    }
                    Anchor::Workflow(wf, referenced) => {
                        handle_workflow_tag(wf, referenced, &tag_line, &line, &mut out);
                    }
                    Anchor::None => {
                        out.warnings.push(format!(
                            "UNKNOWN_TAG: @{} at {}:{} (outside any nodeType/workflow block)",
                            tag_line.tag, line.line, line.column
                        ));
                    }
                },
            }
        }
    }

    finish_anchor(&mut anchor, &mut node_types, &mut pending);

    for (mut wf, referenced) in pending {
        wf.node_types = node_types
            .iter()
            .filter(|nt| referenced.contains(&nt.name) || referenced.contains(&nt.function_name))
            .cloned()
            .collect();
        out.workflows.push(wf);
    }

    out
}

fn finish_anchor(
    anchor: &mut Anchor,
    node_types: &mut Vec<NodeType>,
    pending: &mut Vec<(Workflow, BTreeSet<String>)>,
) {
    match std::mem::replace(anchor, Anchor::None) {
        Anchor::None => {}
        Anchor::NodeType(mut nt) => {
            nt.has_success_port = nt.outputs.get("onSuccess").is_some();
            nt.has_failure_port = nt.outputs.get("onFailure").is_some();
            node_types.push(nt);
        }
        Anchor::Workflow(wf, referenced) => pending.push((wf, referenced)),
    }
}

fn new_node_type(tag_line: &TagLine, line: usize, column: usize) -> Result<NodeType, ParseError> {
    match tag_line.positional.as_slice() {
        [name, function_name] => Ok(NodeType::new(name.clone(), function_name.clone())),
        [name] => Ok(NodeType::new(name.clone(), name.clone())),
        _ => Err(ParseError::new(
            line,
            column,
            "@nodeType requires a name and a function name",
        )),
    }
}

fn new_workflow(
    tag_line: &TagLine,
    source_file: &str,
    line: usize,
    column: usize,
) -> Result<Workflow, ParseError> {
    let (name, function_name) = match tag_line.positional.as_slice() {
        [name, function_name] => (name.clone(), function_name.clone()),
        [name] => (name.clone(), name.clone()),
        _ => {
            return Err(ParseError::new(
                line,
                column,
                "@workflow requires a name and a function name",
            ))
        }
    };
    let mut wf = Workflow {
        name,
        function_name,
        source_file: source_file.to_string(),
        ..Workflow::default()
    };
    wf.start_ports.insert("execute".to_string(), PortDef::control_flow());
    Ok(wf)
}

fn handle_node_type_tag(nt: &mut NodeType, tag_line: &TagLine, line: &lexer::SourceLine, out: &mut ParseOutput) {
    match tag_line.tag.as_str() {
        "input" | "output" => {
            let Some(name) = tag_line.positional.first() else {
                out.errors.push(ParseError::new(
                    line.line,
                    line.column,
                    format!("@{} requires a port name", tag_line.tag),
                ));
                return;
            };
            match port_def_from_attrs(&tag_line.attrs, tag_line.label.as_deref()) {
                Ok(port) => {
                    if tag_line.tag == "input" {
                        nt.inputs.insert(name.clone(), port);
                    } else {
                        nt.outputs.insert(name.clone(), port);
                    }
                }
                Err(message) => out.errors.push(ParseError::new(line.line, line.column, message)),
            }
        }
        "scope" => {
            let Some(name) = tag_line.positional.first() else {
                out.errors.push(ParseError::new(line.line, line.column, "@scope requires a name"));
                return;
            };
            if !is_valid_scope_identifier(name) {
                out.errors.push(ParseError::new(
                    line.line,
                    line.column,
                    format!("SCOPE_NOT_IDENTIFIER: '{name}' is not a valid scope identifier"),
                ));
            }
            nt.scope = Some(name.clone());
        }
        "pullExecution" => {
            if let Some(port) = tag_line.positional.first() {
                nt.pull_execution = Some(port.clone());
            }
        }
        other => out.warnings.push(format!(
            "UNKNOWN_TAG: @{other} at {}:{} (inside nodeType)",
            line.line, line.column
        )),
    }
}

fn handle_workflow_tag(
    wf: &mut Workflow,
    referenced: &mut BTreeSet<String>,
    tag_line: &TagLine,
    line: &lexer::SourceLine,
    out: &mut ParseOutput,
) {
    match tag_line.tag.as_str() {
        "node" => match tag_line.positional.as_slice() {
            [id, node_type, ..] => {
                referenced.insert(node_type.clone());
                let mut inst = NodeInstance::new(id.clone(), node_type.clone());
                if let Some(parent_spec) = tag_line.attrs.get("parent") {
                    match parent_spec.split_once('@') {
                        Some((parent_id, scope)) => {
                            inst.parent = Some(ParentRef {
                                id: parent_id.to_string(),
                                scope: scope.to_string(),
                            })
                        }
                        None => out.errors.push(ParseError::new(
                            line.line,
                            line.column,
                            format!("malformed parent attribute '{parent_spec}', expected 'id@scope'"),
                        )),
                    }
                }
                let config = instance_config_from_attrs(&tag_line.attrs);
                if config != InstanceConfig::default() {
                    inst.config = Some(config);
                }
                wf.instances.push(inst);
            }
            _ => out.errors.push(ParseError::new(line.line, line.column, "@node requires an id and a node type")),
        },
        "connect" => match split_arrow(&tag_line.positional) {
            Some((from, to, as_type)) => match (PortRef::parse(from), PortRef::parse(to)) {
                (Some(from), Some(to)) => {
                    let mut conn = Connection::new(from, to);
                    if let Some(t) = as_type {
                        match parse_coercion(t) {
                            Some(c) => conn.coerce = Some(c),
                            None => out.errors.push(ParseError::new(
                                line.line,
                                line.column,
                                format!("unknown coercion type '{t}'"),
                            )),
                        }
                    }
                    wf.connections.push(conn);
                }
                _ => out.errors.push(ParseError::new(
                    line.line,
                    line.column,
                    "INVALID_PORT_REFERENCE_FORMAT: connect endpoints must be 'node.port'",
                )),
            },
            None => out.errors.push(ParseError::new(
                line.line,
                line.column,
                "@connect requires 'FROM -> TO [as TYPE]'",
            )),
        },
        "coerce" => match tag_line.positional.as_slice() {
            [id, src, arrow, dst, as_kw, ty] if arrow == "->" && as_kw == "as" => {
                match (PortRef::parse(src), PortRef::parse(dst), parse_coercion(ty)) {
                    (Some(from), Some(to), Some(as_type)) => wf.macros.push(Macro::Coerce {
                        id: id.clone(),
                        from,
                        to,
                        as_type,
                    }),
                    _ => out.errors.push(ParseError::new(
                        line.line,
                        line.column,
                        "malformed @coerce tag",
                    )),
                }
            }
            _ => out.errors.push(ParseError::new(
                line.line,
                line.column,
                "@coerce requires 'ID SRC -> DST as TYPE'",
            )),
        },
        "param" => {
            let Some(name) = tag_line.positional.first() else {
                out.errors.push(ParseError::new(line.line, line.column, "@param requires a name"));
                return;
            };
            match port_def_from_attrs(&tag_line.attrs, tag_line.label.as_deref()) {
                Ok(port) => {
                    wf.start_ports.insert(name.clone(), port);
                }
                Err(message) => out.errors.push(ParseError::new(line.line, line.column, message)),
            }
        }
        "returns" => match tag_line.positional.as_slice() {
            [ty, name] => {
                let Some(data_type) = parse_brace_type(ty) else {
                    out.errors.push(ParseError::new(
                        line.line,
                        line.column,
                        format!("@returns type must be wrapped in braces, got '{ty}'"),
                    ));
                    return;
                };
                let mut port = PortDef::required(data_type);
                port.label = tag_line.label.clone();
                wf.exit_ports.insert(name.clone(), port);
            }
            _ => out.errors.push(ParseError::new(line.line, line.column, "@returns requires '{TYPE} NAME'")),
        },
        "strictTypes" => wf.strict_types = true,
        other => out.warnings.push(format!(
            "UNKNOWN_TAG: @{other} at {}:{} (inside workflow)",
            line.line, line.column
        )),
    }
}

fn split_arrow(positional: &[String]) -> Option<(&str, &str, Option<&str>)> {
    match positional {
        [from, arrow, to] if arrow == "->" => Some((from, to, None)),
        [from, arrow, to, as_kw, ty] if arrow == "->" && as_kw == "as" => Some((from, to, Some(ty))),
        _ => None,
    }
}

fn parse_coercion(s: &str) -> Option<Coercion> {
    match s {
        "string" => Some(Coercion::String),
        "number" => Some(Coercion::Number),
        "boolean" => Some(Coercion::Boolean),
        "json" => Some(Coercion::Json),
        "object" => Some(Coercion::Object),
        _ => None,
    }
}

fn parse_data_type(s: &str) -> Option<DataType> {
    match s.to_ascii_uppercase().as_str() {
        "STEP" => Some(DataType::Step),
        "NUMBER" => Some(DataType::Number),
        "STRING" => Some(DataType::String),
        "BOOLEAN" => Some(DataType::Boolean),
        "OBJECT" => Some(DataType::Object),
        "ARRAY" => Some(DataType::Array),
        "FUNCTION" => Some(DataType::Function),
        "ANY" => Some(DataType::Any),
        _ => None,
    }
}

fn parse_brace_type(s: &str) -> Option<DataType> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    parse_data_type(inner)
}

fn port_def_from_attrs(attrs: &Attrs, label: Option<&str>) -> Result<PortDef, String> {
    let data_type = match attrs.get("type") {
        Some(t) => parse_data_type(t).ok_or_else(|| format!("unknown port type '{t}'"))?,
        None => DataType::Any,
    };
    let mut port = PortDef::required(data_type);
    port.optional = attrs.has_flag("optional") || attrs.get("optional").is_some();
    port.label = label.map(str::to_string);
    port.scope = attrs.get("scope").map(str::to_string);
    port.failure = attrs.has_flag("failure");
    if let Some(order) = attrs.get("order") {
        port.order = Some(
            order
                .parse()
                .map_err(|_| format!("order must be an integer, got '{order}'"))?,
        );
    }
    if let Some(placement) = attrs.get("placement") {
        port.placement = Some(match placement.to_ascii_uppercase().as_str() {
            "TOP" => PortPlacement::Top,
            "BOTTOM" => PortPlacement::Bottom,
            _ => return Err(format!("unknown placement '{placement}'")),
        });
    }
    Ok(port)
}

fn instance_config_from_attrs(attrs: &Attrs) -> InstanceConfig {
    let mut config = InstanceConfig::default();
    config.label = attrs.get("label").map(str::to_string);
    config.color = attrs.get("color").map(str::to_string);
    config.icon = attrs.get("icon").map(str::to_string);
    config.pull_execution = attrs.get("pullExecution").map(str::to_string);
    if let Some(pos) = attrs.get("position") {
        let mut parts = pos.split_whitespace();
        if let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) {
            if let (Ok(x), Ok(y)) = (x.parse(), y.parse()) {
                config.position = Some((x, y));
            }
        }
    }
    for raw in attrs.get_all("expr") {
        if let Some((port, expr)) = raw.split_once('=') {
            let expr = expr.trim().trim_matches('"');
            config
                .port_expressions
                .insert(port.to_string(), escape::unescape_expression(expr));
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linear_workflow() {
        let src = r#"
/**
 * @nodeType Process process
 * @input execute [type:STEP]
 * @output onSuccess [type:STEP]
 * @output onFailure [type:STEP]
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
        assert_eq!(out.workflows.len(), 1);
        let wf = &out.workflows[0];
        assert_eq!(wf.instances.len(), 2);
        assert_eq!(wf.connections.len(), 3);
        assert_eq!(wf.node_types.len(), 1);
    }

    #[test]
    fn records_coerce_macro() {
        let src = r#"
/**
 * @workflow W w
 * @node src t
 * @node dst t
 * @coerce c1 src.text -> dst.amount as number
 */
"#;
        let out = parse(src, None);
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        assert_eq!(out.workflows[0].macros.len(), 1);
    }

    #[test]
    fn unknown_tag_is_warning_not_error() {
        let src = "/**\n * @workflow W w\n * @bogus thing\n */\n";
        let out = parse(src, None);
        assert!(out.errors.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn malformed_connect_is_parse_error() {
        let src = "/**\n * @workflow W w\n * @connect this is not valid\n */\n";
        let out = parse(src, None);
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn invalid_scope_identifier_is_parse_error() {
        let src = "/**\n * @nodeType T t\n * @scope 1bad\n */\n";
        let out = parse(src, None);
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn parses_a_triple_slash_hosted_workflow() {
        let src = "/// @nodeType Process process\n\
                    /// @input execute [type:STEP]\n\
                    /// @output onSuccess [type:STEP]\n\
                    \n\
                    /// @workflow Pipeline pipeline\n\
                    /// @node step1 process\n\
                    /// @connect Start.execute -> step1.execute\n\
                    /// @connect step1.onSuccess -> Exit.onSuccess\n";
        let out = parse(src, None);
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        assert_eq!(out.workflows.len(), 1);
        assert_eq!(out.workflows[0].instances.len(), 1);
    }

    #[test]
    fn node_attrs_with_colon_space_syntax_round_trip() {
        let src = r#"
/**
 * @workflow W w
 * @node step1 process [position: 10 20] [expr: port="a * b"]
 */
"#;
        let out = parse(src, None);
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        let inst = &out.workflows[0].instances[0];
        let config = inst.config.as_ref().expect("expected a config from non-default attrs");
        assert_eq!(config.position, Some((10.0, 20.0)));
        assert_eq!(config.port_expressions.get("port").map(String::as_str), Some("a * b"));
    }
}
