//! Per-line recursive-descent grammar for annotation tags.
//!
//! A content line is `@tagName arg1 arg2 [key:value key2:"v 2" flag] - label`.
//! Attribute brackets are order-independent and may appear more than once;
//! their keys are merged left-to-right. `- label` (a lone `-` token) marks
//! the remainder of the line as a human label.

use std::collections::BTreeMap;

/// The parsed `[key:value ...]` contents of zero or more bracket groups,
/// merged. A key may repeat (e.g. one `expr:` per port); all values are
/// kept in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs {
    pub values: BTreeMap<String, Vec<String>>,
    pub flags: Vec<String>,
}

impl Attrs {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.first()).map(|s| s.as_str())
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// A tokenized line: the tag name, the remaining tokens before any
/// attribute bracket or label marker, the merged attrs, and the label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    pub tag: String,
    pub positional: Vec<String>,
    pub attrs: Attrs,
    pub label: Option<String>,
}

/// Tokenize and structure one `@tag ...` line. Returns `None` if the
/// line isn't a tag (doesn't start with `@`) — callers treat that as a
/// free-text continuation line, not an error.
pub fn parse_tag_line(text: &str) -> Option<Result<TagLine, String>> {
    let text = text.trim();
    if !text.starts_with('@') {
        return None;
    }
    let tokens = match tokenize(&text[1..]) {
        Ok(t) => t,
        Err(e) => return Some(Err(e)),
    };
    let mut iter = tokens.into_iter();
    let Some(tag) = iter.next() else {
        return Some(Err("empty tag".to_string()));
    };

    let mut positional = Vec::new();
    let mut attrs = Attrs::default();
    let mut label_tokens: Vec<String> = Vec::new();
    let mut in_label = false;

    for tok in iter {
        if in_label {
            label_tokens.push(tok);
            continue;
        }
        if tok == "-" {
            in_label = true;
            continue;
        }
        if tok.starts_with('[') && tok.ends_with(']') {
            match parse_bracket(&tok[1..tok.len() - 1]) {
                Ok((vals, flags)) => {
                    for (k, v) in vals {
                        attrs.values.entry(k).or_default().push(v);
                    }
                    attrs.flags.extend(flags);
                }
                Err(e) => return Some(Err(e)),
            }
            continue;
        }
        positional.push(unquote(&tok));
    }

    let label = if label_tokens.is_empty() {
        None
    } else {
        Some(label_tokens.join(" "))
    };

    Some(Ok(TagLine {
        tag,
        positional,
        attrs,
        label,
    }))
}

/// Split a bracket's inner text into comma-separated segments (respecting
/// quotes) and parse each into a `key:value` pair or a bare flag.
///
/// A segment's first top-level `:` decides its shape: if whitespace
/// follows the colon directly (`key: value`), the rest of the segment —
/// possibly containing further spaces, e.g. `position: x y` or
/// `expr: port="expression"` — is the whole value. Otherwise (`key:value`,
/// no space) the segment is whitespace-tokenized and each token is split
/// on its own colon, so compact multi-entry segments like
/// `type:NUMBER optional` keep working the way they always have.
fn parse_bracket(inner: &str) -> Result<(Vec<(String, String)>, Vec<String>), String> {
    let mut values = Vec::new();
    let mut flags = Vec::new();
    for segment in split_top_level(inner, ',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match find_top_level_colon(segment) {
            Some(idx) => {
                let (key, rest) = segment.split_at(idx);
                let after = &rest[1..];
                if after.starts_with(char::is_whitespace) {
                    values.push((key.trim().to_string(), unquote(after.trim())));
                } else {
                    for tok in tokenize(segment)? {
                        match tok.split_once(':') {
                            Some((k, v)) => values.push((k.trim().to_string(), unquote(v.trim()))),
                            None => flags.push(tok),
                        }
                    }
                }
            }
            None => flags.extend(tokenize(segment)?),
        }
    }
    Ok((values, flags))
}

/// Split `s` on every top-level occurrence of `sep`, treating `"..."` runs
/// as opaque so a separator inside a quoted value is never split on.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in s.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
        } else if c == sep && !in_quotes {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Byte offset of the first `:` in `s` that isn't inside a `"..."` span.
fn find_top_level_colon(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Whitespace tokenizer that keeps `[...]` bracket groups and `"..."`
/// quoted strings intact as single tokens, and understands `key:"v v"`
/// as one token.
fn tokenize(s: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    let mut current = String::new();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            chars.next();
            continue;
        }
        if c == '[' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            let mut depth = 0i32;
            let mut in_quotes = false;
            let mut group = String::new();
            loop {
                let Some(c) = chars.next() else {
                    return Err("unterminated '[' in tag attributes".to_string());
                };
                group.push(c);
                match c {
                    '"' => in_quotes = !in_quotes,
                    '[' if !in_quotes => depth += 1,
                    ']' if !in_quotes => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            tokens.push(group);
            continue;
        }
        if c == '"' {
            current.push(chars.next().unwrap());
            loop {
                let Some(c) = chars.next() else {
                    return Err("unterminated '\"' in tag line".to_string());
                };
                current.push(c);
                if c == '"' {
                    break;
                }
            }
            continue;
        }
        current.push(c);
        chars.next();
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_tag() {
        let line = parse_tag_line("@workflow MyFlow my_flow").unwrap().unwrap();
        assert_eq!(line.tag, "workflow");
        assert_eq!(line.positional, vec!["MyFlow", "my_flow"]);
    }

    #[test]
    fn parses_attrs_and_label() {
        let line = parse_tag_line(r#"@input amount [type:NUMBER optional] - The amount"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.tag, "input");
        assert_eq!(line.positional, vec!["amount"]);
        assert_eq!(line.attrs.get("type"), Some("NUMBER"));
        assert!(line.attrs.has_flag("optional"));
        assert_eq!(line.label.as_deref(), Some("The amount"));
    }

    #[test]
    fn parses_quoted_attr_value() {
        let line = parse_tag_line(r#"@node step1 process [label:"Step One"]"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.attrs.get("label"), Some("Step One"));
    }

    #[test]
    fn non_tag_line_is_none() {
        assert!(parse_tag_line("just prose").is_none());
    }

    #[test]
    fn unterminated_bracket_is_error() {
        let err = parse_tag_line("@input a [type:STRING").unwrap();
        assert!(err.is_err());
    }

    #[test]
    fn parses_colon_space_attr_with_quoted_expression() {
        let line = parse_tag_line(r#"@node step1 process [expr: port="expression"]"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.attrs.get("expr"), Some(r#"port="expression""#));
    }

    #[test]
    fn parses_colon_space_attr_with_multiple_words() {
        let line = parse_tag_line(r#"@node step1 process [position: 10 20]"#).unwrap().unwrap();
        assert_eq!(line.attrs.get("position"), Some("10 20"));
    }

    #[test]
    fn parses_comma_separated_attrs() {
        let line = parse_tag_line("@input amount [type:STEP, optional]").unwrap().unwrap();
        assert_eq!(line.attrs.get("type"), Some("STEP"));
        assert!(line.attrs.has_flag("optional"));
    }
}
