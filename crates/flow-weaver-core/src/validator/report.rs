//! Validator output types: [`Diagnostic`] and [`Report`] (§4.4, §7).

use serde::{Deserialize, Serialize};

/// `type=error` halts nothing but marks the AST unsafe to execute;
/// `type=warning` is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Where a diagnostic applies, when it can be localized to a specific
/// instance and/or port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl Location {
    pub fn instance(id: impl Into<String>) -> Self {
        Self {
            instance: Some(id.into()),
            port: None,
        }
    }

    pub fn port(id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            instance: Some(id.into()),
            port: Some(port.into()),
        }
    }
}

/// One validator finding: `{type, code, message, location?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

/// `{valid, errors[], warnings[]}` (§4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Report {
    /// Split a flat, insertion-ordered diagnostic list into a report.
    /// `valid` is exactly `errors.is_empty()` (§8).
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for d in diagnostics {
            match d.severity {
                Severity::Error => errors.push(d),
                Severity::Warning => warnings.push(d),
            }
        }
        let valid = errors.is_empty();
        Self { valid, errors, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_matches_empty_errors() {
        let report = Report::from_diagnostics(vec![Diagnostic::warning("W", "m")]);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);

        let report = Report::from_diagnostics(vec![Diagnostic::error("E", "m")]);
        assert!(!report.valid);
    }
}
