//! The closed enumeration of port data types and their compatibility rules.

use serde::{Deserialize, Serialize};

/// The data type carried by a [`crate::port::PortDef`].
///
/// `STEP` is the control-flow type: edges between `STEP` ports sequence
/// execution rather than carrying a value. `FUNCTION` represents a
/// scope-entry capability and is never a data carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Step,
    Number,
    String,
    Boolean,
    Object,
    Array,
    Function,
    Any,
}

/// A coercion applied to a [`crate::Connection`]'s value in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    String,
    Number,
    Boolean,
    Json,
    Object,
}

impl Coercion {
    /// The declared output type a value has once this coercion has run.
    pub fn produces(&self) -> DataType {
        match self {
            Coercion::String => DataType::String,
            Coercion::Number => DataType::Number,
            Coercion::Boolean => DataType::Boolean,
            Coercion::Json => DataType::String,
            Coercion::Object => DataType::Object,
        }
    }

    /// The canonical synthetic node type that implements this coercion
    /// (invariant 9 of the data model: "the canonical coercion type for
    /// the target").
    pub fn canonical_node_type(&self) -> &'static str {
        match self {
            Coercion::String => "__fw_toString",
            Coercion::Number => "__fw_toNumber",
            Coercion::Boolean => "__fw_toBoolean",
            Coercion::Json => "__fw_toJSON",
            Coercion::Object => "__fw_parseJSON",
        }
    }
}

impl DataType {
    /// Whether a value of type `self` may flow, without any declared
    /// coercion, into a port of type `other`.
    ///
    /// `ANY` is compatible with everything in both directions; otherwise
    /// types must match exactly. This is a strictly narrower relation than
    /// "coercible" — see [`DataType::lossiness_of`] for the coercion table.
    pub fn is_directly_compatible(&self, other: &DataType) -> bool {
        matches!(self, DataType::Any) || matches!(other, DataType::Any) || self == other
    }

    /// Classifies an implicit (non-`coerce`-macro) conversion from `self`
    /// to `other`, used by the validator's `TYPE_MISMATCH` family of
    /// diagnostics.
    pub fn lossiness_of(&self, other: &DataType) -> CoercionClass {
        if self.is_directly_compatible(other) {
            return CoercionClass::None;
        }
        match (self, other) {
            (DataType::Number, DataType::String) | (DataType::Boolean, DataType::String) => {
                CoercionClass::Unusual
            }
            (DataType::String, DataType::Number) | (DataType::String, DataType::Boolean) => {
                CoercionClass::Lossy
            }
            (DataType::Object, DataType::String) | (DataType::Array, DataType::String) => {
                CoercionClass::Unusual
            }
            (DataType::String, DataType::Object) | (DataType::String, DataType::Array) => {
                CoercionClass::Lossy
            }
            _ => CoercionClass::Incompatible,
        }
    }
}

/// How surprising an implicit coercion is, driving whether the validator
/// emits `TYPE_MISMATCH`, `LOSSY_TYPE_COERCION`, `UNUSUAL_TYPE_COERCION`,
/// or (under `@strictTypes`) promotes any of the above to
/// `TYPE_INCOMPATIBLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionClass {
    /// Types match directly; no coercion needed.
    None,
    /// Coercion is well-defined and commonly intentional (e.g. number -> string).
    Unusual,
    /// Coercion may silently drop information (e.g. string -> number can fail to parse).
    Lossy,
    /// No implicit coercion exists between these types at all.
    Incompatible,
}
