//! Literal and reference values.

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Geographic coordinates with an optional display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub display: Option<String>,
}

/// A value position in the tree: literals, variable references, the
/// event pseudo-value, and the undefined placeholder used by
/// slot-filling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    String(String),
    Number(f64),
    /// Dimensioned quantity with a fixed unit (`21.5 C`, `5 ms`).
    Measure { value: f64, unit: String },
    /// Sum of measures in mixed units (`6 ft 3 in`); the unit names the
    /// dimension the components share.
    CompoundMeasure { values: Vec<(f64, String)>, unit: String },
    /// Monetary amount with an ISO currency code.
    Currency { value: f64, code: String },
    /// Calendar timestamp (milliseconds since the Unix epoch; the
    /// checker treats the payload as opaque).
    Date { epoch_ms: i64 },
    /// Time of day.
    Time { hour: u8, minute: u8, second: u8 },
    Location(Location),
    /// Branded string, e.g. `"bob"^^tt:username`.
    Entity {
        value: String,
        /// Ontology key; mutated in place by contextual coercion.
        kind: String,
        display: Option<String>,
    },
    /// A choice from an enumerated parameter.
    Enum(String),
    Array(Vec<Value>),
    /// Reference to a name in scope (a local, a projected output, or a
    /// `$context` pseudo-variable).
    VarRef { name: String },
    /// The current trigger record (`$event`, `$event.type`, ...).
    Event { field: Option<String> },
    /// Placeholder for a parameter that has not been supplied yet.
    /// `remote` slots are filled by the counterpart in a remote program.
    Undefined { remote: bool },
}

impl Value {
    /// Create a variable reference.
    pub fn var_ref(name: impl Into<String>) -> Self {
        Value::VarRef { name: name.into() }
    }

    /// Create an entity value.
    pub fn entity(value: impl Into<String>, kind: impl Into<String>) -> Self {
        Value::Entity {
            value: value.into(),
            kind: kind.into(),
            display: None,
        }
    }

    /// Create a measure value.
    pub fn measure(value: f64, unit: impl Into<String>) -> Self {
        Value::Measure {
            value,
            unit: unit.into(),
        }
    }

    /// Create the bare `$event` reference.
    pub fn event() -> Self {
        Value::Event { field: None }
    }

    /// Check for the undefined placeholder.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined { .. })
    }

    /// The name referenced, when this is a plain variable reference.
    pub fn var_ref_name(&self) -> Option<&str> {
        match self {
            Value::VarRef { name } => Some(name),
            _ => None,
        }
    }

    /// The intrinsic type of a literal, when the value has one without
    /// consulting scope. References, events, and undefined placeholders
    /// return `None` and are typed by the expression checker.
    pub fn literal_type(&self) -> Option<Type> {
        match self {
            Value::Boolean(_) => Some(Type::Boolean),
            Value::String(_) => Some(Type::String),
            Value::Number(_) => Some(Type::Number),
            Value::Measure { unit, .. } => Some(Type::Measure(unit.clone())),
            Value::CompoundMeasure { unit, .. } => Some(Type::Measure(unit.clone())),
            Value::Currency { .. } => Some(Type::Currency),
            Value::Date { .. } => Some(Type::Date),
            Value::Time { .. } => Some(Type::Time),
            Value::Location(_) => Some(Type::Location),
            Value::Entity { kind, .. } => Some(Type::Entity(kind.clone())),
            Value::Enum(_) => Some(Type::Enum(None)),
            Value::Array(values) => {
                let elem = values
                    .first()
                    .and_then(Value::literal_type)
                    .unwrap_or(Type::Any);
                Some(Type::array(elem))
            }
            Value::VarRef { .. } | Value::Event { .. } => None,
            // Undefined matches anything; typed as Any at the use site.
            Value::Undefined { .. } => Some(Type::Any),
        }
    }
}
