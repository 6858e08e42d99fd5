//! Primitive invocations and their selectors.

use serde::{Deserialize, Serialize};

use crate::ast::value::Value;
use crate::schema::FunctionSchema;

/// Identifies the device a channel belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    /// The built-in pseudo-device (`notify`, `return`, `save`).
    Builtin,
    /// A Thingpedia device class, optionally pinned to a device instance
    /// or owned by a remote principal.
    Device {
        /// Device class, e.g. `com.twitter`.
        kind: String,
        /// Concrete device id, when the program is slotted.
        id: Option<String>,
        /// Owner for remote execution.
        principal: Option<Value>,
    },
}

impl Selector {
    /// Create a device selector by kind alone.
    pub fn device(kind: impl Into<String>) -> Self {
        Selector::Device {
            kind: kind.into(),
            id: None,
            principal: None,
        }
    }
}

/// A named input-parameter binding at a call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParam {
    pub name: String,
    pub value: Value,
}

impl InputParam {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        InputParam {
            name: name.into(),
            value,
        }
    }
}

/// An invocation of a Thingpedia function.
///
/// `schema` starts out empty and is attached by the schema resolver on
/// first encounter; re-checking an annotated tree leaves it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub selector: Selector,
    pub channel: String,
    pub in_params: Vec<InputParam>,
    pub schema: Option<FunctionSchema>,
}

impl Invocation {
    pub fn new(selector: Selector, channel: impl Into<String>, in_params: Vec<InputParam>) -> Self {
        Invocation {
            selector,
            channel: channel.into(),
            in_params,
            schema: None,
        }
    }

    /// Check if this invokes the built-in pseudo-device.
    pub fn is_builtin(&self) -> bool {
        matches!(self.selector, Selector::Builtin)
    }
}

/// A class declaration aliasing a Thingpedia device kind.
///
/// When a selector's kind names a class, schema resolution substitutes
/// the extended kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub extends: String,
}
