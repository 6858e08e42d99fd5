//! Boolean filter expressions and scalar computations.

use serde::{Deserialize, Serialize};

use crate::ast::invocation::{InputParam, Selector};
use crate::ast::value::Value;
use crate::schema::FunctionSchema;
use crate::types::Type;

/// An atomic comparison inside a filter (`temperature >= 20C`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterAtom {
    /// Field or scope name on the left-hand side.
    pub name: String,
    /// Comparison operator (`==`, `>=`, `=~`, `contains`, ...).
    pub operator: String,
    pub value: Value,
    /// Resolved overload signature (operand types then result), recorded
    /// by the checker for the runtime's operator dispatch.
    pub overload: Option<Vec<Type>>,
}

impl FilterAtom {
    pub fn new(name: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        FilterAtom {
            name: name.into(),
            operator: operator.into(),
            value,
            overload: None,
        }
    }
}

/// A sub-query predicate (`@org.weather.current() { temperature >= 0C }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPredicate {
    pub selector: Selector,
    pub channel: String,
    pub in_params: Vec<InputParam>,
    pub filter: Box<BooleanExpression>,
    pub schema: Option<FunctionSchema>,
}

/// Boolean combinator tree over atoms and external sub-queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BooleanExpression {
    True,
    False,
    And(Vec<BooleanExpression>),
    Or(Vec<BooleanExpression>),
    Not(Box<BooleanExpression>),
    Atom(FilterAtom),
    External(ExternalPredicate),
}

impl BooleanExpression {
    /// Create an atomic comparison.
    pub fn atom(name: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        BooleanExpression::Atom(FilterAtom::new(name, operator, value))
    }
}

/// Scalar computation attached to a `compute` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarExpression {
    /// A value position (literal or reference).
    Primary(Value),
    /// An operator application over sub-expressions.
    Derived {
        op: String,
        operands: Vec<ScalarExpression>,
        /// Resolved overload, recorded by the checker.
        overload: Option<Vec<Type>>,
    },
    /// A filter used as a boolean-valued scalar.
    Boolean(Box<BooleanExpression>),
}

impl ScalarExpression {
    /// Create an operator application.
    pub fn derived(op: impl Into<String>, operands: Vec<ScalarExpression>) -> Self {
        ScalarExpression::Derived {
            op: op.into(),
            operands,
            overload: None,
        }
    }
}
