//! Checker diagnostics.
//!
//! Every failure of the analyzer is a [`TypeError`] naming the offending
//! construct. Errors are fatal for the current check: no recovery, no
//! partial rewrites (the checker mutates the tree only after the
//! preconditions of the step have passed).

use thiserror::Error;
use thingtalk_ast::Type;

/// Result type for checker operations.
pub type Result<T> = std::result::Result<T, TypeError>;

/// A diagnostic produced by the semantic analyzer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("invalid principal of type {0}, must be a contact or a username")]
    InvalidPrincipal(Type),

    #[error("no memory table declared with name {0}")]
    UnknownMemoryTable(String),

    #[error("{0} is not a valid builtin action")]
    InvalidBuiltinAction(String),

    #[error("no such function @{kind}.{channel}")]
    UnknownFunction { kind: String, channel: String },

    #[error("variable {0} is not in scope")]
    VariableNotInScope(String),

    #[error("name {0} is ambiguous after a join, qualify it through an alias")]
    FieldConflict(String),

    #[error("invalid field name {0}")]
    InvalidFieldName(String),

    #[error("redefinition of {0}")]
    FieldRedefinition(String),

    #[error("invalid input parameter {0}")]
    InvalidInputParameter(String),

    #[error("duplicate input parameter {0}")]
    DuplicateInputParam(String),

    #[error("invalid type for parameter {name}: expected {expected}, got {actual}")]
    InvalidType {
        name: String,
        expected: Type,
        actual: Type,
    },

    #[error("invalid operator {0}")]
    InvalidOperator(String),

    #[error("invalid parameter types {types} for operator {op}")]
    InvalidParameterTypes { op: String, types: String },

    #[error("invalid aggregation field {0}")]
    InvalidAggregationField(String),

    #[error("invalid aggregation {op} over {ty}")]
    InvalidAggregation { op: String, ty: Type },

    #[error("invalid field {0} for argmin/argmax")]
    InvalidArgMinMaxField(String),

    #[error("invalid range, base and limit must be numbers")]
    InvalidRange,

    #[error("invalid time range, base must be a date and delta a time interval")]
    InvalidTimeRange,

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("a program must have at least one query or stream")]
    NoGetFunction,

    #[error("schema retrieval failed: {0}")]
    SchemaUnavailable(String),
}

impl TypeError {
    /// Build the overload-resolution failure for an operator applied to
    /// the given operand types.
    pub fn invalid_parameter_types(op: &str, operands: &[Type]) -> Self {
        let types = operands
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        TypeError::InvalidParameterTypes {
            op: op.to_string(),
            types: format!("({})", types),
        }
    }
}
