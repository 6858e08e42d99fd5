//! Declarative operator overload tables.
//!
//! Each operator maps to an ordered list of signatures; a signature is
//! the operand types followed by the result type. Resolution walks the
//! list in order, opens a fresh [`TypeVarScope`] per candidate, and
//! accepts the first signature every operand assigns into. The winning
//! signature is returned with its type variables substituted, so the
//! caller can record it on the tree for the runtime's dispatch.
//!
//! Four tables:
//! - comparison operators used in filters (result always `Boolean`)
//! - scalar arithmetic used in `compute`
//! - aggregation operators (`count` is special-cased by the composer)
//! - `argmin`/`argmax` field constraints

use thingtalk_ast::{Type, TypeVarScope};

use crate::error::{Result, TypeError};

/// The types the ordering comparisons (and argmin/argmax) accept.
fn orderable() -> [Type; 6] {
    [
        Type::Number,
        Type::Currency,
        Type::any_measure(),
        Type::Date,
        Type::Time,
        Type::String,
    ]
}

/// Signatures for a filter comparison operator.
pub fn comparison_signatures(op: &str) -> Option<Vec<Vec<Type>>> {
    match op {
        "==" | "!=" => Some(vec![vec![Type::var("a"), Type::var("a"), Type::Boolean]]),
        "<" | "<=" | ">" | ">=" => Some(
            orderable()
                .into_iter()
                .map(|ty| vec![ty.clone(), ty, Type::Boolean])
                .collect(),
        ),
        // Substring match and its reverse. Entity operands are rejected
        // before the table is consulted; see the filter checker.
        "=~" | "~=" => Some(vec![vec![Type::String, Type::String, Type::Boolean]]),
        "starts_with" | "ends_with" | "prefix_of" | "suffix_of" => {
            Some(vec![vec![Type::String, Type::String, Type::Boolean]])
        }
        "contains" => Some(vec![vec![
            Type::array(Type::var("a")),
            Type::var("a"),
            Type::Boolean,
        ]]),
        "in_array" => Some(vec![vec![
            Type::var("a"),
            Type::array(Type::var("a")),
            Type::Boolean,
        ]]),
        _ => None,
    }
}

/// Signatures for a scalar arithmetic operator.
pub fn scalar_signatures(op: &str) -> Option<Vec<Vec<Type>>> {
    match op {
        "+" => Some(vec![
            vec![Type::Number, Type::Number, Type::Number],
            vec![Type::Currency, Type::Currency, Type::Currency],
            vec![Type::any_measure(), Type::any_measure(), Type::any_measure()],
            vec![Type::Date, Type::measure("ms"), Type::Date],
            vec![Type::Time, Type::measure("ms"), Type::Time],
            vec![Type::String, Type::String, Type::String],
        ]),
        "-" => Some(vec![
            vec![Type::Number, Type::Number, Type::Number],
            vec![Type::Currency, Type::Currency, Type::Currency],
            vec![Type::any_measure(), Type::any_measure(), Type::any_measure()],
            vec![Type::Date, Type::measure("ms"), Type::Date],
            vec![Type::Date, Type::Date, Type::measure("ms")],
            vec![Type::Time, Type::measure("ms"), Type::Time],
        ]),
        "*" | "/" => Some(vec![
            vec![Type::Number, Type::Number, Type::Number],
            vec![Type::Currency, Type::Number, Type::Currency],
            vec![Type::any_measure(), Type::Number, Type::any_measure()],
        ]),
        _ => None,
    }
}

/// Signatures for an aggregation operator: field type, then result type.
pub fn aggregation_signatures(op: &str) -> Option<Vec<Vec<Type>>> {
    match op {
        "min" | "max" => Some(
            orderable()
                .into_iter()
                .map(|ty| vec![ty.clone(), ty])
                .collect(),
        ),
        "sum" | "avg" => Some(vec![
            vec![Type::Number, Type::Number],
            vec![Type::Currency, Type::Currency],
            vec![Type::any_measure(), Type::any_measure()],
        ]),
        _ => None,
    }
}

/// Signatures for `argmin`/`argmax`: the single field operand.
pub fn arg_minmax_signatures(op: &str) -> Option<Vec<Vec<Type>>> {
    match op {
        "argmin" | "argmax" => Some(orderable().into_iter().map(|ty| vec![ty]).collect()),
        _ => None,
    }
}

/// Resolve an operator application against a signature table.
///
/// Returns the first matching signature with type variables substituted
/// (operand types followed by the result type, when the table carries
/// one). Resolution is strict: the string coercion of input-parameter
/// binding does not apply here, or the `String` signatures of the
/// ordering operators would swallow every operand pair.
pub fn resolve_overload(
    op: &str,
    signatures: &[Vec<Type>],
    operands: &[Type],
) -> Result<Vec<Type>> {
    'candidates: for signature in signatures {
        if signature.len() < operands.len() {
            continue;
        }
        let mut scope = TypeVarScope::new();
        for (operand, expected) in operands.iter().zip(signature) {
            if !operand.is_assignable(expected, &mut scope, false) {
                continue 'candidates;
            }
        }
        return Ok(signature.iter().map(|ty| ty.resolve_vars(&scope)).collect());
    }
    Err(TypeError::invalid_parameter_types(op, operands))
}
