//! Expression checking: values, boolean filters, scalar computations.
//!
//! Filter atoms resolve their left-hand name in the enclosing schema
//! first (required inputs, optional inputs, then outputs) and fall back
//! to the scope, so a filter can constrain both the primitive's own
//! fields and parameters bound further out. The resolved overload is
//! recorded on the atom for the runtime's operator dispatch.

use thingtalk_ast::{
    BooleanExpression, FilterAtom, FunctionKind, FunctionSchema, ScalarExpression, Type,
    TypeVarScope, Value,
};

use crate::context::Checker;
use crate::error::{Result, TypeError};
use crate::operators::{comparison_signatures, resolve_overload, scalar_signatures};
use crate::params::check_in_params;
use crate::resolver::resolve_selector_schema;
use crate::scope::Scope;

/// The `$context` pseudo-variables that denote locations.
const CONTEXT_LOCATION_PREFIX: &str = "$context.location.";

/// Compute the type of a value position.
///
/// References resolve through the scope; `$event` requires an event in
/// scope except for `$event.program_id`, which is always available.
pub(crate) fn type_for_value(value: &Value, scope: &Scope) -> Result<Type> {
    match value {
        Value::VarRef { name } => {
            if name.starts_with(CONTEXT_LOCATION_PREFIX) {
                return Ok(Type::Location);
            }
            match scope.get(name)? {
                Some(ty) => Ok(ty.clone()),
                None => Err(TypeError::VariableNotInScope(name.clone())),
            }
        }
        Value::Event { field } => match field.as_deref() {
            Some("program_id") => Ok(Type::entity("tt:program_id")),
            None if scope.has_event => Ok(Type::String),
            Some("type") if scope.has_event => Ok(Type::entity("tt:function")),
            None | Some("type") => Err(TypeError::VariableNotInScope("$event".to_string())),
            Some(other) => Err(TypeError::InvalidFieldName(format!("$event.{}", other))),
        },
        other => Ok(other.literal_type().unwrap_or(Type::Any)),
    }
}

/// Resolve a filter atom's left-hand side: schema inputs, then schema
/// outputs, then scope.
fn atom_lhs_type(name: &str, schema: &FunctionSchema, scope: &Scope) -> Result<Type> {
    if let Some((ty, _)) = schema.input_type(name) {
        return Ok(ty.clone());
    }
    if let Some(ty) = schema.out().get(name) {
        return Ok(ty.clone());
    }
    match scope.get(name)? {
        Some(ty) => Ok(ty.clone()),
        None => Err(TypeError::InvalidFieldName(name.to_string())),
    }
}

fn type_check_atom(
    atom: &mut FilterAtom,
    schema: &FunctionSchema,
    scope: &mut Scope,
) -> Result<()> {
    let lhs = atom_lhs_type(&atom.name, schema, scope)?;
    let rhs = type_for_value(&atom.value, scope)?;

    // Substring matching never applies to entities.
    if (atom.operator == "=~" || atom.operator == "~=") && (lhs.is_entity() || rhs.is_entity()) {
        return Err(TypeError::invalid_parameter_types(
            &atom.operator,
            &[lhs, rhs],
        ));
    }

    let signatures = comparison_signatures(&atom.operator)
        .ok_or_else(|| TypeError::InvalidOperator(atom.operator.clone()))?;
    let resolved = resolve_overload(&atom.operator, &signatures, &[lhs, rhs])?;
    atom.overload = Some(resolved);

    if let Some(var) = atom.value.var_ref_name() {
        if scope.is_lambda_arg(var) {
            let var = var.to_string();
            scope.update_lambda_args(&var, &atom.name);
        }
    }
    Ok(())
}

/// Type-check a boolean filter expression against a schema and scope.
///
/// Combinators recurse into every operand: external sub-queries must be
/// resolved and checked even when a sibling already decides the filter.
pub(crate) fn type_check_filter(
    expr: &mut BooleanExpression,
    schema: &FunctionSchema,
    scope: &mut Scope,
    ctx: &Checker<'_>,
) -> Result<()> {
    match expr {
        BooleanExpression::True | BooleanExpression::False => Ok(()),
        BooleanExpression::And(operands) | BooleanExpression::Or(operands) => {
            for operand in operands {
                type_check_filter(operand, schema, scope, ctx)?;
            }
            Ok(())
        }
        BooleanExpression::Not(inner) => type_check_filter(inner, schema, scope, ctx),
        BooleanExpression::Atom(atom) => type_check_atom(atom, schema, scope),
        BooleanExpression::External(external) => {
            if external.schema.is_none() {
                external.schema = Some(resolve_selector_schema(
                    &external.selector,
                    &external.channel,
                    FunctionKind::Query,
                    ctx,
                )?);
            }
            let external_schema = match &external.schema {
                Some(schema) => schema.clone(),
                None => FunctionSchema::empty(),
            };
            check_in_params(&mut external.in_params, &external_schema, scope)?;
            type_check_filter(&mut external.filter, &external_schema, scope, ctx)
        }
    }
}

/// Type-check a scalar expression, returning its type.
///
/// Mirrors filter atoms: primaries go through `type_for_value`, derived
/// operators resolve against the scalar arithmetic table (recording the
/// winning overload), and boolean sub-expressions check as filters.
pub(crate) fn resolve_scalar_expression(
    expr: &mut ScalarExpression,
    schema: &FunctionSchema,
    scope: &mut Scope,
    ctx: &Checker<'_>,
) -> Result<Type> {
    match expr {
        ScalarExpression::Primary(value) => type_for_value(value, scope),
        ScalarExpression::Derived { op, operands, overload } => {
            let mut operand_types = Vec::with_capacity(operands.len());
            for operand in operands.iter_mut() {
                operand_types.push(resolve_scalar_expression(operand, schema, scope, ctx)?);
            }
            let signatures = scalar_signatures(op)
                .ok_or_else(|| TypeError::InvalidOperator(op.clone()))?;
            let resolved = resolve_overload(op, &signatures, &operand_types)?;
            let result = resolved
                .last()
                .cloned()
                .unwrap_or(Type::Any);
            *overload = Some(resolved);
            Ok(result)
        }
        ScalarExpression::Boolean(inner) => {
            type_check_filter(inner, schema, scope, ctx)?;
            Ok(Type::Boolean)
        }
    }
}

/// Check whether a value's type assigns into `expected` without
/// coercion (window and range bounds).
pub(crate) fn value_has_type(value: &Value, expected: &Type, scope: &Scope) -> Result<bool> {
    let actual = type_for_value(value, scope)?;
    let mut vars = TypeVarScope::new();
    Ok(actual.is_assignable(expected, &mut vars, false))
}

/// Check that a value has the expected type exactly (timer bases,
/// window bounds).
pub(crate) fn expect_value_type(
    name: &str,
    value: &Value,
    expected: &Type,
    scope: &Scope,
) -> Result<()> {
    let actual = type_for_value(value, scope)?;
    let mut vars = TypeVarScope::new();
    if actual.is_assignable(expected, &mut vars, false) {
        Ok(())
    } else {
        Err(TypeError::InvalidType {
            name: name.to_string(),
            expected: expected.clone(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{RetrieveError, SchemaRetriever};
    use std::collections::HashMap;

    struct EmptyRetriever;

    impl SchemaRetriever for EmptyRetriever {
        fn schema_for_selector(
            &self,
            _: &str,
            _: &str,
            _: FunctionKind,
            _: bool,
        ) -> std::result::Result<FunctionSchema, RetrieveError> {
            Err(RetrieveError::NotFound)
        }

        fn memory_schema(
            &self,
            _: &str,
            _: bool,
        ) -> std::result::Result<Option<FunctionSchema>, RetrieveError> {
            Ok(None)
        }

        fn allowed_schema_for(
            &self,
            _: &str,
            _: &str,
            _: FunctionKind,
            _: bool,
        ) -> std::result::Result<FunctionSchema, RetrieveError> {
            Err(RetrieveError::NotFound)
        }
    }

    fn check_filter(
        expr: &mut BooleanExpression,
        schema: &FunctionSchema,
        scope: &mut Scope,
    ) -> Result<()> {
        let retriever = EmptyRetriever;
        let ctx = Checker::new(&retriever, HashMap::new(), false);
        type_check_filter(expr, schema, scope, &ctx)
    }

    fn weather() -> FunctionSchema {
        FunctionSchema::new(
            vec![("location", Type::Location)],
            vec![],
            vec![
                ("temperature", Type::measure("C")),
                ("status", Type::String),
            ],
        )
    }

    #[test]
    fn test_context_location() {
        let scope = Scope::new();
        let value = Value::var_ref("$context.location.current_location");
        assert_eq!(type_for_value(&value, &scope).unwrap(), Type::Location);
    }

    #[test]
    fn test_var_ref_resolves_through_scope() {
        let mut scope = Scope::new();
        scope.add("temperature", Type::measure("C"));
        assert_eq!(
            type_for_value(&Value::var_ref("temperature"), &scope).unwrap(),
            Type::measure("C")
        );
        assert_eq!(
            type_for_value(&Value::var_ref("missing"), &scope),
            Err(TypeError::VariableNotInScope("missing".to_string()))
        );
    }

    #[test]
    fn test_event_requires_stream_in_scope() {
        let mut scope = Scope::new();
        assert_eq!(
            type_for_value(&Value::event(), &scope),
            Err(TypeError::VariableNotInScope("$event".to_string()))
        );
        // program_id is exempt.
        assert_eq!(
            type_for_value(
                &Value::Event {
                    field: Some("program_id".to_string())
                },
                &scope
            )
            .unwrap(),
            Type::entity("tt:program_id")
        );

        scope.has_event = true;
        assert_eq!(type_for_value(&Value::event(), &scope).unwrap(), Type::String);
        assert_eq!(
            type_for_value(
                &Value::Event {
                    field: Some("type".to_string())
                },
                &scope
            )
            .unwrap(),
            Type::entity("tt:function")
        );
    }

    #[test]
    fn test_trivial_filters_pass_any_schema() {
        let mut scope = Scope::new();
        check_filter(&mut BooleanExpression::True, &weather(), &mut scope).unwrap();
        check_filter(&mut BooleanExpression::False, &FunctionSchema::empty(), &mut scope)
            .unwrap();
    }

    #[test]
    fn test_atom_resolves_field_and_records_overload() {
        let mut scope = Scope::new();
        let mut filter =
            BooleanExpression::atom("temperature", ">=", Value::measure(20.0, "C"));
        check_filter(&mut filter, &weather(), &mut scope).unwrap();
        match filter {
            BooleanExpression::Atom(atom) => {
                assert_eq!(
                    atom.overload,
                    Some(vec![
                        Type::measure("C"),
                        Type::measure("C"),
                        Type::Boolean
                    ])
                );
            }
            _ => panic!("expected atom"),
        }
    }

    #[test]
    fn test_atom_unit_mismatch() {
        let mut scope = Scope::new();
        let mut filter =
            BooleanExpression::atom("temperature", ">=", Value::measure(3.0, "byte"));
        let err = check_filter(&mut filter, &weather(), &mut scope).unwrap_err();
        assert!(matches!(err, TypeError::InvalidParameterTypes { .. }));
    }

    #[test]
    fn test_atom_unknown_field() {
        let mut scope = Scope::new();
        let mut filter = BooleanExpression::atom("pressure", "==", Value::Number(3.0));
        assert_eq!(
            check_filter(&mut filter, &weather(), &mut scope),
            Err(TypeError::InvalidFieldName("pressure".to_string()))
        );
    }

    #[test]
    fn test_substring_on_entity_rejected() {
        let schema = FunctionSchema::new(
            vec![],
            vec![],
            vec![("author", Type::entity("tt:username"))],
        );
        let mut scope = Scope::new();
        let mut filter =
            BooleanExpression::atom("author", "=~", Value::String("bob".to_string()));
        let err = check_filter(&mut filter, &schema, &mut scope).unwrap_err();
        assert!(matches!(err, TypeError::InvalidParameterTypes { .. }));

        // Equality on the same entity kind is still fine.
        let mut eq = BooleanExpression::atom(
            "author",
            "==",
            Value::entity("bob", "tt:username"),
        );
        check_filter(&mut eq, &schema, &mut scope).unwrap();
    }

    #[test]
    fn test_combinators_recurse() {
        let mut scope = Scope::new();
        let mut filter = BooleanExpression::And(vec![
            BooleanExpression::atom("status", "=~", Value::String("rain".to_string())),
            BooleanExpression::Or(vec![
                BooleanExpression::True,
                BooleanExpression::Not(Box::new(BooleanExpression::atom(
                    "temperature",
                    "<",
                    Value::measure(0.0, "C"),
                ))),
            ]),
        ]);
        check_filter(&mut filter, &weather(), &mut scope).unwrap();

        // A bad atom under Or still fails the whole filter.
        let mut filter = BooleanExpression::Or(vec![
            BooleanExpression::True,
            BooleanExpression::atom("pressure", "==", Value::Number(1.0)),
        ]);
        assert!(check_filter(&mut filter, &weather(), &mut scope).is_err());
    }

    #[test]
    fn test_scalar_expression_types() {
        let retriever = EmptyRetriever;
        let ctx = Checker::new(&retriever, HashMap::new(), false);
        let mut scope = Scope::new();
        scope.add("temperature", Type::measure("C"));

        let mut expr = ScalarExpression::derived(
            "+",
            vec![
                ScalarExpression::Primary(Value::var_ref("temperature")),
                ScalarExpression::Primary(Value::measure(1.0, "C")),
            ],
        );
        let ty = resolve_scalar_expression(&mut expr, &weather(), &mut scope, &ctx).unwrap();
        assert_eq!(ty, Type::measure("C"));
        match expr {
            ScalarExpression::Derived { overload, .. } => assert!(overload.is_some()),
            _ => panic!("expected derived"),
        }
    }

    #[test]
    fn test_scalar_date_difference() {
        let retriever = EmptyRetriever;
        let ctx = Checker::new(&retriever, HashMap::new(), false);
        let mut scope = Scope::new();
        scope.add("start", Type::Date);
        scope.add("end", Type::Date);

        let mut expr = ScalarExpression::derived(
            "-",
            vec![
                ScalarExpression::Primary(Value::var_ref("end")),
                ScalarExpression::Primary(Value::var_ref("start")),
            ],
        );
        let ty = resolve_scalar_expression(&mut expr, &FunctionSchema::empty(), &mut scope, &ctx)
            .unwrap();
        assert_eq!(ty, Type::measure("ms"));
    }
}
