//! Table composition checking.
//!
//! Recursive descent over the table constructors. Every arm ends with
//! the node's schema set to a fresh clone — never a reference shared
//! with a sibling or with the Thingpedia signature — and the scope
//! updated with the constructor's effect: invocations publish their
//! outputs, projections and aggregations withdraw them, aliases qualify
//! them.

use thingtalk_ast::{FunctionKind, FunctionSchema, Table, TableKind, Type};

use crate::context::Checker;
use crate::error::{Result, TypeError};
use crate::expr::{resolve_scalar_expression, type_check_filter, value_has_type};
use crate::operators::{aggregation_signatures, arg_minmax_signatures, resolve_overload};
use crate::params::{check_in_params, type_check_input_args};
use crate::resolver::{ensure_invocation_schema, resolve_memory_schema};
use crate::scope::Scope;
use crate::streams::type_check_stream;

/// Type-check a table, attaching its schema and publishing its outputs.
pub(crate) fn type_check_table(
    table: &mut Table,
    scope: &mut Scope,
    ctx: &Checker<'_>,
) -> Result<()> {
    // A VarRef carries its resolved schema on the node itself; keep it
    // across re-checks instead of consulting the oracle again.
    let prior = match table.kind {
        TableKind::VarRef { .. } => table.schema.clone(),
        _ => None,
    };

    let schema = match &mut table.kind {
        TableKind::Invocation(invocation) => {
            ensure_invocation_schema(invocation, FunctionKind::Query, ctx)?;
            let schema = invocation.schema.get_or_insert_with(FunctionSchema::empty);
            type_check_input_args(&mut invocation.in_params, schema, scope, ctx)?;
            let schema = schema.clone();
            scope.assign(schema.out())?;
            schema
        }

        TableKind::VarRef { name, in_params } => {
            let mut schema = match prior {
                Some(schema) => schema,
                None => match scope.get_global(name) {
                    Some(schema) => schema.clone(),
                    None => resolve_memory_schema(name, ctx)?,
                },
            };
            type_check_input_args(in_params, &mut schema, scope, ctx)?;
            scope.assign(schema.out())?;
            schema
        }

        TableKind::Filter { table: inner, filter } => {
            type_check_table(inner, scope, ctx)?;
            let schema = inner.schema().clone();
            type_check_filter(filter, &schema, scope, ctx)?;
            schema
        }

        TableKind::Projection { table: inner, args } => {
            type_check_table(inner, scope, ctx)?;
            let mut schema = inner.schema().clone();
            let dropped = schema
                .resolve_projection(args)
                .map_err(TypeError::InvalidFieldName)?;
            for name in dropped {
                scope.remove(&name);
            }
            schema
        }

        TableKind::Alias { table: inner, name } => {
            type_check_table(inner, scope, ctx)?;
            let schema = inner.schema().clone();
            scope.add_global(name.clone(), schema.clone())?;
            scope.prefix(name);
            schema
        }

        TableKind::Aggregation {
            table: inner,
            field,
            op,
            alias,
            overload,
        } => {
            type_check_table(inner, scope, ctx)?;
            let mut schema = inner.schema().clone();

            let resolved = if op.as_str() == "count" && field.as_str() == "*" {
                vec![Type::Any, Type::Number]
            } else {
                let field_ty = schema
                    .out()
                    .get(field.as_str())
                    .cloned()
                    .ok_or_else(|| TypeError::InvalidAggregationField(field.clone()))?;
                let signatures = aggregation_signatures(op)
                    .ok_or_else(|| TypeError::InvalidOperator(op.clone()))?;
                resolve_overload(op, &signatures, &[field_ty.clone()]).map_err(|_| {
                    TypeError::InvalidAggregation {
                        op: op.clone(),
                        ty: field_ty,
                    }
                })?
            };
            let result_ty = resolved.last().cloned().unwrap_or(Type::Any);

            for name in schema.clean_output() {
                scope.remove(&name);
            }
            let out_name = alias.clone().unwrap_or_else(|| op.clone());
            schema.add_output(&out_name, result_ty.clone());
            scope.add(out_name, result_ty);
            *overload = Some(resolved);
            schema
        }

        TableKind::ArgMinMax {
            table: inner,
            field,
            op,
            base,
            limit,
        } => {
            type_check_table(inner, scope, ctx)?;
            let schema = inner.schema().clone();
            let field_ty = schema
                .out()
                .get(field.as_str())
                .cloned()
                .ok_or_else(|| TypeError::InvalidArgMinMaxField(field.clone()))?;
            let signatures = arg_minmax_signatures(op)
                .ok_or_else(|| TypeError::InvalidOperator(op.clone()))?;
            resolve_overload(op, &signatures, &[field_ty])
                .map_err(|_| TypeError::InvalidArgMinMaxField(field.clone()))?;
            if !value_has_type(base, &Type::Number, scope)?
                || !value_has_type(limit, &Type::Number, scope)?
            {
                return Err(TypeError::InvalidRange);
            }
            schema
        }

        TableKind::Join { lhs, rhs, in_params } => {
            let mut left_scope = scope.child();
            let mut right_scope = scope.child();
            type_check_table(lhs, &mut left_scope, ctx)?;
            // The right side may consume the left's record through $event
            // and parameter passing.
            left_scope.has_event = true;
            type_check_table(rhs, &mut right_scope, ctx)?;

            let (mut schema, collisions) =
                FunctionSchema::resolve_join(lhs.schema(), rhs.schema());
            for param in in_params.iter() {
                right_scope.remove_in_req(&param.name);
            }
            // Join parameters bind right-side inputs; their values read
            // the left scope.
            let rhs_schema = rhs.schema().clone();
            check_in_params(in_params, &rhs_schema, &mut left_scope)?;
            for param in in_params.iter() {
                schema.remove_input(&param.name);
            }

            scope.merge(&left_scope);
            scope.merge(&right_scope);
            for name in collisions {
                scope.add_conflict(name);
            }
            schema
        }

        TableKind::Window { base, delta, stream } => {
            if !value_has_type(base, &Type::Number, scope)?
                || !value_has_type(delta, &Type::Number, scope)?
            {
                return Err(TypeError::InvalidRange);
            }
            type_check_stream(stream, scope, ctx)?;
            stream.schema().clone()
        }

        TableKind::TimeSeries { base, delta, stream } => {
            if !value_has_type(base, &Type::Date, scope)?
                || !value_has_type(delta, &Type::measure("ms"), scope)?
            {
                return Err(TypeError::InvalidTimeRange);
            }
            type_check_stream(stream, scope, ctx)?;
            stream.schema().clone()
        }

        TableKind::Sequence { base, delta, table: inner } => {
            if !value_has_type(base, &Type::Number, scope)?
                || !value_has_type(delta, &Type::Number, scope)?
            {
                return Err(TypeError::InvalidRange);
            }
            type_check_table(inner, scope, ctx)?;
            inner.schema().clone()
        }

        TableKind::History { base, delta, table: inner } => {
            if !value_has_type(base, &Type::Date, scope)?
                || !value_has_type(delta, &Type::measure("ms"), scope)?
            {
                return Err(TypeError::InvalidTimeRange);
            }
            type_check_table(inner, scope, ctx)?;
            inner.schema().clone()
        }

        TableKind::Compute {
            table: inner,
            expression,
            alias,
        } => {
            type_check_table(inner, scope, ctx)?;
            let mut schema = inner.schema().clone();
            let ty = resolve_scalar_expression(expression, &schema, scope, ctx)?;
            for name in schema.clean_output() {
                scope.remove(&name);
            }
            let out_name = alias.clone().unwrap_or_else(|| "result".to_string());
            schema.add_output(&out_name, ty.clone());
            scope.add(out_name, ty);
            schema
        }
    };

    table.schema = Some(schema);
    Ok(())
}
