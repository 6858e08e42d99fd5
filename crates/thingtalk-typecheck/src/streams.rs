//! Stream composition checking.
//!
//! Mirrors the table composer for the stream constructors: timers yield
//! the empty schema, monitors take over the monitored table's schema,
//! edge filters propagate their inner stream's schema, and a stream
//! join pairs each event with a query result.

use thingtalk_ast::{FunctionSchema, Stream, StreamKind, Type};

use crate::context::Checker;
use crate::error::{Result, TypeError};
use crate::expr::{expect_value_type, type_check_filter};
use crate::params::{check_in_params, type_check_input_args};
use crate::scope::Scope;
use crate::tables::type_check_table;

/// Type-check a stream, attaching its schema and publishing its outputs.
pub(crate) fn type_check_stream(
    stream: &mut Stream,
    scope: &mut Scope,
    ctx: &Checker<'_>,
) -> Result<()> {
    let prior = match stream.kind {
        StreamKind::VarRef { .. } => stream.schema.clone(),
        _ => None,
    };

    let schema = match &mut stream.kind {
        StreamKind::VarRef { name, in_params } => {
            // Stream references resolve through declared globals only.
            let mut schema = match prior {
                Some(schema) => schema,
                None => scope
                    .get_global(name)
                    .cloned()
                    .ok_or_else(|| TypeError::VariableNotInScope(name.clone()))?,
            };
            type_check_input_args(in_params, &mut schema, scope, ctx)?;
            scope.assign(schema.out())?;
            schema
        }

        StreamKind::Timer { base, interval } => {
            expect_value_type("base", base, &Type::Date, scope)?;
            expect_value_type("interval", interval, &Type::measure("ms"), scope)?;
            FunctionSchema::empty()
        }

        StreamKind::AtTimer { time } => {
            expect_value_type("time", time, &Type::Time, scope)?;
            FunctionSchema::empty()
        }

        StreamKind::Monitor { table, args } => {
            type_check_table(table, scope, ctx)?;
            let schema = table.schema().clone();
            if let Some(args) = args {
                for arg in args.iter() {
                    if !schema.out().contains_key(arg) {
                        return Err(TypeError::InvalidFieldName(arg.clone()));
                    }
                }
            }
            schema
        }

        StreamKind::EdgeNew { stream: inner } => {
            type_check_stream(inner, scope, ctx)?;
            inner.schema().clone()
        }

        StreamKind::EdgeFilter { stream: inner, filter }
        | StreamKind::Filter { stream: inner, filter } => {
            type_check_stream(inner, scope, ctx)?;
            let schema = inner.schema().clone();
            type_check_filter(filter, &schema, scope, ctx)?;
            schema
        }

        StreamKind::Projection { stream: inner, args } => {
            type_check_stream(inner, scope, ctx)?;
            let mut schema = inner.schema().clone();
            let dropped = schema
                .resolve_projection(args)
                .map_err(TypeError::InvalidFieldName)?;
            for name in dropped {
                scope.remove(&name);
            }
            schema
        }

        StreamKind::Alias { stream: inner, name } => {
            type_check_stream(inner, scope, ctx)?;
            let schema = inner.schema().clone();
            scope.add_global(name.clone(), schema.clone())?;
            scope.prefix(name);
            schema
        }

        StreamKind::Join {
            stream: lhs,
            table: rhs,
            in_params,
        } => {
            let mut left_scope = scope.child();
            let mut right_scope = scope.child();
            type_check_stream(lhs, &mut left_scope, ctx)?;
            left_scope.has_event = true;
            type_check_table(rhs, &mut right_scope, ctx)?;

            let (mut schema, collisions) =
                FunctionSchema::resolve_join(lhs.schema(), rhs.schema());
            for param in in_params.iter() {
                right_scope.remove_in_req(&param.name);
            }
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
    };

    stream.schema = Some(schema);
    Ok(())
}
