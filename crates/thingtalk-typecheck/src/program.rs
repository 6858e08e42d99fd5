//! Program, declaration, rule, and permission-rule checking.
//!
//! Declarations are checked strictly in source order, then rules in
//! source order; inside a rule the stream or table is checked before the
//! actions. One scope threads through the whole program; it is cleaned
//! between items so declarations and rules check independently, with
//! declaration schemas as the only state crossing a boundary.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use thingtalk_ast::{
    BooleanExpression, Declaration, DeclarationValue, FunctionKind, FunctionSchema, InputParam,
    Invocation, PermissionFunction, PermissionRule, Program, Rule, ScalarExpression, Stream,
    StreamKind, Table, TableKind, Type, Value,
};

use crate::context::Checker;
use crate::error::{Result, TypeError};
use crate::expr::type_check_filter;
use crate::params::{add_required_undefineds, type_check_input_args};
use crate::resolver::{ensure_invocation_schema, RetrieveError};
use crate::scope::Scope;
use crate::streams::type_check_stream;
use crate::tables::type_check_table;

/// Type-check a whole program.
pub(crate) fn type_check_program(program: &mut Program, ctx: &Checker<'_>) -> Result<()> {
    if let Some(principal) = &program.principal {
        let ty = principal.literal_type().unwrap_or(Type::Any);
        match &ty {
            Type::Entity(kind) if kind == "tt:contact" || kind == "tt:username" => {}
            _ => return Err(TypeError::InvalidPrincipal(ty)),
        }
    }

    let mut scope = Scope::new();
    for declaration in &mut program.declarations {
        debug!(name = %declaration.name, "checking declaration");
        scope.clean(None);
        type_check_declaration(declaration, &mut scope, ctx)?;
    }
    for (index, rule) in program.rules.iter_mut().enumerate() {
        debug!(index, "checking rule");
        scope.clean(None);
        type_check_rule(rule, &mut scope, ctx)?;
    }
    Ok(())
}

/// Type-check a declaration and bind it as a global.
pub(crate) fn type_check_declaration(
    declaration: &mut Declaration,
    scope: &mut Scope,
    ctx: &Checker<'_>,
) -> Result<()> {
    let original_args: Vec<String> = declaration.args.keys().cloned().collect();
    scope.init_lambda_args(&declaration.args)?;

    let dctx = ctx.for_declaration();
    let mut schema = match &mut declaration.value {
        DeclarationValue::Table(table) => {
            type_check_table(table, scope, &dctx)?;
            table.schema().clone()
        }
        DeclarationValue::Stream(stream) => {
            type_check_stream(stream, scope, &dctx)?;
            stream.schema().clone()
        }
        DeclarationValue::Action(invocation) => {
            ensure_invocation_schema(invocation, FunctionKind::Action, &dctx)?;
            let schema = invocation.schema.get_or_insert_with(FunctionSchema::empty);
            type_check_input_args(&mut invocation.in_params, schema, scope, &dctx)?;
            schema.clone()
        }
    };

    // Requireds still pending at the boundary become the declaration's
    // own parameters.
    for (name, ty) in scope.drain_in_req() {
        schema.add_input(&name, ty, true);
    }

    // Rename lambda parameters to the call-site names they were bound
    // through, aligning the argument list and the body's references with
    // the schema inputs.
    let renames: HashMap<String, String> = scope
        .lambda_args()
        .iter()
        .filter_map(|(param, aliases)| {
            aliases.last().map(|alias| (param.clone(), alias.clone()))
        })
        .filter(|(param, alias)| param != alias)
        .collect();
    if !renames.is_empty() {
        declaration.args = declaration
            .args
            .iter()
            .map(|(name, ty)| {
                let name = renames.get(name).unwrap_or(name);
                (name.clone(), ty.clone())
            })
            .collect();
        match &mut declaration.value {
            DeclarationValue::Table(table) => rename_var_refs_table(table, &renames),
            DeclarationValue::Stream(stream) => rename_var_refs_stream(stream, &renames),
            DeclarationValue::Action(invocation) => {
                rename_var_refs_params(&mut invocation.in_params, &renames)
            }
        }
    }

    scope.clean(Some(&original_args));
    declaration.schema = Some(schema.clone());
    scope.add_global(declaration.name.clone(), schema)?;
    Ok(())
}

fn rename_var_refs_value(value: &mut Value, renames: &HashMap<String, String>) {
    if let Value::VarRef { name } = value {
        if let Some(renamed) = renames.get(name) {
            *name = renamed.clone();
        }
    }
}

fn rename_var_refs_params(params: &mut [InputParam], renames: &HashMap<String, String>) {
    for param in params {
        rename_var_refs_value(&mut param.value, renames);
    }
}

fn rename_var_refs_filter(expr: &mut BooleanExpression, renames: &HashMap<String, String>) {
    match expr {
        BooleanExpression::True | BooleanExpression::False => {}
        BooleanExpression::And(operands) | BooleanExpression::Or(operands) => {
            for operand in operands {
                rename_var_refs_filter(operand, renames);
            }
        }
        BooleanExpression::Not(inner) => rename_var_refs_filter(inner, renames),
        BooleanExpression::Atom(atom) => rename_var_refs_value(&mut atom.value, renames),
        BooleanExpression::External(external) => {
            rename_var_refs_params(&mut external.in_params, renames);
            rename_var_refs_filter(&mut external.filter, renames);
        }
    }
}

fn rename_var_refs_scalar(expr: &mut ScalarExpression, renames: &HashMap<String, String>) {
    match expr {
        ScalarExpression::Primary(value) => rename_var_refs_value(value, renames),
        ScalarExpression::Derived { operands, .. } => {
            for operand in operands {
                rename_var_refs_scalar(operand, renames);
            }
        }
        ScalarExpression::Boolean(inner) => rename_var_refs_filter(inner, renames),
    }
}

fn rename_var_refs_table(table: &mut Table, renames: &HashMap<String, String>) {
    match &mut table.kind {
        TableKind::Invocation(invocation) => {
            rename_var_refs_params(&mut invocation.in_params, renames)
        }
        TableKind::VarRef { in_params, .. } => rename_var_refs_params(in_params, renames),
        TableKind::Filter { table: inner, filter } => {
            rename_var_refs_table(inner, renames);
            rename_var_refs_filter(filter, renames);
        }
        TableKind::Projection { table: inner, .. }
        | TableKind::Alias { table: inner, .. }
        | TableKind::Aggregation { table: inner, .. } => rename_var_refs_table(inner, renames),
        TableKind::ArgMinMax {
            table: inner,
            base,
            limit,
            ..
        } => {
            rename_var_refs_table(inner, renames);
            rename_var_refs_value(base, renames);
            rename_var_refs_value(limit, renames);
        }
        TableKind::Join { lhs, rhs, in_params } => {
            rename_var_refs_table(lhs, renames);
            rename_var_refs_table(rhs, renames);
            rename_var_refs_params(in_params, renames);
        }
        TableKind::Window { base, delta, stream }
        | TableKind::TimeSeries { base, delta, stream } => {
            rename_var_refs_value(base, renames);
            rename_var_refs_value(delta, renames);
            rename_var_refs_stream(stream, renames);
        }
        TableKind::Sequence { base, delta, table: inner }
        | TableKind::History { base, delta, table: inner } => {
            rename_var_refs_value(base, renames);
            rename_var_refs_value(delta, renames);
            rename_var_refs_table(inner, renames);
        }
        TableKind::Compute {
            table: inner,
            expression,
            ..
        } => {
            rename_var_refs_table(inner, renames);
            rename_var_refs_scalar(expression, renames);
        }
    }
}

fn rename_var_refs_stream(stream: &mut Stream, renames: &HashMap<String, String>) {
    match &mut stream.kind {
        StreamKind::VarRef { in_params, .. } => rename_var_refs_params(in_params, renames),
        StreamKind::Timer { base, interval } => {
            rename_var_refs_value(base, renames);
            rename_var_refs_value(interval, renames);
        }
        StreamKind::AtTimer { time } => rename_var_refs_value(time, renames),
        StreamKind::Monitor { table, .. } => rename_var_refs_table(table, renames),
        StreamKind::EdgeNew { stream: inner } => rename_var_refs_stream(inner, renames),
        StreamKind::EdgeFilter { stream: inner, filter }
        | StreamKind::Filter { stream: inner, filter } => {
            rename_var_refs_stream(inner, renames);
            rename_var_refs_filter(filter, renames);
        }
        StreamKind::Projection { stream: inner, .. }
        | StreamKind::Alias { stream: inner, .. } => rename_var_refs_stream(inner, renames),
        StreamKind::Join {
            stream: lhs,
            table: rhs,
            in_params,
        } => {
            rename_var_refs_stream(lhs, renames);
            rename_var_refs_table(rhs, renames);
            rename_var_refs_params(in_params, renames);
        }
    }
}

/// Type-check a rule: its stream or table, then its actions, then the
/// slot-filling postcondition.
pub(crate) fn type_check_rule(rule: &mut Rule, scope: &mut Scope, ctx: &Checker<'_>) -> Result<()> {
    if rule.stream.is_none()
        && rule.table.is_none()
        && rule.actions.iter().all(Invocation::is_builtin)
    {
        return Err(TypeError::NoGetFunction);
    }

    if let Some(stream) = &mut rule.stream {
        type_check_stream(stream, scope, ctx)?;
        scope.has_event = true;
    } else if let Some(table) = &mut rule.table {
        type_check_table(table, scope, ctx)?;
    }

    for action in &mut rule.actions {
        type_check_action(action, scope, ctx)?;
    }

    // Postcondition for downstream slot-filling: every primitive carries
    // an explicit undefined slot for each required input nothing supplies.
    let top = HashSet::new();
    if let Some(stream) = &mut rule.stream {
        append_missing_stream(stream, &top);
    }
    if let Some(table) = &mut rule.table {
        append_missing_table(table, &top);
    }
    for action in &mut rule.actions {
        if let Some(schema) = action.schema.clone() {
            add_required_undefineds(&mut action.in_params, &schema, &top);
        }
    }
    Ok(())
}

fn type_check_action(action: &mut Invocation, scope: &mut Scope, ctx: &Checker<'_>) -> Result<()> {
    ensure_invocation_schema(action, FunctionKind::Action, ctx)?;
    let schema = action.schema.get_or_insert_with(FunctionSchema::empty);
    type_check_input_args(&mut action.in_params, schema, scope, ctx)
}

/// Append undefined slots for unsupplied requireds of every primitive in
/// a table, accounting for inputs supplied by enclosing joins.
fn append_missing_table(table: &mut Table, supplied: &HashSet<String>) {
    let node_schema = table.schema.clone();
    match &mut table.kind {
        TableKind::Invocation(invocation) => {
            if let Some(schema) = invocation.schema.clone() {
                add_required_undefineds(&mut invocation.in_params, &schema, supplied);
            }
        }
        TableKind::VarRef { in_params, .. } => {
            if let Some(schema) = node_schema {
                add_required_undefineds(in_params, &schema, supplied);
            }
        }
        TableKind::Filter { table: inner, .. }
        | TableKind::Projection { table: inner, .. }
        | TableKind::Alias { table: inner, .. }
        | TableKind::Aggregation { table: inner, .. }
        | TableKind::ArgMinMax { table: inner, .. }
        | TableKind::Sequence { table: inner, .. }
        | TableKind::History { table: inner, .. }
        | TableKind::Compute { table: inner, .. } => append_missing_table(inner, supplied),
        TableKind::Window { stream, .. } | TableKind::TimeSeries { stream, .. } => {
            append_missing_stream(stream, supplied)
        }
        TableKind::Join { lhs, rhs, in_params } => {
            append_missing_table(lhs, supplied);
            let mut rhs_supplied = supplied.clone();
            rhs_supplied.extend(in_params.iter().map(|p| p.name.clone()));
            append_missing_table(rhs, &rhs_supplied);
        }
    }
}

fn append_missing_stream(stream: &mut Stream, supplied: &HashSet<String>) {
    let node_schema = stream.schema.clone();
    match &mut stream.kind {
        StreamKind::VarRef { in_params, .. } => {
            if let Some(schema) = node_schema {
                add_required_undefineds(in_params, &schema, supplied);
            }
        }
        StreamKind::Timer { .. } | StreamKind::AtTimer { .. } => {}
        StreamKind::Monitor { table, .. } => append_missing_table(table, supplied),
        StreamKind::EdgeNew { stream: inner } => append_missing_stream(inner, supplied),
        StreamKind::EdgeFilter { stream: inner, .. }
        | StreamKind::Filter { stream: inner, .. }
        | StreamKind::Projection { stream: inner, .. }
        | StreamKind::Alias { stream: inner, .. } => append_missing_stream(inner, supplied),
        StreamKind::Join {
            stream: lhs,
            table: rhs,
            in_params,
        } => {
            append_missing_stream(lhs, supplied);
            let mut rhs_supplied = supplied.clone();
            rhs_supplied.extend(in_params.iter().map(|p| p.name.clone()));
            append_missing_table(rhs, &rhs_supplied);
        }
    }
}

/// Type-check a permission rule: the principal filter, then the query
/// side, then the action side with the query's outputs in scope.
pub(crate) fn type_check_permission_rule(
    rule: &mut PermissionRule,
    ctx: &Checker<'_>,
) -> Result<()> {
    let mut scope = Scope::new();
    scope.add("source", Type::entity("tt:contact"));
    type_check_filter(&mut rule.principal, &FunctionSchema::empty(), &mut scope, ctx)?;

    check_permission_function(&mut rule.query, FunctionKind::Query, &mut scope, ctx, true)?;
    scope.has_event = true;
    check_permission_function(&mut rule.action, FunctionKind::Action, &mut scope, ctx, false)?;
    Ok(())
}

fn check_permission_function(
    function: &mut PermissionFunction,
    function_kind: FunctionKind,
    scope: &mut Scope,
    ctx: &Checker<'_>,
    publish_outputs: bool,
) -> Result<()> {
    match function {
        PermissionFunction::Builtin => Ok(()),
        PermissionFunction::Specified {
            kind,
            channel,
            filter,
            schema,
        } => {
            if schema.is_none() {
                let fetched = ctx
                    .retriever
                    .allowed_schema_for(kind, channel, function_kind, ctx.use_meta)
                    .map_err(|err| match err {
                        RetrieveError::NotFound => TypeError::UnknownFunction {
                            kind: kind.clone(),
                            channel: channel.clone(),
                        },
                        RetrieveError::Backend(message) => TypeError::SchemaUnavailable(message),
                    })?;
                *schema = Some(fetched);
            }
            let resolved = match schema {
                Some(schema) => schema.clone(),
                None => FunctionSchema::empty(),
            };
            type_check_filter(filter, &resolved, scope, ctx)?;
            if publish_outputs {
                scope.assign(resolved.out())?;
            }
            Ok(())
        }
    }
}
