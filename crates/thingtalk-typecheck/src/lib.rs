//! # ThingTalk type checker
//!
//! Static semantic analyzer for ThingTalk programs: given a tree from
//! `thingtalk-ast` and a [`SchemaRetriever`] for Thingpedia signatures,
//! it resolves every primitive invocation to its declared schema,
//! threads a lexical [`Scope`] through the composable stream/table
//! constructors, validates filters, input parameters, aggregations,
//! joins, projections, and computations against a polymorphic overload
//! table, and rewrites schemas in place to reflect each constructor's
//! compositional effect.
//!
//! # Architecture
//!
//! One module per pass, leaves first:
//!
//! ```text
//! operators  - overload tables (comparison, arithmetic, aggregation)
//! scope      - lexical environment (globals, locals, pending requireds)
//! resolver   - schema oracle access, builtin channels, class aliases
//! expr       - values, boolean filters, scalar computations
//! params     - input-parameter binding against a primitive's schema
//! tables     - table composer
//! streams    - stream composer
//! program    - program/declaration/rule/permission-rule driver
//! ```
//!
//! # Checking model
//!
//! Checking is synchronous and deterministic; the injected
//! [`SchemaRetriever`] is the only suspension point of the design. On
//! success the tree has been annotated in place (schemas attached,
//! overloads recorded, undefined slots appended for unsupplied required
//! inputs); on failure the first error is reported as a [`TypeError`]
//! and no partial rewrite is left behind. Re-checking an annotated tree
//! succeeds without observable changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use thingtalk_typecheck::{type_check_program, SchemaRetriever};
//!
//! let mut program = parse(source)?;
//! type_check_program(&mut program, &thingpedia, false)?;
//! ```

mod context;
mod error;
mod expr;
mod operators;
mod params;
mod program;
mod resolver;
mod scope;
mod streams;
mod tables;

pub use error::{Result, TypeError};
pub use operators::{
    aggregation_signatures, arg_minmax_signatures, comparison_signatures, resolve_overload,
    scalar_signatures,
};
pub use resolver::{builtin_action_schema, RetrieveError, SchemaRetriever};
pub use scope::Scope;

use std::collections::HashMap;

use thingtalk_ast::{
    BooleanExpression, FunctionKind, FunctionSchema, Invocation, PermissionRule, Program, Rule,
    Stream, Table,
};

use context::Checker;

/// Type-check a whole program against the schema oracle.
pub fn type_check_program(
    program: &mut Program,
    retriever: &dyn SchemaRetriever,
    use_meta: bool,
) -> Result<()> {
    let classes: HashMap<String, String> = program
        .classes
        .iter()
        .map(|class| (class.name.clone(), class.extends.clone()))
        .collect();
    let ctx = Checker::new(retriever, classes, use_meta);
    program::type_check_program(program, &ctx)
}

/// Type-check a permission rule.
pub fn type_check_permission_rule(
    rule: &mut PermissionRule,
    retriever: &dyn SchemaRetriever,
    use_meta: bool,
) -> Result<()> {
    let ctx = Checker::new(retriever, HashMap::new(), use_meta);
    program::type_check_permission_rule(rule, &ctx)
}

/// Type-check a single rule against an existing scope.
pub fn type_check_rule(
    rule: &mut Rule,
    retriever: &dyn SchemaRetriever,
    scope: &mut Scope,
    use_meta: bool,
) -> Result<()> {
    let ctx = Checker::new(retriever, HashMap::new(), use_meta);
    program::type_check_rule(rule, scope, &ctx)
}

/// Type-check a table, attaching schemas and publishing outputs into
/// `scope`.
pub fn type_check_table(
    table: &mut Table,
    retriever: &dyn SchemaRetriever,
    scope: &mut Scope,
    use_meta: bool,
) -> Result<()> {
    let ctx = Checker::new(retriever, HashMap::new(), use_meta);
    tables::type_check_table(table, scope, &ctx)
}

/// Type-check a stream, attaching schemas and publishing outputs into
/// `scope`.
pub fn type_check_stream(
    stream: &mut Stream,
    retriever: &dyn SchemaRetriever,
    scope: &mut Scope,
    use_meta: bool,
) -> Result<()> {
    let ctx = Checker::new(retriever, HashMap::new(), use_meta);
    streams::type_check_stream(stream, scope, &ctx)
}

/// Type-check a boolean filter against a schema and scope.
pub fn type_check_filter(
    filter: &mut BooleanExpression,
    schema: &FunctionSchema,
    retriever: &dyn SchemaRetriever,
    scope: &mut Scope,
    use_meta: bool,
) -> Result<()> {
    let ctx = Checker::new(retriever, HashMap::new(), use_meta);
    expr::type_check_filter(filter, schema, scope, &ctx)
}

/// Type-check a standalone invocation as a query or an action: resolve
/// its schema and validate its input parameters.
pub fn type_check_invocation(
    invocation: &mut Invocation,
    function_kind: FunctionKind,
    retriever: &dyn SchemaRetriever,
    scope: &mut Scope,
    use_meta: bool,
) -> Result<()> {
    let ctx = Checker::new(retriever, HashMap::new(), use_meta);
    resolver::ensure_invocation_schema(invocation, function_kind, &ctx)?;
    let schema = invocation.schema.get_or_insert_with(FunctionSchema::empty);
    params::type_check_input_args(&mut invocation.in_params, schema, scope, &ctx)
}
