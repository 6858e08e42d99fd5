//! Schema resolution — filling primitives from the schema oracle.
//!
//! The [`SchemaRetriever`] trait is the checker's window onto Thingpedia:
//! an injected oracle for function signatures, user memory tables, and
//! permission schemas. It is the only suspension point of the design —
//! everything else in the checker is synchronous — so an async client
//! belongs inside (or in front of) a retriever implementation, which also
//! keeps checking deterministic under test.
//!
//! Builtin action channels (`notify`, `return`, `save`) resolve to fixed
//! empty schemas without consulting the oracle.

use thiserror::Error;
use tracing::debug;

use thingtalk_ast::{FunctionKind, FunctionSchema, Invocation, Selector};

use crate::context::Checker;
use crate::error::{Result, TypeError};

/// Failure of a schema lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrieveError {
    /// No function with the requested name is declared.
    #[error("no such function")]
    NotFound,
    /// The backing store failed (network, index corruption, ...).
    #[error("{0}")]
    Backend(String),
}

/// The schema oracle: declared signatures of Thingpedia functions.
///
/// Implementations are expected to be safe for concurrent reads and to
/// cache internally; the checker calls them once per unresolved
/// primitive.
pub trait SchemaRetriever {
    /// Declared signature of a Thingpedia function.
    fn schema_for_selector(
        &self,
        kind: &str,
        channel: &str,
        function_kind: FunctionKind,
        use_meta: bool,
    ) -> std::result::Result<FunctionSchema, RetrieveError>;

    /// Signature of a user-declared memory table; `Ok(None)` when no
    /// table of that name exists.
    fn memory_schema(
        &self,
        name: &str,
        use_meta: bool,
    ) -> std::result::Result<Option<FunctionSchema>, RetrieveError>;

    /// Signature of a function referenced by a permission rule.
    fn allowed_schema_for(
        &self,
        kind: &str,
        channel: &str,
        function_kind: FunctionKind,
        use_meta: bool,
    ) -> std::result::Result<FunctionSchema, RetrieveError>;
}

/// The builtin action channels and their fixed schemas.
const BUILTIN_ACTIONS: &[&str] = &["notify", "return", "save"];

/// Schema of a builtin action channel, if it is one.
pub fn builtin_action_schema(channel: &str) -> Option<FunctionSchema> {
    if BUILTIN_ACTIONS.contains(&channel) {
        Some(FunctionSchema::empty())
    } else {
        None
    }
}

fn map_retrieve_error(err: RetrieveError, kind: &str, channel: &str) -> TypeError {
    match err {
        RetrieveError::NotFound => TypeError::UnknownFunction {
            kind: kind.to_string(),
            channel: channel.to_string(),
        },
        RetrieveError::Backend(message) => TypeError::SchemaUnavailable(message),
    }
}

/// Fetch the schema for a selector/channel pair, honoring class aliases
/// and builtin channels.
pub(crate) fn resolve_selector_schema(
    selector: &Selector,
    channel: &str,
    function_kind: FunctionKind,
    ctx: &Checker<'_>,
) -> Result<FunctionSchema> {
    match selector {
        Selector::Builtin => {
            if function_kind != FunctionKind::Action {
                return Err(TypeError::InvalidBuiltinAction(channel.to_string()));
            }
            builtin_action_schema(channel)
                .ok_or_else(|| TypeError::InvalidBuiltinAction(channel.to_string()))
        }
        Selector::Device { kind, .. } => {
            let effective = ctx.effective_kind(kind);
            debug!(kind = effective, channel, %function_kind, "resolving schema");
            ctx.retriever
                .schema_for_selector(effective, channel, function_kind, ctx.use_meta)
                .map_err(|err| map_retrieve_error(err, effective, channel))
        }
    }
}

/// Attach a schema to an invocation on first encounter.
///
/// A schema already present is left alone, so re-checking an annotated
/// tree neither refetches nor reorders anything.
pub(crate) fn ensure_invocation_schema(
    invocation: &mut Invocation,
    function_kind: FunctionKind,
    ctx: &Checker<'_>,
) -> Result<()> {
    if invocation.schema.is_none() {
        let schema =
            resolve_selector_schema(&invocation.selector, &invocation.channel, function_kind, ctx)?;
        invocation.schema = Some(schema);
    }
    Ok(())
}

/// Fetch a memory-table schema; a `None` answer from the oracle is the
/// signal for an undeclared table.
pub(crate) fn resolve_memory_schema(name: &str, ctx: &Checker<'_>) -> Result<FunctionSchema> {
    debug!(name, "resolving memory table schema");
    match ctx.retriever.memory_schema(name, ctx.use_meta) {
        Ok(Some(schema)) => Ok(schema),
        Ok(None) => Err(TypeError::UnknownMemoryTable(name.to_string())),
        Err(RetrieveError::Backend(message)) => Err(TypeError::SchemaUnavailable(message)),
        Err(RetrieveError::NotFound) => Err(TypeError::UnknownMemoryTable(name.to_string())),
    }
}
