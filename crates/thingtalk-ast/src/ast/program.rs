//! Program, declaration, rule, and permission-rule roots.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::expr::BooleanExpression;
use crate::ast::invocation::{ClassDef, Invocation};
use crate::ast::stream::Stream;
use crate::ast::table::Table;
use crate::ast::value::Value;
use crate::schema::FunctionSchema;
use crate::types::Type;

/// A complete ThingTalk program: class aliases, lambda declarations, and
/// rules, optionally executed on behalf of a remote principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<ClassDef>,
    pub declarations: Vec<Declaration>,
    pub rules: Vec<Rule>,
    pub principal: Option<Value>,
}

impl Program {
    pub fn new(declarations: Vec<Declaration>, rules: Vec<Rule>) -> Self {
        Program {
            classes: Vec::new(),
            declarations,
            rules,
            principal: None,
        }
    }
}

/// The body of a `let` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclarationValue {
    Stream(Stream),
    Table(Table),
    Action(Invocation),
}

/// A lambda declaration binding a stream, table, or action as a
/// first-class function.
///
/// `args` lists the lambda's parameters with their declared types; the
/// checker may rename an entry to the call-site name it was bound
/// through inside the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub args: IndexMap<String, Type>,
    pub value: DeclarationValue,
    /// Resolved signature, attached by the checker.
    pub schema: Option<FunctionSchema>,
}

impl Declaration {
    pub fn new(
        name: impl Into<String>,
        args: IndexMap<String, Type>,
        value: DeclarationValue,
    ) -> Self {
        Declaration {
            name: name.into(),
            args,
            value,
            schema: None,
        }
    }
}

/// A rule: an optional stream or table driving one or more actions.
///
/// `now => @com.twitter.post(...)` is a table-less, stream-less rule;
/// `monitor @weather.current() => notify` carries a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub stream: Option<Stream>,
    pub table: Option<Table>,
    pub actions: Vec<Invocation>,
}

impl Rule {
    /// A `now =>` rule over a table.
    pub fn immediate(table: Table, actions: Vec<Invocation>) -> Self {
        Rule {
            stream: None,
            table: Some(table),
            actions,
        }
    }

    /// A standing rule over a stream.
    pub fn standing(stream: Stream, actions: Vec<Invocation>) -> Self {
        Rule {
            stream: Some(stream),
            table: None,
            actions,
        }
    }

    /// An action-only rule.
    pub fn action_only(actions: Vec<Invocation>) -> Self {
        Rule {
            stream: None,
            table: None,
            actions,
        }
    }
}

/// One side of a permission rule: which function the rule covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PermissionFunction {
    /// The built-in side (e.g. `notify`); always permitted, no schema.
    Builtin,
    /// A specific Thingpedia function, gated by a filter over its
    /// arguments.
    Specified {
        kind: String,
        channel: String,
        filter: BooleanExpression,
        schema: Option<FunctionSchema>,
    },
}

/// A permission rule gating execution of a query/action pair on behalf
/// of a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Filter over `source`, the contact requesting execution.
    pub principal: BooleanExpression,
    pub query: PermissionFunction,
    pub action: PermissionFunction,
}
