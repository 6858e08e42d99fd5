//! Table constructors.

use serde::{Deserialize, Serialize};

use crate::ast::expr::{BooleanExpression, ScalarExpression};
use crate::ast::invocation::{InputParam, Invocation};
use crate::ast::stream::Stream;
use crate::ast::value::Value;
use crate::schema::FunctionSchema;
use crate::types::Type;

/// A table: an on-demand source of records.
///
/// The checker sets `schema` on every node to a fresh clone reflecting
/// the constructor's compositional effect (projection removes outputs,
/// aggregation collapses them, join concatenates signatures).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub kind: TableKind,
    pub schema: Option<FunctionSchema>,
}

impl Table {
    pub fn new(kind: TableKind) -> Self {
        Table { kind, schema: None }
    }

    /// The resolved schema; panics when called before checking.
    pub fn schema(&self) -> &FunctionSchema {
        self.schema.as_ref().expect("table has not been type-checked")
    }
}

/// The closed set of table constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableKind {
    /// A Thingpedia query invocation.
    Invocation(Invocation),
    /// Reference to a declared table or a user memory table.
    VarRef {
        name: String,
        in_params: Vec<InputParam>,
    },
    Filter {
        table: Box<Table>,
        filter: BooleanExpression,
    },
    Projection {
        table: Box<Table>,
        args: Vec<String>,
    },
    Alias {
        table: Box<Table>,
        name: String,
    },
    Aggregation {
        table: Box<Table>,
        /// Aggregated output field; `*` together with op `count` counts rows.
        field: String,
        op: String,
        alias: Option<String>,
        /// Resolved field/result type pair, recorded by the checker.
        overload: Option<Vec<Type>>,
    },
    ArgMinMax {
        table: Box<Table>,
        field: String,
        /// `argmin` or `argmax`.
        op: String,
        base: Value,
        limit: Value,
    },
    Join {
        lhs: Box<Table>,
        rhs: Box<Table>,
        /// Parameter passing from left outputs into right inputs.
        in_params: Vec<InputParam>,
    },
    /// Last `delta` events of a stream starting at event number `base`.
    Window {
        base: Value,
        delta: Value,
        stream: Box<Stream>,
    },
    /// Events of a stream inside a time interval ending at `base`.
    TimeSeries {
        base: Value,
        delta: Value,
        stream: Box<Stream>,
    },
    /// Last `delta` results of a query starting at sequence number `base`.
    Sequence {
        base: Value,
        delta: Value,
        table: Box<Table>,
    },
    /// Results of a query inside a time interval ending at `base`.
    History {
        base: Value,
        delta: Value,
        table: Box<Table>,
    },
    /// A computed output appended in place of the table's outputs.
    Compute {
        table: Box<Table>,
        expression: ScalarExpression,
        alias: Option<String>,
    },
}

impl Table {
    pub fn invocation(invocation: Invocation) -> Self {
        Table::new(TableKind::Invocation(invocation))
    }

    pub fn filtered(table: Table, filter: BooleanExpression) -> Self {
        Table::new(TableKind::Filter {
            table: Box::new(table),
            filter,
        })
    }

    pub fn projection(table: Table, args: Vec<String>) -> Self {
        Table::new(TableKind::Projection {
            table: Box::new(table),
            args,
        })
    }

    pub fn aliased(table: Table, name: impl Into<String>) -> Self {
        Table::new(TableKind::Alias {
            table: Box::new(table),
            name: name.into(),
        })
    }

    pub fn aggregation(
        table: Table,
        field: impl Into<String>,
        op: impl Into<String>,
        alias: Option<String>,
    ) -> Self {
        Table::new(TableKind::Aggregation {
            table: Box::new(table),
            field: field.into(),
            op: op.into(),
            alias,
            overload: None,
        })
    }

    pub fn join(lhs: Table, rhs: Table, in_params: Vec<InputParam>) -> Self {
        Table::new(TableKind::Join {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            in_params,
        })
    }
}
