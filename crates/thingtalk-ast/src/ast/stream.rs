//! Stream constructors.

use serde::{Deserialize, Serialize};

use crate::ast::expr::BooleanExpression;
use crate::ast::invocation::InputParam;
use crate::ast::table::Table;
use crate::ast::value::Value;
use crate::schema::FunctionSchema;

/// A stream: a time-varying source of records yielding events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub kind: StreamKind,
    pub schema: Option<FunctionSchema>,
}

impl Stream {
    pub fn new(kind: StreamKind) -> Self {
        Stream { kind, schema: None }
    }

    /// The resolved schema; panics when called before checking.
    pub fn schema(&self) -> &FunctionSchema {
        self.schema.as_ref().expect("stream has not been type-checked")
    }
}

/// The closed set of stream constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Reference to a declared stream.
    VarRef {
        name: String,
        in_params: Vec<InputParam>,
    },
    /// Fires every `interval` starting at `base`.
    Timer {
        base: Value,
        interval: Value,
    },
    /// Fires at a fixed time of day.
    AtTimer {
        time: Value,
    },
    /// Polls a query, firing when its result changes (optionally only on
    /// the named output fields).
    Monitor {
        table: Box<Table>,
        args: Option<Vec<String>>,
    },
    /// Fires when the inner stream yields a record not seen before.
    EdgeNew {
        stream: Box<Stream>,
    },
    /// Fires on the rising edge of the filter.
    EdgeFilter {
        stream: Box<Stream>,
        filter: BooleanExpression,
    },
    Filter {
        stream: Box<Stream>,
        filter: BooleanExpression,
    },
    Projection {
        stream: Box<Stream>,
        args: Vec<String>,
    },
    Alias {
        stream: Box<Stream>,
        name: String,
    },
    /// Joins each event with a query result; the right side must be a
    /// table.
    Join {
        stream: Box<Stream>,
        table: Box<Table>,
        in_params: Vec<InputParam>,
    },
}

impl Stream {
    pub fn monitor(table: Table, args: Option<Vec<String>>) -> Self {
        Stream::new(StreamKind::Monitor {
            table: Box::new(table),
            args,
        })
    }

    pub fn filtered(stream: Stream, filter: BooleanExpression) -> Self {
        Stream::new(StreamKind::Filter {
            stream: Box::new(stream),
            filter,
        })
    }

    pub fn edge_filter(stream: Stream, filter: BooleanExpression) -> Self {
        Stream::new(StreamKind::EdgeFilter {
            stream: Box::new(stream),
            filter,
        })
    }

    pub fn join(stream: Stream, table: Table, in_params: Vec<InputParam>) -> Self {
        Stream::new(StreamKind::Join {
            stream: Box::new(stream),
            table: Box::new(table),
            in_params,
        })
    }
}
