//! # ThingTalk AST
//!
//! Abstract syntax tree, type lattice, and function schemas for the
//! ThingTalk virtual-assistant language.
//!
//! ThingTalk programs are rules composing *streams* (event sources),
//! *tables* (queried data), and *actions* (side effects) drawn from
//! third-party Thingpedia functions, with filters, joins, projections,
//! aggregations, and parameter passing between primitives.
//!
//! This crate carries no checking logic: it defines the tree the parser
//! produces and the type/schema vocabulary the semantic analyzer (in
//! `thingtalk-typecheck`) works over. The analyzer mutates the tree in
//! place — attaching resolved schemas to primitives, recording resolved
//! operator overloads on filter atoms, and appending undefined slots for
//! unsupplied required inputs — so downstream pipelines (describer,
//! formatter, slot-filling dialogs) consume a fully annotated tree.

pub mod ast;
pub mod schema;
pub mod types;

pub use ast::expr::{BooleanExpression, ExternalPredicate, FilterAtom, ScalarExpression};
pub use ast::invocation::{ClassDef, InputParam, Invocation, Selector};
pub use ast::program::{
    Declaration, DeclarationValue, PermissionFunction, PermissionRule, Program, Rule,
};
pub use ast::stream::{Stream, StreamKind};
pub use ast::table::{Table, TableKind};
pub use ast::value::{Location, Value};
pub use schema::{FunctionKind, FunctionSchema};
pub use types::{Type, TypeVarScope};
