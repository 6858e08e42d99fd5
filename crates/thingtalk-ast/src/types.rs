//! Type lattice for the ThingTalk language.
//!
//! The type system distinguishes:
//! - **Primitive kinds** — `Boolean`, `Number`, `String`, `Date`, `Time`,
//!   `Location`, `Currency`
//! - **`Measure<unit>`** — dimensioned quantities; an empty unit means
//!   "any compatible unit" and unifies through the `_unit` slot of a
//!   [`TypeVarScope`]
//! - **`Entity(kind)`** — branded strings with an ontology key
//!   (`tt:username`, `tt:contact`, ...)
//! - **`Array<T>` / `Tuple`** — parametric containers
//! - **`Function`** — a first-class schema, used when declarations are
//!   bound as globals
//! - **Type variables** — appearing only inside operator overload tables,
//!   resolved during assignability
//!
//! # Assignability
//!
//! [`Type::is_assignable`] implements a structural partial order: equal
//! primitive kinds match, `Any` is top, measures unify units, entities
//! match only on equal kind, containers recurse componentwise. Bindings
//! accumulate in a [`TypeVarScope`] and must stay consistent across a
//! single overload attempt. The `coerce` flag additionally widens any
//! type to `String`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::schema::FunctionSchema;

/// A type in the ThingTalk type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// Truth values.
    Boolean,
    /// Floating-point numbers (dimensionless).
    Number,
    /// Unicode strings.
    String,
    /// Calendar timestamps.
    Date,
    /// Times of day, independent of date.
    Time,
    /// Geographic coordinates.
    Location,
    /// Monetary amounts with a currency code.
    Currency,
    /// Top of the lattice; assignable to and from everything.
    Any,
    /// Dimensioned quantity. The unit is a fixed unit name (`C`, `ms`,
    /// `byte`, ...); the empty string stands for "any unit" and is
    /// resolved through unification.
    Measure(String),
    /// Branded string with an ontology key, e.g. `tt:username`.
    Entity(String),
    /// Finite set of named values. `None` marks an enum literal whose
    /// choice set is not yet known (it unifies with any enum type).
    Enum(Option<Vec<String>>),
    /// Homogeneous list.
    Array(Box<Type>),
    /// Fixed-arity heterogeneous product.
    Tuple(Vec<Type>),
    /// First-class function signature (declarations bound as globals).
    Function(Box<FunctionSchema>),
    /// A table-valued lambda parameter.
    Table,
    /// A stream-valued lambda parameter.
    Stream,
    /// Type variable; occurs only in operator overload tables.
    Var(String),
}

impl Type {
    /// Create an array type wrapping an element type.
    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    /// Create a measure type with a fixed unit.
    pub fn measure(unit: impl Into<String>) -> Self {
        Type::Measure(unit.into())
    }

    /// Create a measure type matching any unit.
    pub fn any_measure() -> Self {
        Type::Measure(String::new())
    }

    /// Create an entity type with the given ontology key.
    pub fn entity(kind: impl Into<String>) -> Self {
        Type::Entity(kind.into())
    }

    /// Create a type variable.
    pub fn var(name: impl Into<String>) -> Self {
        Type::Var(name.into())
    }

    /// Check if this is the `Any` top type.
    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// Check if this is an entity type.
    pub fn is_entity(&self) -> bool {
        matches!(self, Type::Entity(_))
    }

    /// Check if this is a measure type.
    pub fn is_measure(&self) -> bool {
        matches!(self, Type::Measure(_))
    }

    /// Check if this type routes to the global scope when assigned
    /// (tables, streams, and first-class functions do; plain values
    /// become locals).
    pub fn is_global_binding(&self) -> bool {
        matches!(self, Type::Table | Type::Stream | Type::Function(_))
    }

    /// Check whether `self` is assignable to `dst`.
    ///
    /// Records type-variable and unit bindings in `scope`; bindings made
    /// by earlier operands of the same overload attempt constrain later
    /// ones. With `coerce`, any type additionally widens to `String`.
    ///
    /// Returns `false` on mismatch; never fails.
    pub fn is_assignable(&self, dst: &Type, scope: &mut TypeVarScope, coerce: bool) -> bool {
        match (self, dst) {
            (Type::Any, _) | (_, Type::Any) => true,

            // A bound variable resolves to its binding; an unbound one
            // binds to the source type.
            (_, Type::Var(name)) => match scope.vars.get(name) {
                Some(bound) => {
                    let bound = bound.clone();
                    self.is_assignable(&bound, scope, coerce)
                }
                None => {
                    scope.vars.insert(name.clone(), self.clone());
                    true
                }
            },

            (_, Type::String) if coerce => true,

            (Type::Measure(src_unit), Type::Measure(dst_unit)) => {
                if dst_unit.is_empty() {
                    match &scope.unit {
                        Some(bound) => bound == src_unit,
                        None => {
                            scope.unit = Some(src_unit.clone());
                            true
                        }
                    }
                } else {
                    src_unit == dst_unit
                }
            }

            // Entities never cross kinds.
            (Type::Entity(src_kind), Type::Entity(dst_kind)) => src_kind == dst_kind,

            (Type::Enum(None), Type::Enum(_)) | (Type::Enum(_), Type::Enum(None)) => true,
            (Type::Enum(Some(a)), Type::Enum(Some(b))) => a == b,

            (Type::Array(src_elem), Type::Array(dst_elem)) => {
                src_elem.is_assignable(dst_elem, scope, coerce)
            }
            (Type::Tuple(src_elems), Type::Tuple(dst_elems)) => {
                src_elems.len() == dst_elems.len()
                    && src_elems
                        .iter()
                        .zip(dst_elems)
                        .all(|(s, d)| s.is_assignable(d, scope, coerce))
            }

            (Type::Function(src_schema), Type::Function(dst_schema)) => src_schema == dst_schema,

            (Type::Boolean, Type::Boolean)
            | (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Date, Type::Date)
            | (Type::Time, Type::Time)
            | (Type::Location, Type::Location)
            | (Type::Currency, Type::Currency)
            | (Type::Table, Type::Table)
            | (Type::Stream, Type::Stream) => true,

            _ => false,
        }
    }

    /// Substitute bound type variables and the measure unit binding.
    pub fn resolve_vars(&self, scope: &TypeVarScope) -> Type {
        match self {
            Type::Var(name) => match scope.vars.get(name) {
                Some(bound) => bound.resolve_vars(scope),
                None => self.clone(),
            },
            Type::Measure(unit) if unit.is_empty() => match &scope.unit {
                Some(bound) => Type::Measure(bound.clone()),
                None => self.clone(),
            },
            Type::Array(elem) => Type::Array(Box::new(elem.resolve_vars(scope))),
            Type::Tuple(elems) => {
                Type::Tuple(elems.iter().map(|t| t.resolve_vars(scope)).collect())
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "Boolean"),
            Type::Number => write!(f, "Number"),
            Type::String => write!(f, "String"),
            Type::Date => write!(f, "Date"),
            Type::Time => write!(f, "Time"),
            Type::Location => write!(f, "Location"),
            Type::Currency => write!(f, "Currency"),
            Type::Any => write!(f, "Any"),
            Type::Measure(unit) if unit.is_empty() => write!(f, "Measure"),
            Type::Measure(unit) => write!(f, "Measure({})", unit),
            Type::Entity(kind) => write!(f, "Entity({})", kind),
            Type::Enum(None) => write!(f, "Enum"),
            Type::Enum(Some(choices)) => write!(f, "Enum({})", choices.join(",")),
            Type::Array(elem) => write!(f, "Array({})", elem),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, ")")
            }
            Type::Function(_) => write!(f, "Function"),
            Type::Table => write!(f, "Table"),
            Type::Stream => write!(f, "Stream"),
            Type::Var(name) => write!(f, "'{}", name),
        }
    }
}

/// Binding environment for one overload attempt.
///
/// Opened fresh per candidate signature; variable and unit bindings made
/// while matching one operand constrain the remaining operands.
#[derive(Debug, Clone, Default)]
pub struct TypeVarScope {
    /// Type-variable bindings (`'a` → concrete type).
    pub vars: HashMap<String, Type>,
    /// Binding for the anonymous measure unit variable.
    pub unit: Option<String>,
}

impl TypeVarScope {
    /// Create an empty binding scope.
    pub fn new() -> Self {
        Self::default()
    }
}
