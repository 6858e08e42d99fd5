//! Function schemas — the structured signatures of Thingpedia functions.
//!
//! A [`FunctionSchema`] records the ordered argument list of a query,
//! action, or trigger, split into required inputs, optional inputs, and
//! outputs. The semantic analyzer clones schemas onto the tree nodes it
//! checks and then edits the clones to encode compositional effects:
//! projection removes outputs, aggregation collapses them, join
//! concatenates two signatures and cancels inputs supplied by parameter
//! passing.
//!
//! # Invariants
//!
//! - inputs precede outputs in `args`
//! - `in_req`, `in_opt`, and `out` partition `args`
//! - `index` is the exact inverse of `args`
//!
//! Every mutation helper restores all three.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::types::Type;

/// The kind of a Thingpedia function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    /// On-demand data source.
    Query,
    /// Side-effecting operation.
    Action,
    /// Event source.
    Trigger,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Query => write!(f, "query"),
            FunctionKind::Action => write!(f, "action"),
            FunctionKind::Trigger => write!(f, "trigger"),
        }
    }
}

/// Structured signature of a Thingpedia function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Ordered argument names; inputs first, then outputs.
    args: Vec<String>,
    /// Argument types, parallel to `args`.
    types: Vec<Type>,
    /// Inverse of `args`.
    index: HashMap<String, usize>,
    /// Required inputs, in declaration order.
    in_req: IndexMap<String, Type>,
    /// Optional inputs, in declaration order.
    in_opt: IndexMap<String, Type>,
    /// Outputs, in declaration order.
    out: IndexMap<String, Type>,
    /// Human-readable argument names, parallel to `args` (describer
    /// metadata, not consulted by the checker).
    arg_canonicals: Vec<String>,
    /// Confirmation sentence template (describer metadata).
    confirmation: Option<String>,
}

impl FunctionSchema {
    /// Build a schema from its three argument groups.
    pub fn new(
        in_req: Vec<(&str, Type)>,
        in_opt: Vec<(&str, Type)>,
        out: Vec<(&str, Type)>,
    ) -> Self {
        let mut schema = FunctionSchema {
            args: Vec::new(),
            types: Vec::new(),
            index: HashMap::new(),
            in_req: IndexMap::new(),
            in_opt: IndexMap::new(),
            out: IndexMap::new(),
            arg_canonicals: Vec::new(),
            confirmation: None,
        };
        for (name, ty) in in_req {
            schema.push_arg(name, ty.clone());
            schema.in_req.insert(name.to_string(), ty);
        }
        for (name, ty) in in_opt {
            schema.push_arg(name, ty.clone());
            schema.in_opt.insert(name.to_string(), ty);
        }
        for (name, ty) in out {
            schema.push_arg(name, ty.clone());
            schema.out.insert(name.to_string(), ty);
        }
        schema
    }

    /// Schema with no inputs and no outputs (builtin actions, timers).
    pub fn empty() -> Self {
        Self::new(vec![], vec![], vec![])
    }

    /// Attach a confirmation sentence template.
    pub fn with_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.confirmation = Some(confirmation.into());
        self
    }

    fn push_arg(&mut self, name: &str, ty: Type) {
        self.index.insert(name.to_string(), self.args.len());
        self.args.push(name.to_string());
        self.types.push(ty);
        self.arg_canonicals.push(name.replace('_', " "));
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .args
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
    }

    /// Ordered argument names.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Argument types, parallel to [`Self::args`].
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// Position of an argument, if declared.
    pub fn arg_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Type of an argument, if declared.
    pub fn arg_type(&self, name: &str) -> Option<&Type> {
        self.arg_index(name).map(|i| &self.types[i])
    }

    /// Required inputs, in order.
    pub fn in_req(&self) -> &IndexMap<String, Type> {
        &self.in_req
    }

    /// Optional inputs, in order.
    pub fn in_opt(&self) -> &IndexMap<String, Type> {
        &self.in_opt
    }

    /// Outputs, in order.
    pub fn out(&self) -> &IndexMap<String, Type> {
        &self.out
    }

    /// Confirmation sentence template, if any.
    pub fn confirmation(&self) -> Option<&str> {
        self.confirmation.as_deref()
    }

    /// Number of input arguments (required + optional).
    pub fn input_len(&self) -> usize {
        self.in_req.len() + self.in_opt.len()
    }

    /// Look up an input parameter; `Some((ty, required))` when declared.
    pub fn input_type(&self, name: &str) -> Option<(&Type, bool)> {
        if let Some(ty) = self.in_req.get(name) {
            Some((ty, true))
        } else {
            self.in_opt.get(name).map(|ty| (ty, false))
        }
    }

    /// Insert an input at the input boundary, shifting outputs.
    ///
    /// No-op when an argument of that name is already declared.
    pub fn add_input(&mut self, name: &str, ty: Type, required: bool) {
        if self.index.contains_key(name) {
            return;
        }
        let boundary = self.input_len();
        self.args.insert(boundary, name.to_string());
        self.types.insert(boundary, ty.clone());
        self.arg_canonicals.insert(boundary, name.replace('_', " "));
        self.rebuild_index();
        if required {
            self.in_req.insert(name.to_string(), ty);
        } else {
            self.in_opt.insert(name.to_string(), ty);
        }
    }

    /// Remove an input argument (join parameter-passing cancellation).
    pub fn remove_input(&mut self, name: &str) {
        let Some(i) = self.arg_index(name) else {
            return;
        };
        if self.in_req.shift_remove(name).is_none() && self.in_opt.shift_remove(name).is_none() {
            return;
        }
        self.args.remove(i);
        self.types.remove(i);
        self.arg_canonicals.remove(i);
        self.rebuild_index();
    }

    /// Append an output argument.
    pub fn add_output(&mut self, name: &str, ty: Type) {
        if self.index.contains_key(name) {
            return;
        }
        self.push_arg(name, ty.clone());
        self.out.insert(name.to_string(), ty);
    }

    /// Drop every output, truncating the argument list to the input
    /// prefix. Returns the removed names so the caller can purge them
    /// from scope.
    pub fn clean_output(&mut self) -> Vec<String> {
        let boundary = self.input_len();
        let removed: Vec<String> = self.args.split_off(boundary);
        self.types.truncate(boundary);
        self.arg_canonicals.truncate(boundary);
        self.out.clear();
        self.rebuild_index();
        removed
    }

    /// Restrict the outputs to `projection`, in projection order.
    ///
    /// Inputs are untouched. Every projected name must be a declared
    /// output; the first unknown name is returned as the error. On
    /// success returns the output names that were dropped.
    pub fn resolve_projection(&mut self, projection: &[String]) -> Result<Vec<String>, String> {
        for name in projection {
            if !self.out.contains_key(name) {
                return Err(name.clone());
            }
        }
        let dropped: Vec<String> = self
            .out
            .keys()
            .filter(|name| !projection.contains(name))
            .cloned()
            .collect();

        let boundary = self.input_len();
        self.args.truncate(boundary);
        self.types.truncate(boundary);
        self.arg_canonicals.truncate(boundary);

        let old_out = std::mem::take(&mut self.out);
        for name in projection {
            let ty = old_out[name].clone();
            self.push_arg(name, ty.clone());
            self.out.insert(name.clone(), ty);
        }
        self.rebuild_index();
        Ok(dropped)
    }

    /// Rename an argument in place, preserving its position and group.
    pub fn rename_argument(&mut self, old: &str, new: &str) {
        let Some(i) = self.arg_index(old) else {
            return;
        };
        if self.index.contains_key(new) {
            return;
        }
        self.args[i] = new.to_string();
        self.rebuild_index();
        for group in [&mut self.in_req, &mut self.in_opt, &mut self.out] {
            if group.contains_key(old) {
                *group = group
                    .iter()
                    .map(|(name, ty)| {
                        let name = if name == old { new } else { name };
                        (name.to_string(), ty.clone())
                    })
                    .collect();
            }
        }
    }

    /// Combine two signatures at a join boundary.
    ///
    /// Inputs are the left inputs plus the right inputs, minus any right
    /// input whose name already appears among the left's arguments —
    /// those are parameter-passing targets, fed by the like-named left
    /// column. Outputs concatenate; a right output colliding with a left
    /// output name keeps the left column, and the collision is reported
    /// back for conflict marking.
    pub fn resolve_join(lhs: &FunctionSchema, rhs: &FunctionSchema) -> (FunctionSchema, Vec<String>) {
        let mut joined = FunctionSchema::empty();
        let mut collisions = Vec::new();

        for (name, ty) in &lhs.in_req {
            joined.push_arg(name, ty.clone());
            joined.in_req.insert(name.clone(), ty.clone());
        }
        for (name, ty) in &lhs.in_opt {
            joined.push_arg(name, ty.clone());
            joined.in_opt.insert(name.clone(), ty.clone());
        }
        for (name, ty) in &rhs.in_req {
            if lhs.index.contains_key(name) {
                continue;
            }
            joined.push_arg(name, ty.clone());
            joined.in_req.insert(name.clone(), ty.clone());
        }
        for (name, ty) in &rhs.in_opt {
            if lhs.index.contains_key(name) || joined.index.contains_key(name) {
                continue;
            }
            joined.push_arg(name, ty.clone());
            joined.in_opt.insert(name.clone(), ty.clone());
        }
        for (name, ty) in &lhs.out {
            joined.push_arg(name, ty.clone());
            joined.out.insert(name.clone(), ty.clone());
        }
        for (name, ty) in &rhs.out {
            if joined.out.contains_key(name) {
                collisions.push(name.clone());
                continue;
            }
            if joined.index.contains_key(name) {
                // Output shadowing a joined input keeps the input column.
                collisions.push(name.clone());
                continue;
            }
            joined.push_arg(name, ty.clone());
            joined.out.insert(name.clone(), ty.clone());
        }

        (joined, collisions)
    }

    /// Check the structural invariants; used by tests and debug asserts.
    pub fn invariants_hold(&self) -> bool {
        if self.args.len() != self.types.len() || self.args.len() != self.index.len() {
            return false;
        }
        if self.in_req.len() + self.in_opt.len() + self.out.len() != self.args.len() {
            return false;
        }
        for (i, name) in self.args.iter().enumerate() {
            if self.index.get(name) != Some(&i) {
                return false;
            }
            let is_input = self.in_req.contains_key(name) || self.in_opt.contains_key(name);
            if is_input != (i < self.input_len()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather() -> FunctionSchema {
        FunctionSchema::new(
            vec![("location", Type::Location)],
            vec![],
            vec![
                ("temperature", Type::measure("C")),
                ("humidity", Type::Number),
                ("status", Type::String),
            ],
        )
    }

    #[test]
    fn test_new_partitions_args() {
        let schema = weather();
        assert_eq!(schema.args(), ["location", "temperature", "humidity", "status"]);
        assert!(schema.invariants_hold());
        assert_eq!(schema.input_len(), 1);
        assert_eq!(schema.arg_type("humidity"), Some(&Type::Number));
        assert_eq!(
            schema.input_type("location"),
            Some((&Type::Location, true))
        );
        assert_eq!(schema.input_type("temperature"), None);
    }

    #[test]
    fn test_add_input_shifts_outputs() {
        let mut schema = weather();
        schema.add_input("units", Type::String, false);
        assert_eq!(schema.args()[1], "units");
        assert_eq!(schema.arg_index("temperature"), Some(2));
        assert!(schema.invariants_hold());
        // Duplicate insert is a no-op.
        schema.add_input("units", Type::Number, true);
        assert_eq!(schema.input_type("units"), Some((&Type::String, false)));
        assert!(schema.invariants_hold());
    }

    #[test]
    fn test_remove_input() {
        let mut schema = weather();
        schema.remove_input("location");
        assert_eq!(schema.input_len(), 0);
        assert_eq!(schema.arg_index("temperature"), Some(0));
        assert!(schema.invariants_hold());
    }

    #[test]
    fn test_clean_output() {
        let mut schema = weather();
        let removed = schema.clean_output();
        assert_eq!(removed, ["temperature", "humidity", "status"]);
        assert_eq!(schema.args(), ["location"]);
        assert!(schema.out().is_empty());
        assert!(schema.invariants_hold());
    }

    #[test]
    fn test_projection_reorders_and_drops() {
        let mut schema = weather();
        let dropped = schema
            .resolve_projection(&["status".to_string(), "temperature".to_string()])
            .unwrap();
        assert_eq!(dropped, ["humidity"]);
        assert_eq!(schema.args(), ["location", "status", "temperature"]);
        assert_eq!(
            schema.out().keys().collect::<Vec<_>>(),
            ["status", "temperature"]
        );
        assert!(schema.invariants_hold());
    }

    #[test]
    fn test_projection_unknown_name() {
        let mut schema = weather();
        let err = schema.resolve_projection(&["pressure".to_string()]).unwrap_err();
        assert_eq!(err, "pressure");
        // Failed projections leave the schema untouched.
        assert_eq!(schema.out().len(), 3);
        assert!(schema.invariants_hold());
    }

    #[test]
    fn test_rename_argument() {
        let mut schema = weather();
        schema.rename_argument("location", "place");
        assert_eq!(schema.args()[0], "place");
        assert_eq!(schema.input_type("place"), Some((&Type::Location, true)));
        assert_eq!(schema.input_type("location"), None);
        assert!(schema.invariants_hold());
    }

    #[test]
    fn test_join_concatenates_and_cancels() {
        let lhs = weather();
        let rhs = FunctionSchema::new(
            vec![("temperature", Type::measure("C")), ("power", Type::String)],
            vec![],
            vec![("ok", Type::Boolean)],
        );
        let (joined, collisions) = FunctionSchema::resolve_join(&lhs, &rhs);
        assert!(collisions.is_empty());
        assert!(joined.invariants_hold());
        // The rhs `temperature` input is a parameter-passing target of
        // the like-named lhs output; only `location` and `power` remain.
        assert_eq!(joined.input_len(), 2);
        assert!(joined.input_type("temperature").is_none());
        assert_eq!(joined.input_type("power"), Some((&Type::String, true)));
        assert_eq!(
            joined.out().keys().collect::<Vec<_>>(),
            ["temperature", "humidity", "status", "ok"]
        );
    }

    #[test]
    fn test_join_drops_rhs_input_shadowed_by_lhs_input() {
        let lhs = FunctionSchema::new(
            vec![("query", Type::String)],
            vec![],
            vec![("link", Type::entity("tt:url"))],
        );
        let rhs = FunctionSchema::new(
            vec![("query", Type::String)],
            vec![],
            vec![("title", Type::String)],
        );
        let (joined, _) = FunctionSchema::resolve_join(&lhs, &rhs);
        assert_eq!(joined.input_len(), 1);
        assert!(joined.invariants_hold());
    }

    #[test]
    fn test_join_reports_output_collisions() {
        let lhs = FunctionSchema::new(vec![], vec![], vec![("text", Type::String)]);
        let rhs = FunctionSchema::new(vec![], vec![], vec![("text", Type::String)]);
        let (joined, collisions) = FunctionSchema::resolve_join(&lhs, &rhs);
        assert_eq!(collisions, ["text"]);
        assert_eq!(joined.out().len(), 1);
        assert!(joined.invariants_hold());
    }
}
