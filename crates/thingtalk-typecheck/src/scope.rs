//! Lexical environment threaded through a program check.
//!
//! One `Scope` travels through each declaration or rule:
//! - **globals** bind declaration and alias names to first-class schemas
//! - **locals** bind parameters and published outputs to types
//! - **conflicts** mark names a join has made ambiguous; reading one
//!   raises [`TypeError::FieldConflict`]
//! - **pending requireds** collect required inputs no call site has
//!   supplied, to be lifted into the enclosing schema at the next
//!   declaration boundary
//! - **lambda args** track which call-site names a declaration parameter
//!   was bound through, for the end-of-declaration rename
//!
//! Creating a child scope clones every map; `merge` folds a child back
//! into its parent (left before right at joins, which is observable
//! through name-collision ordering).

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use thingtalk_ast::{FunctionSchema, Type};

use crate::error::{Result, TypeError};

/// Lexical environment: globals, locals, conflicts, pending required
/// inputs, and lambda-argument bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    global: HashMap<String, FunctionSchema>,
    locals: HashMap<String, Type>,
    conflicts: HashSet<String>,
    /// True iff an event/trigger is in scope (`$event` is permitted).
    pub has_event: bool,
    in_req: IndexMap<String, Type>,
    lambda_args: HashMap<String, Vec<String>>,
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child scope carrying the full current environment.
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// Check for a local binding.
    pub fn has(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    /// Check for a global binding.
    pub fn has_global(&self, name: &str) -> bool {
        self.global.contains_key(name)
    }

    /// Read a local binding.
    ///
    /// `Ok(None)` when the name is simply absent; an error when a join
    /// made the name ambiguous.
    pub fn get(&self, name: &str) -> Result<Option<&Type>> {
        if self.conflicts.contains(name) {
            return Err(TypeError::FieldConflict(name.to_string()));
        }
        Ok(self.locals.get(name))
    }

    /// Read a global binding.
    pub fn get_global(&self, name: &str) -> Option<&FunctionSchema> {
        self.global.get(name)
    }

    /// Bind a local.
    pub fn add(&mut self, name: impl Into<String>, ty: Type) {
        self.locals.insert(name.into(), ty);
    }

    /// Bind a global; rebinding an existing name is an error.
    pub fn add_global(&mut self, name: impl Into<String>, schema: FunctionSchema) -> Result<()> {
        let name = name.into();
        if self.global.contains_key(&name) {
            return Err(TypeError::FieldRedefinition(name));
        }
        self.global.insert(name, schema);
        Ok(())
    }

    /// Mark a name ambiguous.
    pub fn add_conflict(&mut self, name: impl Into<String>) {
        self.conflicts.insert(name.into());
    }

    /// Drop a local binding and any conflict marker on the name.
    pub fn remove(&mut self, name: &str) {
        self.locals.remove(name);
        self.conflicts.remove(name);
    }

    /// Publish a name→type map into the scope.
    ///
    /// Table-, stream-, and function-typed entries become globals (an
    /// empty schema for the former two, the carried schema for the
    /// latter); everything else becomes a local.
    pub fn assign(&mut self, map: &IndexMap<String, Type>) -> Result<()> {
        for (name, ty) in map {
            match ty {
                Type::Table | Type::Stream => {
                    self.add_global(name.clone(), FunctionSchema::empty())?;
                }
                Type::Function(schema) => {
                    self.add_global(name.clone(), (**schema).clone())?;
                }
                _ => self.add(name.clone(), ty.clone()),
            }
        }
        Ok(())
    }

    /// Reset the per-rule state: locals, event flag, conflicts, pending
    /// requireds, and lambda-argument records. `strip_globals` names
    /// globals to drop as well (a declaration's lambda parameters).
    pub fn clean(&mut self, strip_globals: Option<&[String]>) {
        self.locals.clear();
        self.conflicts.clear();
        self.in_req.clear();
        self.lambda_args.clear();
        self.has_event = false;
        if let Some(names) = strip_globals {
            for name in names {
                self.global.remove(name);
            }
        }
    }

    /// Rename every local `k` to `prefix.k` (alias qualification).
    pub fn prefix(&mut self, prefix: &str) {
        let locals = std::mem::take(&mut self.locals);
        self.locals = locals
            .into_iter()
            .map(|(name, ty)| (format!("{}.{}", prefix, name), ty))
            .collect();
    }

    /// Fold another scope into this one: globals stay globals, locals
    /// stay locals, conflicts and pending requireds union.
    pub fn merge(&mut self, other: &Scope) {
        for (name, schema) in &other.global {
            self.global.insert(name.clone(), schema.clone());
        }
        for (name, ty) in &other.locals {
            self.locals.insert(name.clone(), ty.clone());
        }
        for name in &other.conflicts {
            self.conflicts.insert(name.clone());
        }
        for (name, ty) in &other.in_req {
            self.in_req.insert(name.clone(), ty.clone());
        }
        for (name, aliases) in &other.lambda_args {
            self.lambda_args.insert(name.clone(), aliases.clone());
        }
    }

    /// Record a required input no call site has supplied yet.
    pub fn push_in_req(&mut self, name: impl Into<String>, ty: Type) {
        self.in_req.insert(name.into(), ty);
    }

    /// Forget a pending required (supplied by join parameter passing).
    pub fn remove_in_req(&mut self, name: &str) {
        self.in_req.shift_remove(name);
    }

    /// The pending required inputs, in recording order.
    pub fn pending_in_req(&self) -> &IndexMap<String, Type> {
        &self.in_req
    }

    /// Drain the pending required inputs for lifting into a schema.
    pub fn drain_in_req(&mut self) -> IndexMap<String, Type> {
        std::mem::take(&mut self.in_req)
    }

    /// Bind a declaration's lambda parameters and start tracking their
    /// call-site names.
    pub fn init_lambda_args(&mut self, args: &IndexMap<String, Type>) -> Result<()> {
        self.assign(args)?;
        for name in args.keys() {
            self.lambda_args.insert(name.clone(), Vec::new());
        }
        Ok(())
    }

    /// Check whether a name is one of the current lambda parameters.
    pub fn is_lambda_arg(&self, name: &str) -> bool {
        self.lambda_args.contains_key(name)
    }

    /// Record that the lambda parameter was bound through `actual` at a
    /// call site.
    pub fn update_lambda_args(&mut self, lambda: &str, actual: &str) {
        if let Some(aliases) = self.lambda_args.get_mut(lambda) {
            aliases.push(actual.to_string());
        }
    }

    /// The recorded call-site names, keyed by lambda parameter.
    pub fn lambda_args(&self) -> &HashMap<String, Vec<String>> {
        &self.lambda_args
    }
}
