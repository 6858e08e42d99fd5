//! Shared context for one checking run.

use std::collections::HashMap;

use crate::resolver::SchemaRetriever;

/// Everything a checking pass needs besides the scope: the schema
/// oracle, the program's class aliases, and the flags that change
/// checking behavior.
pub(crate) struct Checker<'a> {
    pub retriever: &'a dyn SchemaRetriever,
    /// Class name → extended Thingpedia kind.
    pub classes: HashMap<String, String>,
    /// Request natural-language metadata along with schemas.
    pub use_meta: bool,
    /// Checking a declaration body: pending required inputs are lifted
    /// into primitive schemas so they become the lambda's parameters.
    pub in_declaration: bool,
}

impl<'a> Checker<'a> {
    pub fn new(
        retriever: &'a dyn SchemaRetriever,
        classes: HashMap<String, String>,
        use_meta: bool,
    ) -> Self {
        Checker {
            retriever,
            classes,
            use_meta,
            in_declaration: false,
        }
    }

    /// Fork the context for checking a declaration body.
    pub fn for_declaration(&self) -> Checker<'a> {
        Checker {
            retriever: self.retriever,
            classes: self.classes.clone(),
            use_meta: self.use_meta,
            in_declaration: true,
        }
    }

    /// Substitute a class alias with the kind it extends.
    pub fn effective_kind<'k>(&'k self, kind: &'k str) -> &'k str {
        self.classes.get(kind).map(String::as_str).unwrap_or(kind)
    }
}
