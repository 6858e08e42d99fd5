//! Shared test fixtures: an in-memory Thingpedia with a handful of
//! device schemas.
#![allow(dead_code)]

use std::collections::HashMap;

use thingtalk_ast::{FunctionKind, FunctionSchema, Invocation, Selector, Type};
use thingtalk_typecheck::{RetrieveError, SchemaRetriever};

/// In-memory schema source keyed by `(kind, channel, function kind)`.
pub struct MockSchemas {
    functions: HashMap<(String, String, FunctionKind), FunctionSchema>,
    memory: HashMap<String, FunctionSchema>,
}

impl MockSchemas {
    pub fn thingpedia() -> Self {
        let mut functions = HashMap::new();
        let mut insert = |kind: &str, channel: &str, fk: FunctionKind, schema: FunctionSchema| {
            functions.insert((kind.to_string(), channel.to_string(), fk), schema);
        };

        insert(
            "com.twitter",
            "post",
            FunctionKind::Action,
            FunctionSchema::new(vec![("status", Type::String)], vec![], vec![])
                .with_confirmation("post $status on Twitter"),
        );
        insert(
            "com.twitter",
            "search",
            FunctionKind::Query,
            FunctionSchema::new(
                vec![],
                vec![("query", Type::String)],
                vec![
                    ("text", Type::String),
                    ("author", Type::entity("tt:username")),
                    ("hashtags", Type::array(Type::entity("tt:hashtag"))),
                ],
            ),
        );
        insert(
            "org.thingpedia.weather",
            "current",
            FunctionKind::Query,
            FunctionSchema::new(
                vec![("location", Type::Location)],
                vec![],
                vec![
                    ("temperature", Type::measure("C")),
                    ("humidity", Type::Number),
                    ("status", Type::String),
                ],
            ),
        );
        insert(
            "com.bing",
            "web_search",
            FunctionKind::Query,
            FunctionSchema::new(
                vec![("query", Type::String)],
                vec![],
                vec![
                    ("title", Type::String),
                    ("description", Type::String),
                    ("link", Type::entity("tt:url")),
                ],
            ),
        );
        insert(
            "com.sensor",
            "read",
            FunctionKind::Query,
            FunctionSchema::new(vec![], vec![], vec![("temperature", Type::measure("C"))]),
        );
        insert(
            "com.ac",
            "status",
            FunctionKind::Query,
            FunctionSchema::new(
                vec![("temperature", Type::measure("C"))],
                vec![],
                vec![(
                    "power",
                    Type::Enum(Some(vec!["on".to_string(), "off".to_string()])),
                )],
            ),
        );
        insert(
            "com.ac",
            "set_power",
            FunctionKind::Action,
            FunctionSchema::new(
                vec![(
                    "power",
                    Type::Enum(Some(vec!["on".to_string(), "off".to_string()])),
                )],
                vec![],
                vec![],
            ),
        );
        insert(
            "com.messaging",
            "send",
            FunctionKind::Action,
            FunctionSchema::new(
                vec![
                    ("to", Type::entity("tt:phone_number")),
                    ("message", Type::String),
                ],
                vec![],
                vec![],
            ),
        );
        insert(
            "com.calendar",
            "next_event",
            FunctionKind::Query,
            FunctionSchema::new(
                vec![],
                vec![],
                vec![
                    ("title", Type::String),
                    ("start", Type::Date),
                    ("end", Type::Date),
                ],
            ),
        );

        let mut memory = HashMap::new();
        memory.insert(
            "my_books".to_string(),
            FunctionSchema::new(
                vec![],
                vec![],
                vec![("title", Type::String), ("year", Type::Number)],
            ),
        );

        MockSchemas { functions, memory }
    }
}

impl SchemaRetriever for MockSchemas {
    fn schema_for_selector(
        &self,
        kind: &str,
        channel: &str,
        function_kind: FunctionKind,
        _use_meta: bool,
    ) -> Result<FunctionSchema, RetrieveError> {
        self.functions
            .get(&(kind.to_string(), channel.to_string(), function_kind))
            .cloned()
            .ok_or(RetrieveError::NotFound)
    }

    fn memory_schema(
        &self,
        name: &str,
        _use_meta: bool,
    ) -> Result<Option<FunctionSchema>, RetrieveError> {
        Ok(self.memory.get(name).cloned())
    }

    fn allowed_schema_for(
        &self,
        kind: &str,
        channel: &str,
        function_kind: FunctionKind,
        use_meta: bool,
    ) -> Result<FunctionSchema, RetrieveError> {
        self.schema_for_selector(kind, channel, function_kind, use_meta)
    }
}

/// A device invocation with the given parameters.
pub fn device(kind: &str, channel: &str, in_params: Vec<thingtalk_ast::InputParam>) -> Invocation {
    Invocation::new(Selector::device(kind), channel, in_params)
}

/// The builtin `notify` action.
pub fn notify() -> Invocation {
    Invocation::new(Selector::Builtin, "notify", vec![])
}
