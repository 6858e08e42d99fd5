//! Input-parameter binding — the primitive checker.
//!
//! Validates the `in_params` of an invocation (or external predicate, or
//! join) against the primitive's schema: every name must be a declared
//! input, supplied at most once, with a value whose type assigns into
//! the declared type (string coercion allowed). Required inputs left
//! unsupplied are pushed into the scope's pending set so they can be
//! lifted into the enclosing schema at the next declaration boundary.

use std::collections::HashSet;

use thingtalk_ast::{FunctionSchema, InputParam, Type, TypeVarScope, Value};

use crate::context::Checker;
use crate::error::{Result, TypeError};
use crate::expr::type_for_value;
use crate::scope::Scope;

/// Entity kinds whose parameters accept a username through the
/// contact-name coercion.
const CONTACT_LIKE_KINDS: &[&str] = &["tt:phone_number", "tt:email_address"];

/// Retag `tt:username` entity values flowing into phone/email slots as
/// `tt:contact_name`, accepting the binding (the runtime resolves the
/// contact). Returns whether the coercion applied.
fn coerce_contact_entity(value: &mut Value, expected: &Type) -> bool {
    let Type::Entity(expected_kind) = expected else {
        return false;
    };
    if !CONTACT_LIKE_KINDS.contains(&expected_kind.as_str()) {
        return false;
    }
    match value {
        Value::Entity { kind, .. } if kind.as_str() == "tt:username" => {
            *kind = "tt:contact_name".to_string();
            true
        }
        _ => false,
    }
}

/// Validate a parameter list against a schema: names, duplicates, value
/// types, contextual coercions, and lambda-argument rename recording.
///
/// Does not touch the pending-required bookkeeping; invocations go
/// through [`type_check_input_args`] instead, which layers it on top.
pub(crate) fn check_in_params(
    in_params: &mut [InputParam],
    schema: &FunctionSchema,
    scope: &mut Scope,
) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for param in in_params.iter_mut() {
        if !seen.insert(param.name.clone()) {
            return Err(TypeError::DuplicateInputParam(param.name.clone()));
        }
        let Some((expected, _required)) = schema.input_type(&param.name) else {
            return Err(TypeError::InvalidInputParameter(param.name.clone()));
        };
        let expected = expected.clone();

        if !coerce_contact_entity(&mut param.value, &expected) {
            let actual = type_for_value(&param.value, scope)?;
            let mut vars = TypeVarScope::new();
            if !actual.is_assignable(&expected, &mut vars, true) {
                return Err(TypeError::InvalidType {
                    name: param.name.clone(),
                    expected,
                    actual,
                });
            }
        }

        if let Some(var) = param.value.var_ref_name() {
            if scope.is_lambda_arg(var) {
                let var = var.to_string();
                scope.update_lambda_args(&var, &param.name);
            }
        }
    }
    Ok(())
}

/// Full primitive check for an invocation site.
///
/// Inside a declaration body, pending required inputs recorded by
/// earlier primitives are first lifted into this primitive's schema as
/// new required inputs. After validation, required inputs this site does
/// not supply are pushed into the scope's pending set.
pub(crate) fn type_check_input_args(
    in_params: &mut [InputParam],
    schema: &mut FunctionSchema,
    scope: &mut Scope,
    ctx: &Checker<'_>,
) -> Result<()> {
    if ctx.in_declaration {
        for (name, ty) in scope.drain_in_req() {
            schema.add_input(&name, ty, true);
        }
    }

    check_in_params(in_params, schema, scope)?;

    let supplied: HashSet<&str> = in_params.iter().map(|p| p.name.as_str()).collect();
    for (name, ty) in schema.in_req() {
        if !supplied.contains(name.as_str()) {
            scope.push_in_req(name.clone(), ty.clone());
        }
    }
    Ok(())
}

/// Rule postcondition: append an `Undefined(remote)` slot for every
/// required input not present in the parameter list. `also_supplied`
/// names inputs provided elsewhere (join parameter passing). Idempotent.
pub(crate) fn add_required_undefineds(
    in_params: &mut Vec<InputParam>,
    schema: &FunctionSchema,
    also_supplied: &HashSet<String>,
) {
    let supplied: HashSet<&str> = in_params.iter().map(|p| p.name.as_str()).collect();
    let missing: Vec<String> = schema
        .in_req()
        .keys()
        .filter(|name| !supplied.contains(name.as_str()) && !also_supplied.contains(*name))
        .cloned()
        .collect();
    for name in missing {
        in_params.push(InputParam::new(name, Value::Undefined { remote: true }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{RetrieveError, SchemaRetriever};
    use std::collections::HashMap;
    use thingtalk_ast::FunctionKind;

    struct EmptyRetriever;

    impl SchemaRetriever for EmptyRetriever {
        fn schema_for_selector(
            &self,
            _: &str,
            _: &str,
            _: FunctionKind,
            _: bool,
        ) -> std::result::Result<FunctionSchema, RetrieveError> {
            Err(RetrieveError::NotFound)
        }

        fn memory_schema(
            &self,
            _: &str,
            _: bool,
        ) -> std::result::Result<Option<FunctionSchema>, RetrieveError> {
            Ok(None)
        }

        fn allowed_schema_for(
            &self,
            _: &str,
            _: &str,
            _: FunctionKind,
            _: bool,
        ) -> std::result::Result<FunctionSchema, RetrieveError> {
            Err(RetrieveError::NotFound)
        }
    }

    fn post_schema() -> FunctionSchema {
        FunctionSchema::new(
            vec![("status", Type::String)],
            vec![("picture_url", Type::entity("tt:picture"))],
            vec![],
        )
    }

    #[test]
    fn test_valid_binding() {
        let mut params = vec![InputParam::new("status", Value::String("hi".into()))];
        let mut scope = Scope::new();
        check_in_params(&mut params, &post_schema(), &mut scope).unwrap();
    }

    #[test]
    fn test_unknown_parameter() {
        let mut params = vec![InputParam::new("text", Value::String("hi".into()))];
        let mut scope = Scope::new();
        assert_eq!(
            check_in_params(&mut params, &post_schema(), &mut scope),
            Err(TypeError::InvalidInputParameter("text".to_string()))
        );
    }

    #[test]
    fn test_duplicate_parameter() {
        let mut params = vec![
            InputParam::new("status", Value::String("a".into())),
            InputParam::new("status", Value::String("b".into())),
        ];
        let mut scope = Scope::new();
        assert_eq!(
            check_in_params(&mut params, &post_schema(), &mut scope),
            Err(TypeError::DuplicateInputParam("status".to_string()))
        );
    }

    #[test]
    fn test_type_mismatch() {
        let mut params = vec![InputParam::new("picture_url", Value::Number(3.0))];
        let mut scope = Scope::new();
        let err = check_in_params(&mut params, &post_schema(), &mut scope).unwrap_err();
        assert!(matches!(err, TypeError::InvalidType { .. }));
    }

    #[test]
    fn test_string_coercion_for_inputs() {
        let mut params = vec![InputParam::new("status", Value::Number(42.0))];
        let mut scope = Scope::new();
        check_in_params(&mut params, &post_schema(), &mut scope).unwrap();
    }

    #[test]
    fn test_undefined_matches_any_input() {
        let mut params = vec![InputParam::new("status", Value::Undefined { remote: false })];
        let mut scope = Scope::new();
        check_in_params(&mut params, &post_schema(), &mut scope).unwrap();
    }

    #[test]
    fn test_contact_entity_retag() {
        let schema = FunctionSchema::new(
            vec![("to", Type::entity("tt:phone_number"))],
            vec![],
            vec![],
        );
        let mut params = vec![InputParam::new(
            "to",
            Value::entity("bob", "tt:username"),
        )];
        let mut scope = Scope::new();
        check_in_params(&mut params, &schema, &mut scope).unwrap();
        match &params[0].value {
            Value::Entity { kind, .. } => assert_eq!(kind, "tt:contact_name"),
            _ => panic!("expected entity"),
        }
        // Unrelated entity kinds still fail.
        let mut params = vec![InputParam::new(
            "to",
            Value::entity("x", "tt:hashtag"),
        )];
        assert!(check_in_params(&mut params, &schema, &mut scope).is_err());
    }

    #[test]
    fn test_unsupplied_requireds_become_pending() {
        let retriever = EmptyRetriever;
        let ctx = Checker::new(&retriever, HashMap::new(), false);
        let mut schema = post_schema();
        let mut params = vec![];
        let mut scope = Scope::new();
        type_check_input_args(&mut params, &mut schema, &mut scope, &ctx).unwrap();
        assert_eq!(scope.pending_in_req().get("status"), Some(&Type::String));
    }

    #[test]
    fn test_declaration_lift() {
        let retriever = EmptyRetriever;
        let ctx = Checker::new(&retriever, HashMap::new(), false).for_declaration();
        let mut schema = FunctionSchema::new(vec![], vec![], vec![("text", Type::String)]);
        let mut params = vec![];
        let mut scope = Scope::new();
        scope.push_in_req("query", Type::String);

        type_check_input_args(&mut params, &mut schema, &mut scope, &ctx).unwrap();
        // The pending required became this primitive's own input, and is
        // pending again since this site does not supply it.
        assert_eq!(schema.input_type("query"), Some((&Type::String, true)));
        assert_eq!(scope.pending_in_req().get("query"), Some(&Type::String));
    }

    #[test]
    fn test_add_required_undefineds_idempotent() {
        let schema = post_schema();
        let mut params = vec![];
        add_required_undefineds(&mut params, &schema, &HashSet::new());
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "status");
        assert!(params[0].value.is_undefined());

        add_required_undefineds(&mut params, &schema, &HashSet::new());
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_add_required_undefineds_respects_join_supplies() {
        let schema = post_schema();
        let mut params = vec![];
        let supplied: HashSet<String> = ["status".to_string()].into();
        add_required_undefineds(&mut params, &schema, &supplied);
        assert!(params.is_empty());
    }
}
