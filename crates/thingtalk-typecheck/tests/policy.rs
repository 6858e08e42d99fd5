//! Permission-rule checking scenarios.

mod common;

use common::MockSchemas;
use thingtalk_ast::{
    BooleanExpression, PermissionFunction, PermissionRule, Value,
};
use thingtalk_typecheck::{type_check_permission_rule, TypeError};

fn weather_query() -> PermissionFunction {
    PermissionFunction::Specified {
        kind: "org.thingpedia.weather".to_string(),
        channel: "current".to_string(),
        filter: BooleanExpression::atom("temperature", ">=", Value::measure(0.0, "C")),
        schema: None,
    }
}

#[test]
fn test_permission_rule_checks_all_three_filters() {
    let schemas = MockSchemas::thingpedia();
    let mut rule = PermissionRule {
        principal: BooleanExpression::atom(
            "source",
            "==",
            Value::entity("mock-account:alice", "tt:contact"),
        ),
        query: weather_query(),
        action: PermissionFunction::Specified {
            kind: "com.twitter".to_string(),
            channel: "post".to_string(),
            // The action filter sees the query's outputs and the event.
            filter: BooleanExpression::And(vec![
                BooleanExpression::atom("status", "==", Value::event()),
                BooleanExpression::atom("temperature", ">=", Value::measure(10.0, "C")),
            ]),
            schema: None,
        },
    };
    type_check_permission_rule(&mut rule, &schemas, false).unwrap();

    // Both specified sides had their schemas attached.
    match &rule.query {
        PermissionFunction::Specified { schema, .. } => assert!(schema.is_some()),
        _ => panic!("expected specified query"),
    }
    match &rule.action {
        PermissionFunction::Specified { schema, .. } => assert!(schema.is_some()),
        _ => panic!("expected specified action"),
    }
}

#[test]
fn test_permission_rule_with_builtin_sides() {
    let schemas = MockSchemas::thingpedia();
    let mut rule = PermissionRule {
        principal: BooleanExpression::True,
        query: weather_query(),
        action: PermissionFunction::Builtin,
    };
    type_check_permission_rule(&mut rule, &schemas, false).unwrap();
}

#[test]
fn test_principal_filter_sees_source_only() {
    let schemas = MockSchemas::thingpedia();
    let mut rule = PermissionRule {
        principal: BooleanExpression::atom("requester", "==", Value::entity("x", "tt:contact")),
        query: PermissionFunction::Builtin,
        action: PermissionFunction::Builtin,
    };
    assert_eq!(
        type_check_permission_rule(&mut rule, &schemas, false),
        Err(TypeError::InvalidFieldName("requester".to_string()))
    );
}

#[test]
fn test_event_not_available_before_query() {
    // $event in the *query* filter has no record to refer to yet.
    let schemas = MockSchemas::thingpedia();
    let mut rule = PermissionRule {
        principal: BooleanExpression::True,
        query: PermissionFunction::Specified {
            kind: "org.thingpedia.weather".to_string(),
            channel: "current".to_string(),
            filter: BooleanExpression::atom("status", "==", Value::event()),
            schema: None,
        },
        action: PermissionFunction::Builtin,
    };
    assert_eq!(
        type_check_permission_rule(&mut rule, &schemas, false),
        Err(TypeError::VariableNotInScope("$event".to_string()))
    );
}

#[test]
fn test_unknown_permission_function() {
    let schemas = MockSchemas::thingpedia();
    let mut rule = PermissionRule {
        principal: BooleanExpression::True,
        query: PermissionFunction::Specified {
            kind: "com.nowhere".to_string(),
            channel: "nothing".to_string(),
            filter: BooleanExpression::True,
            schema: None,
        },
        action: PermissionFunction::Builtin,
    };
    assert!(matches!(
        type_check_permission_rule(&mut rule, &schemas, false),
        Err(TypeError::UnknownFunction { .. })
    ));
}
