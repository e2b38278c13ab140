//! Full-pipeline checks through the public API: model in, statement and
//! materializer out.

use std::collections::HashMap;

use graphlinq::metadata::{EntityDef, GraphModel, PropertyType};
use graphlinq::query_model::{
    BodyClause, Expression, ObjectConstruction, Operator, QueryModel, QuerySource, QuerySourceId,
    SelectClause, Value, WhereClause,
};
use graphlinq::{compile, CompileError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn place_hierarchy() -> GraphModel {
    GraphModel::build(vec![
        EntityDef::new("Place")
            .abstract_type()
            .with_property("Location", PropertyType::Text),
        EntityDef::new("Warehouse")
            .with_base("Place")
            .with_property("Size", PropertyType::Integer),
    ])
    .unwrap()
}

#[test]
fn derived_entity_matches_root_labels_and_materializes_leaf() {
    init_logging();
    let model = QueryModel::new(
        QuerySource::new(0, "p", "Warehouse"),
        SelectClause::identity(QuerySourceId(0)),
    );
    let compiled = compile(&model, &place_hierarchy(), &HashMap::new()).unwrap();
    assert_eq!(
        compiled.statement.text,
        "MATCH (p:Place) RETURN \"p\".\"Location\", \"p\".\"Size\""
    );
    let materialize = compiled.materializer.expect("identity select materializes");
    let instance = materialize(&[Value::from("east-2"), Value::from(40_i64)]);
    assert_eq!(instance.entity_type, "Warehouse");
    assert_eq!(instance.get("Location"), Some(&Value::from("east-2")));
    assert_eq!(instance.get("Size"), Some(&Value::from(40_i64)));
}

#[test]
fn short_row_defaults_missing_values_to_null() {
    init_logging();
    let model = QueryModel::new(
        QuerySource::new(0, "p", "Warehouse"),
        SelectClause::identity(QuerySourceId(0)),
    );
    let compiled = compile(&model, &place_hierarchy(), &HashMap::new()).unwrap();
    let materialize = compiled.materializer.unwrap();
    let instance = materialize(&[Value::from("east-2")]);
    assert_eq!(instance.get("Size"), Some(&Value::Null));
}

#[test]
fn abstract_source_with_one_concrete_leaf_compiles() {
    init_logging();
    let model = QueryModel::new(
        QuerySource::new(0, "p", "Place"),
        SelectClause::identity(QuerySourceId(0)),
    );
    let compiled = compile(&model, &place_hierarchy(), &HashMap::new()).unwrap();
    let materialize = compiled.materializer.unwrap();
    let instance = materialize(&[Value::from("west-9"), Value::from(7_i64)]);
    assert_eq!(instance.entity_type, "Warehouse");
}

#[test]
fn opaque_property_cannot_be_materialized() {
    init_logging();
    let metadata = GraphModel::build(vec![EntityDef::new("Parcel")
        .with_property("Contents", PropertyType::Opaque)])
    .unwrap();
    let model = QueryModel::new(
        QuerySource::new(0, "p", "Parcel"),
        SelectClause::identity(QuerySourceId(0)),
    );
    let err = compile(&model, &metadata, &HashMap::new()).unwrap_err();
    match err {
        CompileError::Translation(inner) => assert!(inner.is_recoverable()),
        other => panic!("expected translation error, got {}", other),
    }
}

#[test]
fn missing_parameter_value_surfaces_as_generation_error() {
    init_logging();
    let model = QueryModel::new(
        QuerySource::new(0, "w", "Warehouse"),
        SelectClause::new(Expression::New(ObjectConstruction {
            type_name: None,
            members: Vec::new(),
        })),
    )
    .with_clause(BodyClause::Where(WhereClause {
        predicate: Expression::binary(
            Operator::Equal,
            Expression::member(QuerySourceId(0), "Size"),
            Expression::Parameter("size".to_string()),
        ),
    }));
    let err = compile(&model, &place_hierarchy(), &HashMap::new()).unwrap_err();
    assert!(matches!(err, CompileError::Generation(_)));
}

#[test]
fn unknown_entity_fails_compilation() {
    init_logging();
    let model = QueryModel::new(
        QuerySource::new(0, "g", "Ghost"),
        SelectClause::identity(QuerySourceId(0)),
    );
    let err = compile(&model, &place_hierarchy(), &HashMap::new()).unwrap_err();
    match err {
        CompileError::Translation(inner) => assert!(!inner.is_recoverable()),
        other => panic!("expected translation error, got {}", other),
    }
}
