//! Projection visitor behavior: push-down, reuse, and client fallback.

use crate::cypher_ir::CypherExpr;
use crate::metadata::{EntityDef, GraphModel, PropertyType};
use crate::query_model::{
    Conditional, Expression, FnCall, ObjectConstruction, Operator, QueryModel, QuerySource,
    QuerySourceId, SelectClause,
};
use crate::translator::{
    DefaultFragmentRewriter, ProjectionVisitor, QueryModelWalker, TranslationError,
};

fn metadata() -> GraphModel {
    GraphModel::build(vec![EntityDef::new("Warehouse")
        .with_property("Location", PropertyType::Text)
        .with_property("Size", PropertyType::Integer)])
    .unwrap()
}

fn setup<'a>(
    metadata: &'a GraphModel,
    rewriter: &'a DefaultFragmentRewriter,
) -> QueryModelWalker<'a> {
    let model = QueryModel::new(
        QuerySource::new(0, "w", "Warehouse"),
        SelectClause::identity(QuerySourceId(0)),
    );
    let mut walker = QueryModelWalker::new(metadata, rewriter);
    walker.visit(&model).unwrap();
    walker
}

fn record(members: Vec<(&str, Expression)>) -> Expression {
    Expression::New(ObjectConstruction {
        type_name: None,
        members: members
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect(),
    })
}

#[test]
fn identity_projection_passes_through() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let selector = Expression::QuerySourceRef(QuerySourceId(0));
    let projection = visitor.visit_select(&selector).unwrap();
    assert_eq!(projection, selector);
    assert!(visitor.client_expressions().is_empty());
    assert!(walker
        .find(QuerySourceId(0))
        .unwrap()
        .return_items()
        .is_empty());
}

#[test]
fn literal_members_stay_inline() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let selector = record(vec![("Tag", Expression::literal("fixed"))]);
    let projection = visitor.visit_select(&selector).unwrap();
    assert_eq!(projection, selector);
    assert!(walker
        .find(QuerySourceId(0))
        .unwrap()
        .return_items()
        .is_empty());
}

#[test]
fn computed_member_becomes_row_read() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let selector = record(vec![(
        "Total",
        Expression::binary(
            Operator::Addition,
            Expression::member(QuerySourceId(0), "Size"),
            Expression::literal(1_i64),
        ),
    )]);
    let projection = visitor.visit_select(&selector).unwrap();
    match projection {
        Expression::New(ctor) => match &ctor.members[0].1 {
            Expression::ReadRow(read) => {
                assert_eq!(read.index, 0);
                assert!(!read.defaulted);
            }
            other => panic!("expected row read, got {:?}", other),
        },
        other => panic!("expected construction, got {:?}", other),
    }
    let query = walker.find(QuerySourceId(0)).unwrap();
    assert_eq!(query.return_items().len(), 1);
    assert_eq!(query.return_items()[0].alias.as_deref(), Some("Total"));
    assert!(matches!(
        query.return_items()[0].expression,
        CypherExpr::OperatorApplication(_)
    ));
}

#[test]
fn repeated_property_access_shares_a_return_item() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let selector = record(vec![
        ("A", Expression::member(QuerySourceId(0), "Size")),
        ("B", Expression::member(QuerySourceId(0), "Size")),
    ]);
    let projection = visitor.visit_select(&selector).unwrap();
    let indices: Vec<usize> = match projection {
        Expression::New(ctor) => ctor
            .members
            .iter()
            .map(|(_, member)| match member {
                Expression::ReadRow(read) => read.index,
                other => panic!("expected row read, got {:?}", other),
            })
            .collect(),
        other => panic!("expected construction, got {:?}", other),
    };
    assert_eq!(indices, vec![0, 0]);
    assert_eq!(
        walker.find(QuerySourceId(0)).unwrap().return_items().len(),
        1
    );
}

#[test]
fn unsupported_member_falls_back_to_client() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let raw = Expression::FnCall(FnCall {
        name: "formatLabel".to_string(),
        args: vec![Expression::member(QuerySourceId(0), "Location")],
    });
    let selector = record(vec![("Label", raw.clone())]);
    let projection = visitor.visit_select(&selector).unwrap();
    match projection {
        Expression::New(ctor) => assert_eq!(ctor.members[0].1, raw),
        other => panic!("expected construction, got {:?}", other),
    }
    assert_eq!(visitor.client_expressions(), &[raw]);
}

#[test]
fn conditional_member_lowers_to_case() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let selector = record(vec![(
        "Large",
        Expression::Conditional(Conditional {
            condition: Box::new(Expression::binary(
                Operator::GreaterThan,
                Expression::member(QuerySourceId(0), "Size"),
                Expression::literal(1000_i64),
            )),
            then_expr: Box::new(Expression::literal(true)),
            else_expr: Box::new(Expression::literal(false)),
        }),
    )]);
    visitor.visit_select(&selector).unwrap();
    let query = walker.find(QuerySourceId(0)).unwrap();
    assert!(matches!(
        query.return_items()[0].expression,
        CypherExpr::Case(_)
    ));
}

#[test]
fn converted_member_reads_with_default() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let selector = record(vec![(
        "Size",
        Expression::Convert(Box::new(Expression::member(QuerySourceId(0), "Size"))),
    )]);
    let projection = visitor.visit_select(&selector).unwrap();
    match projection {
        Expression::New(ctor) => match &ctor.members[0].1 {
            Expression::ReadRow(read) => assert!(read.defaulted),
            other => panic!("expected row read, got {:?}", other),
        },
        other => panic!("expected construction, got {:?}", other),
    }
}

#[test]
fn restarting_a_projection_is_an_error() {
    let metadata = metadata();
    let rewriter = DefaultFragmentRewriter;
    let mut walker = setup(&metadata, &rewriter);
    let selector = Expression::QuerySourceRef(QuerySourceId(0));
    {
        let mut visitor =
            ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
        visitor.visit_select(&selector).unwrap();
    }
    let mut visitor =
        ProjectionVisitor::new(walker.context_mut(), &rewriter, QuerySourceId(0)).unwrap();
    let err = visitor.visit_select(&selector).unwrap_err();
    assert!(matches!(err, TranslationError::Ir(_)));
    assert!(!err.is_recoverable());
}
