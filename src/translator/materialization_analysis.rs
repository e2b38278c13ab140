use std::collections::HashSet;

use crate::query_model::{BodyClause, Expression, QueryModel, QuerySourceId, Value};

/// Query sources that must be materialized as whole entities.
///
/// A source needs full materialization when the query references it bare
/// (outside a member access), e.g. the `w` of `select w`. Join-key
/// selectors must never trip this analysis: the keys are compared
/// server-side and do not pull the entity across. To guarantee that, the
/// scan runs on a shadow copy of the clause expressions in which both join
/// selectors are substituted with an opaque constant placeholder; the
/// shadow is discarded afterwards and the original model is never touched.
pub fn entity_materialization_sources(model: &QueryModel) -> HashSet<QuerySourceId> {
    let shadow = shadow_expressions(model);
    let mut sources = HashSet::new();
    for expr in &shadow {
        scan(expr, &mut sources);
    }
    sources
}

fn join_key_placeholder() -> Expression {
    Expression::Literal(Value::Null)
}

/// Clause expressions with join-key selectors replaced by the placeholder.
fn shadow_expressions(model: &QueryModel) -> Vec<Expression> {
    let mut shadow = Vec::new();
    for clause in &model.body_clauses {
        match clause {
            BodyClause::Where(where_clause) => shadow.push(where_clause.predicate.clone()),
            BodyClause::Join(_) => {
                shadow.push(join_key_placeholder());
                shadow.push(join_key_placeholder());
            }
            BodyClause::AdditionalFrom(_) | BodyClause::SubQuery(_) => {}
        }
    }
    shadow.push(model.select.selector.clone());
    shadow
}

fn scan(expr: &Expression, out: &mut HashSet<QuerySourceId>) {
    match expr {
        Expression::QuerySourceRef(source) => {
            out.insert(*source);
        }
        Expression::MemberAccess(access) => {
            // A member access consumes a single property, not the entity;
            // only scan targets that are not direct source references.
            if access.root_source().is_none() {
                scan(&access.target, out);
            }
        }
        Expression::OperatorApplication(op) => {
            for operand in &op.operands {
                scan(operand, out);
            }
        }
        Expression::Conditional(cond) => {
            scan(&cond.condition, out);
            scan(&cond.then_expr, out);
            scan(&cond.else_expr, out);
        }
        Expression::FnCall(call) => {
            for arg in &call.args {
                scan(arg, out);
            }
        }
        Expression::New(ctor) => {
            for (_, member) in &ctor.members {
                scan(member, out);
            }
        }
        Expression::Convert(inner) | Expression::Negate(inner) => scan(inner, out),
        Expression::SubQuery(sub) => {
            // A nested model can correlate against outer sources through
            // its own clauses.
            for expr in shadow_expressions(&sub.model) {
                scan(&expr, out);
            }
        }
        Expression::Literal(_) | Expression::Parameter(_) | Expression::ReadRow(_) => {}
    }
}
