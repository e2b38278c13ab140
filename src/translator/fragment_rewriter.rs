use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::query_model::{Expression, Operator, OperatorApplication};

/// Pre-pass applied before structural lowering: rewrites an arbitrary
/// sub-expression into an equivalent normalized form, e.g. canonicalizing
/// a known function call into an operator application.
///
/// Implementations must be idempotent: offering an already-normalized
/// expression again returns `None` (unchanged), which is what keeps the
/// lowering visitor free of rewrite loops.
pub trait FragmentRewriter {
    fn rewrite(&self, expr: &Expression) -> Option<Expression>;
}

lazy_static! {
    /// Function names with a direct operator equivalent in the graph
    /// query language. Arity is checked at rewrite time.
    static ref FRAGMENT_REGISTRY: HashMap<&'static str, (Operator, usize)> = {
        let mut m = HashMap::new();
        m.insert("starts_with", (Operator::StartsWith, 2));
        m.insert("ends_with", (Operator::EndsWith, 2));
        m.insert("contains", (Operator::Contains, 2));
        m.insert("is_null", (Operator::IsNull, 1));
        m.insert("is_not_null", (Operator::IsNotNull, 1));
        m
    };
}

/// Registry-driven rewriter used when the caller supplies no custom one.
#[derive(Debug, Default)]
pub struct DefaultFragmentRewriter;

impl FragmentRewriter for DefaultFragmentRewriter {
    fn rewrite(&self, expr: &Expression) -> Option<Expression> {
        let call = match expr {
            Expression::FnCall(call) => call,
            _ => return None,
        };
        let (operator, arity) = FRAGMENT_REGISTRY.get(call.name.as_str())?;
        if call.args.len() != *arity {
            return None;
        }
        Some(Expression::OperatorApplication(OperatorApplication {
            operator: *operator,
            operands: call.args.clone(),
        }))
    }
}

/// Rewriter that leaves every expression untouched.
#[derive(Debug, Default)]
pub struct NoopFragmentRewriter;

impl FragmentRewriter for NoopFragmentRewriter {
    fn rewrite(&self, _expr: &Expression) -> Option<Expression> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_model::{FnCall, QuerySourceId};

    fn starts_with_call() -> Expression {
        Expression::FnCall(FnCall {
            name: "starts_with".to_string(),
            args: vec![
                Expression::member(QuerySourceId(0), "Location"),
                Expression::literal("North"),
            ],
        })
    }

    #[test]
    fn known_call_becomes_operator() {
        let rewritten = DefaultFragmentRewriter.rewrite(&starts_with_call()).unwrap();
        match rewritten {
            Expression::OperatorApplication(op) => {
                assert_eq!(op.operator, Operator::StartsWith);
                assert_eq!(op.operands.len(), 2);
            }
            other => panic!("expected operator application, got {:?}", other),
        }
    }

    #[test]
    fn rewriting_is_idempotent() {
        let rewritten = DefaultFragmentRewriter.rewrite(&starts_with_call()).unwrap();
        assert_eq!(DefaultFragmentRewriter.rewrite(&rewritten), None);
    }

    #[test]
    fn unknown_call_is_left_alone() {
        let call = Expression::FnCall(FnCall {
            name: "checksum".to_string(),
            args: vec![],
        });
        assert_eq!(DefaultFragmentRewriter.rewrite(&call), None);
    }

    #[test]
    fn wrong_arity_is_left_alone() {
        let call = Expression::FnCall(FnCall {
            name: "starts_with".to_string(),
            args: vec![Expression::literal("x")],
        });
        assert_eq!(DefaultFragmentRewriter.rewrite(&call), None);
    }
}
