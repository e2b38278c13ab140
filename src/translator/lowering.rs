use crate::cypher_ir::{
    CaseExpr, CypherExpr, OperatorApplication, PropertyAccess, ReadOnlyQuery, ReturnItem,
};
use crate::query_model::{Expression, MemberAccess, QuerySourceId};

use super::context::CompilationContext;
use super::errors::TranslationError;
use super::fragment_rewriter::FragmentRewriter;

/// Lowers caller expression-tree nodes into graph-query expression nodes,
/// binding member accesses to properties on a specific pattern.
///
/// Lowering either produces a fully server-representable [`CypherExpr`] or
/// fails with a recoverable error ([`TranslationError::is_recoverable`]);
/// callers interpret recoverable failure as "requires client-side
/// evaluation". Nothing partially lowered ever escapes.
pub struct LoweringVisitor<'a> {
    ctx: &'a mut CompilationContext,
    rewriter: &'a dyn FragmentRewriter,
    /// The query source whose `ReadOnlyQuery` is being built. Member
    /// accesses bind against its own patterns first; a reference that
    /// resolves into a different query forces materialization of the value
    /// through a return item there.
    target: Option<QuerySourceId>,
}

impl<'a> LoweringVisitor<'a> {
    pub fn new(
        ctx: &'a mut CompilationContext,
        rewriter: &'a dyn FragmentRewriter,
        target: Option<QuerySourceId>,
    ) -> Self {
        LoweringVisitor {
            ctx,
            rewriter,
            target,
        }
    }

    /// Lower an expression in the ordinary (predicate) position.
    pub fn lower(&mut self, expr: &Expression) -> Result<CypherExpr, TranslationError> {
        self.lower_inner(expr, false)
    }

    /// Lower the root of a projection. Structural node kinds at the root
    /// (convert, negate, object construction) bypass fragment rewriting,
    /// since they are not value-producing for return-item purposes.
    pub fn lower_root(&mut self, expr: &Expression) -> Result<CypherExpr, TranslationError> {
        self.lower_inner(expr, true)
    }

    fn lower_inner(
        &mut self,
        expr: &Expression,
        top_level: bool,
    ) -> Result<CypherExpr, TranslationError> {
        let structural_root = top_level
            && matches!(
                expr,
                Expression::Convert(_) | Expression::Negate(_) | Expression::New(_)
            );
        let rewritten;
        let expr = if structural_root {
            expr
        } else {
            match self.rewriter.rewrite(expr) {
                Some(normalized) => {
                    rewritten = normalized;
                    &rewritten
                }
                None => expr,
            }
        };

        match expr {
            Expression::Literal(value) => Ok(CypherExpr::Literal(value.clone())),
            Expression::Parameter(name) => Ok(CypherExpr::Parameter(name.clone())),
            Expression::MemberAccess(access) => self.lower_member(access),
            Expression::OperatorApplication(op) => {
                let operands = op
                    .operands
                    .iter()
                    .map(|operand| self.lower_inner(operand, false))
                    .collect::<Result<Vec<CypherExpr>, TranslationError>>()?;
                Ok(CypherExpr::OperatorApplication(OperatorApplication {
                    operator: op.operator.into(),
                    operands,
                }))
            }
            Expression::Conditional(cond) => {
                let condition = self.lower_inner(&cond.condition, false)?;
                let then_expr = self.lower_inner(&cond.then_expr, false)?;
                let else_expr = self.lower_inner(&cond.else_expr, false)?;
                Ok(CypherExpr::Case(CaseExpr {
                    when_then: vec![(condition, then_expr)],
                    else_expr: Some(Box::new(else_expr)),
                }))
            }
            Expression::Convert(inner) => {
                if top_level {
                    // Structural at the root; the conversion itself has no
                    // graph-side representation.
                    self.lower_inner(inner, true)
                } else {
                    let lowered = self.lower_inner(inner, false)?;
                    Ok(CypherExpr::NullGuarded(Box::new(lowered)))
                }
            }
            Expression::Negate(inner) => {
                let lowered = self.lower_inner(inner, false)?;
                Ok(CypherExpr::OperatorApplication(OperatorApplication {
                    operator: crate::cypher_ir::Operator::Negate,
                    operands: vec![lowered],
                }))
            }
            Expression::FnCall(call) => Err(TranslationError::unsupported(format!(
                "function call '{}'",
                call.name
            ))),
            Expression::SubQuery(_) => {
                Err(TranslationError::unsupported("sub-query expression"))
            }
            Expression::New(_) => Err(TranslationError::unsupported(
                "object construction outside a projection root",
            )),
            Expression::QuerySourceRef(source) => Err(TranslationError::UnboundQuerySource(
                source.to_string(),
            )),
            Expression::ReadRow(_) => Err(TranslationError::unsupported(
                "row read (already client-side)",
            )),
        }
    }

    /// Bind a member access to a pattern property.
    ///
    /// Precedence: (1) patterns in scope, preferring the target query's
    /// own; (2) a return item already registered for this member on a
    /// different query; (3) an enclosing compilation's patterns. First
    /// non-null result wins.
    fn lower_member(&mut self, access: &MemberAccess) -> Result<CypherExpr, TranslationError> {
        let source = match access.root_source() {
            Some(source) => source,
            None => {
                return Err(TranslationError::unsupported(
                    "member access not rooted on a query source",
                ))
            }
        };

        // (1) a pattern bound for the member's source.
        if let Some((owner, alias)) = self.ctx.resolve_pattern(source) {
            let reference = CypherExpr::PropertyAccess(PropertyAccess {
                alias,
                property: access.member.clone(),
            });
            // Cross-source correlation: the value lives in a different
            // query than the one being built, so it must be materialized
            // through a return item there.
            if self.target != Some(owner) && self.target.is_some() {
                let query = self.ctx.find_mut(owner).ok_or_else(|| {
                    TranslationError::Internal(format!(
                        "pattern resolved to source {} but no query is bound for it",
                        owner
                    ))
                })?;
                let index = match query.find_return_item(&reference) {
                    Some(index) => index,
                    None => query.add_return_item(ReturnItem::new(reference.clone()))?,
                };
                query.set_member_item(source, access.member.clone(), index);
            }
            return Ok(reference);
        }

        // (2) already-materialized correlated value.
        if let Some((_, expression)) = self.ctx.find_member_item(source, &access.member) {
            return Ok(expression);
        }

        // (3) outer compilation scope, read-only.
        if let Some(alias) = self.ctx.resolve_pattern_in_parent(source) {
            return Ok(CypherExpr::PropertyAccess(PropertyAccess {
                alias,
                property: access.member.clone(),
            }));
        }

        Err(TranslationError::UnboundMember {
            member: access.member.clone(),
        })
    }
}

/// Whether every bound property reference in `expr` resolves to a pattern
/// within `query`. A reference whose pattern is foreign to the owning
/// query must not be emitted as IR there; the caller falls back to
/// client-side evaluation instead.
pub(crate) fn binds_within(expr: &CypherExpr, query: &ReadOnlyQuery) -> bool {
    expr.referenced_aliases()
        .iter()
        .all(|alias| query.contains_alias(alias))
}
