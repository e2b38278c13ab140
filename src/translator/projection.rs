use crate::cypher_ir::{CypherExpr, ReturnItem};
use crate::query_model::{Expression, ObjectConstruction, QuerySourceId, RowRead};

use super::context::CompilationContext;
use super::errors::TranslationError;
use super::fragment_rewriter::FragmentRewriter;
use super::lowering::{binds_within, LoweringVisitor};

/// Walks a select projection, deciding per sub-expression whether it can
/// be pushed into the RETURN clause or must be evaluated client-side after
/// materialization.
///
/// Pushed sub-expressions are replaced in the returned projection with
/// [`Expression::ReadRow`] nodes addressing the flat result row; the
/// mapping from original sub-expression to chosen IR node is kept so
/// sibling constructor arguments can reuse return items.
pub struct ProjectionVisitor<'a> {
    ctx: &'a mut CompilationContext,
    rewriter: &'a dyn FragmentRewriter,
    /// Source whose select clause is being processed.
    source: QuerySourceId,
    /// Context key of the query owning that source's patterns.
    query_key: QuerySourceId,
    /// Original sub-expression → (IR node, return-item position).
    mapped: Vec<(Expression, (CypherExpr, usize))>,
    /// Sub-expressions flagged for post-query evaluation.
    client_expressions: Vec<Expression>,
}

impl<'a> ProjectionVisitor<'a> {
    pub fn new(
        ctx: &'a mut CompilationContext,
        rewriter: &'a dyn FragmentRewriter,
        source: QuerySourceId,
    ) -> Result<Self, TranslationError> {
        let query_key = ctx
            .query_key_for(source)
            .ok_or_else(|| TranslationError::UnboundQuerySource(source.to_string()))?;
        Ok(ProjectionVisitor {
            ctx,
            rewriter,
            source,
            query_key,
            mapped: Vec::new(),
            client_expressions: Vec::new(),
        })
    }

    /// Process the select clause for this visitor's source. The owning
    /// query transitions Unvisited → ReturnItemsAccumulating here; closing
    /// happens once the caller has finished any entity materialization.
    pub fn visit_select(&mut self, selector: &Expression) -> Result<Expression, TranslationError> {
        let query = self
            .ctx
            .find_mut(self.query_key)
            .ok_or_else(|| TranslationError::UnboundQuerySource(self.query_key.to_string()))?;
        query.begin_projection()?;
        self.visit(selector, true)
    }

    pub fn client_expressions(&self) -> &[Expression] {
        &self.client_expressions
    }

    fn mapping_for(&self, expr: &Expression) -> Option<&(CypherExpr, usize)> {
        self.mapped
            .iter()
            .rev()
            .find(|(original, _)| original == expr)
            .map(|(_, chosen)| chosen)
    }

    fn visit(&mut self, expr: &Expression, top_level: bool) -> Result<Expression, TranslationError> {
        match expr {
            // Construction nodes recurse into arguments; the construction
            // itself is structural and never lowered.
            Expression::New(ctor) => self.visit_construction(ctor),
            // Constants are never re-lowered or pushed.
            Expression::Literal(_) => Ok(expr.clone()),
            _ => self.visit_value(expr, top_level),
        }
    }

    fn visit_construction(
        &mut self,
        ctor: &ObjectConstruction,
    ) -> Result<Expression, TranslationError> {
        let mut members = Vec::with_capacity(ctor.members.len());
        for (name, argument) in &ctor.members {
            let visited = self.visit(argument, false)?;
            // Arguments with a recorded IR mapping become named members of
            // the query, so later passes can ask "what return item backs
            // member X of source Y".
            if let Some((_, index)) = self.mapping_for(argument).cloned() {
                if let Some(query) = self.ctx.find_mut(self.query_key) {
                    query.set_member_item(self.source, name.clone(), index);
                    query.set_return_alias(index, name.clone());
                }
            }
            members.push((name.clone(), visited));
        }
        Ok(Expression::New(ObjectConstruction {
            type_name: ctor.type_name.clone(),
            members,
        }))
    }

    fn visit_value(
        &mut self,
        expr: &Expression,
        top_level: bool,
    ) -> Result<Expression, TranslationError> {
        let count_before = self
            .ctx
            .find(self.query_key)
            .map(|q| q.return_items().len())
            .unwrap_or(0);

        let mut visitor = LoweringVisitor::new(self.ctx, self.rewriter, Some(self.query_key));
        let lowered = if top_level {
            visitor.lower_root(expr)
        } else {
            visitor.lower(expr)
        };

        let lowered = match lowered {
            Ok(ir) => ir,
            Err(error) if error.is_recoverable() => {
                // A direct query-source reference is identity-projected by
                // the caller's standard entity materialization.
                if matches!(expr, Expression::QuerySourceRef(_)) {
                    return Ok(expr.clone());
                }
                log::debug!("projection falls back to client evaluation: {}", error);
                self.client_expressions.push(expr.clone());
                return Ok(expr.clone());
            }
            Err(error) => return Err(error),
        };

        let query = self
            .ctx
            .find_mut(self.query_key)
            .ok_or_else(|| TranslationError::UnboundQuerySource(self.query_key.to_string()))?;

        // A lowered expression referencing foreign patterns must not be
        // emitted into this query.
        if !binds_within(&lowered, query) {
            self.client_expressions.push(expr.clone());
            return Ok(expr.clone());
        }

        if lowered.is_literal() {
            return Ok(expr.clone());
        }

        // The last-lowered expression supersedes any placeholder return
        // items added while lowering this slot.
        query.truncate_return_items(count_before);

        let index = if lowered.as_property_access().is_some() {
            // Already a scalar column reference; reuse its storage.
            match query.find_return_item(&lowered) {
                Some(index) => index,
                None => query.add_return_item(ReturnItem::new(lowered.clone()))?,
            }
        } else {
            query.add_return_item(ReturnItem::new(lowered.clone()))?
        };

        let defaulted = matches!(expr, Expression::SubQuery(_))
            || matches!(lowered, CypherExpr::NullGuarded(_));
        self.mapped.push((expr.clone(), (lowered, index)));
        Ok(Expression::ReadRow(RowRead { index, defaulted }))
    }
}
