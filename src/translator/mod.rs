//! The translation middle-end: walks a query model and builds one
//! [`ReadOnlyQuery`] per originating query source.
//!
//! Compilation of one query model is single-threaded and synchronous:
//! pure CPU-bound tree transformation with no suspension point. All state
//! lives in the [`CompilationContext`] owned by the walker; nothing is
//! shared across concurrent compilations. A nested query model gets an
//! independent nested walker whose context defers missed lookups to the
//! parent's bindings read-only.

pub mod context;
pub mod errors;
pub mod fragment_rewriter;
pub mod lowering;
pub mod materialization_analysis;
pub mod projection;

#[cfg(test)]
mod tests;

pub use context::CompilationContext;
pub use errors::TranslationError;
pub use fragment_rewriter::{DefaultFragmentRewriter, FragmentRewriter, NoopFragmentRewriter};
pub use lowering::LoweringVisitor;
pub use materialization_analysis::entity_materialization_sources;
pub use projection::ProjectionVisitor;

use crate::cypher_ir::{NodeAlias, ReadOnlyQuery, ReadingClause};
use crate::metadata::MetadataProvider;
use crate::query_model::{
    BodyClause, Expression, JoinClause, Operator, QueryModel, QuerySource, QuerySourceId,
    WhereClause,
};

use self::lowering::binds_within;

/// Orchestrates lowering across an entire query model: clause-by-clause
/// application of from/where/join clauses, with client-side fallback for
/// predicates that cannot be pushed server-side.
pub struct QueryModelWalker<'a> {
    metadata: &'a dyn MetadataProvider,
    rewriter: &'a dyn FragmentRewriter,
    ctx: CompilationContext,
    /// Predicates that fell back to post-query evaluation, with the source
    /// whose rows they filter.
    client_predicates: Vec<(QuerySourceId, Expression)>,
}

impl<'a> QueryModelWalker<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider, rewriter: &'a dyn FragmentRewriter) -> Self {
        QueryModelWalker {
            metadata,
            rewriter,
            ctx: CompilationContext::new(),
            client_predicates: Vec::new(),
        }
    }

    /// Walker for a nested query model. Its context snapshots this
    /// walker's bindings for read-only upward lookup.
    pub fn nested(&self) -> QueryModelWalker<'a> {
        QueryModelWalker {
            metadata: self.metadata,
            rewriter: self.rewriter,
            ctx: self.ctx.nested(),
            client_predicates: Vec::new(),
        }
    }

    pub fn context(&self) -> &CompilationContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut CompilationContext {
        &mut self.ctx
    }

    pub fn client_predicates(&self) -> &[(QuerySourceId, Expression)] {
        &self.client_predicates
    }

    pub fn rewriter(&self) -> &'a dyn FragmentRewriter {
        self.rewriter
    }

    /// The query bound for `source`, if any. `None` means the source has
    /// no server-side representation and requires client evaluation.
    pub fn find(&self, source: QuerySourceId) -> Option<&ReadOnlyQuery> {
        self.ctx.find(source)
    }

    /// Apply every clause of the model in document order. The select
    /// clause is not processed here; the projection visitor owns it.
    pub fn visit(&mut self, model: &QueryModel) -> Result<(), TranslationError> {
        self.visit_from(&model.main_from)?;
        let main = model.main_from.id;
        for clause in &model.body_clauses {
            match clause {
                BodyClause::Where(where_clause) => self.visit_where(where_clause, main)?,
                BodyClause::Join(join) => self.visit_join(join, main)?,
                BodyClause::AdditionalFrom(source) => self.visit_from(source)?,
                BodyClause::SubQuery(_) => {
                    // Sub-query clauses are explicitly unhandled: no
                    // inlining, no correlation. Pass-through no-op.
                    log::debug!("skipping sub-query clause (unhandled by the walker)");
                }
            }
        }
        Ok(())
    }

    /// Bind a from clause: allocate an alias, create the pattern, and open
    /// a fresh query for the source.
    fn visit_from(&mut self, source: &QuerySource) -> Result<(), TranslationError> {
        let labels = self.metadata.labels(&source.entity)?;
        let alias = self.ctx.aliases_mut().allocate(&source.name);
        let clause = ReadingClause::new(labels, NodeAlias(alias), Some(source.id));
        self.ctx.bind(source.id, ReadOnlyQuery::new(clause));
        Ok(())
    }

    fn visit_where(
        &mut self,
        clause: &WhereClause,
        origin: QuerySourceId,
    ) -> Result<(), TranslationError> {
        if self.ctx.find(origin).is_none() {
            // No server-side representation for the originating source;
            // the whole predicate filters client-side.
            self.client_predicates
                .push((origin, clause.predicate.clone()));
            return Ok(());
        }

        let mut visitor = LoweringVisitor::new(&mut self.ctx, self.rewriter, Some(origin));
        match visitor.lower(&clause.predicate) {
            Ok(predicate) => {
                let query = self.ctx.find_mut(origin).ok_or_else(|| {
                    TranslationError::Internal(format!("query for source {} vanished", origin))
                })?;
                if binds_within(&predicate, query) {
                    query.and_where(predicate);
                } else {
                    self.client_predicates
                        .push((origin, clause.predicate.clone()));
                }
                Ok(())
            }
            Err(error) if error.is_recoverable() => {
                log::debug!("where predicate falls back to client evaluation: {}", error);
                self.client_predicates
                    .push((origin, clause.predicate.clone()));
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Bind a join clause: the joined source's pattern is added to the
    /// main query, and the key equality is AND-ed onto that pattern (the
    /// most recently added one).
    fn visit_join(&mut self, join: &JoinClause, main: QuerySourceId) -> Result<(), TranslationError> {
        let labels = self.metadata.labels(&join.source.entity)?;
        let alias = self.ctx.aliases_mut().allocate(&join.source.name);
        let clause = ReadingClause::new(labels, NodeAlias(alias), Some(join.source.id));
        let query = self.ctx.find_mut(main).ok_or_else(|| {
            TranslationError::Internal(format!(
                "join applied before source {} was bound",
                main
            ))
        })?;
        query.add_reading_clause(clause);

        let key_equality = Expression::binary(
            Operator::Equal,
            join.outer_key_selector.clone(),
            join.inner_key_selector.clone(),
        );
        let mut visitor = LoweringVisitor::new(&mut self.ctx, self.rewriter, Some(main));
        match visitor.lower(&key_equality) {
            Ok(predicate) => {
                let query = self.ctx.find_mut(main).ok_or_else(|| {
                    TranslationError::Internal(format!("query for source {} vanished", main))
                })?;
                if binds_within(&predicate, query) {
                    query.and_where(predicate);
                } else {
                    self.client_predicates.push((join.source.id, key_equality));
                }
                Ok(())
            }
            Err(error) if error.is_recoverable() => {
                log::warn!("join keys fall back to client evaluation: {}", error);
                self.client_predicates.push((join.source.id, key_equality));
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}
