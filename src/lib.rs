//! graphlinq - Object-query to Cypher statement translation
//!
//! This crate compiles a structured object-query model into:
//! - A Cypher read statement (`MATCH` / `WHERE` / `RETURN`) with parameters
//! - A rewritten projection addressing the flat result row
//! - An optional materializer reconstructing typed entity instances
//! - Residual predicates and expressions flagged for client-side evaluation
//!
//! Query text parsing, statement execution, and transport are out of scope;
//! the caller supplies a [`query_model::QueryModel`] plus a
//! [`metadata::MetadataProvider`] and receives a [`CompiledQuery`].

pub mod cypher_generator;
pub mod cypher_ir;
pub mod materializer;
pub mod metadata;
pub mod query_model;
pub mod translator;

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use cypher_generator::{generate, CypherGeneratorError, GeneratedStatement};
use cypher_ir::{CypherExpr, PropertyAccess, ReturnItem};
use materializer::Materializer;
use metadata::MetadataProvider;
use query_model::{BodyClause, Expression, QueryModel, QuerySourceId, Value};
use translator::{
    entity_materialization_sources, DefaultFragmentRewriter, ProjectionVisitor,
    QueryModelWalker, TranslationError,
};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Generation(#[from] CypherGeneratorError),
}

/// Everything the caller needs to execute one compiled query: statement
/// text and parameters, the rewritten projection, an optional entity
/// materializer, and the residue that must run client-side.
pub struct CompiledQuery {
    /// Statement of the query owning the projected source's patterns; its
    /// rows feed `projection` and `materializer`.
    pub statement: GeneratedStatement,
    /// The select projection with pushed sub-expressions replaced by
    /// [`Expression::ReadRow`] nodes addressing the result row.
    pub projection: Expression,
    /// Present when the select is an identity projection of an entity
    /// source; maps one flat row to one typed instance.
    pub materializer: Option<Materializer>,
    /// Predicates that could not be pushed server-side, with the source
    /// whose rows they filter.
    pub client_predicates: Vec<(QuerySourceId, Expression)>,
    /// Projection sub-expressions flagged for post-query evaluation.
    pub client_expressions: Vec<Expression>,
    /// One statement per remaining bound source, in binding order. Values
    /// materialized into those queries by cross-source correlation are
    /// only reachable through these.
    pub auxiliary_statements: Vec<(QuerySourceId, GeneratedStatement)>,
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("statement", &self.statement)
            .field("projection", &self.projection)
            .field("materializer", &self.materializer.is_some())
            .field("client_predicates", &self.client_predicates)
            .field("client_expressions", &self.client_expressions)
            .field("auxiliary_statements", &self.auxiliary_statements)
            .finish()
    }
}

/// Compile one query model end to end.
///
/// Walks the model's clauses, processes the select projection against the
/// query owning the projected source, builds a materializer when the
/// projection is an identity over an entity source, closes that query,
/// and serializes its statement. Every other bound source yields an
/// auxiliary statement. `parameter_values` supplies a value for every
/// `$name` placeholder the model references.
pub fn compile(
    model: &QueryModel,
    metadata: &dyn MetadataProvider,
    parameter_values: &HashMap<String, Value>,
) -> Result<CompiledQuery, CompileError> {
    let rewriter = DefaultFragmentRewriter;
    let mut walker = QueryModelWalker::new(metadata, &rewriter);
    walker.visit(model)?;

    let materialized = entity_materialization_sources(model);

    // The projection is processed against the source it actually reads:
    // an identity select of an additional source targets that source's
    // query, not the main one.
    let projected = match &model.select.selector {
        Expression::QuerySourceRef(source) => *source,
        _ => model.main_from.id,
    };
    let mut visitor = ProjectionVisitor::new(walker.context_mut(), &rewriter, projected)?;
    let projection = visitor.visit_select(&model.select.selector)?;
    let client_expressions = visitor.client_expressions().to_vec();

    // An identity projection of a materialized entity source reads whole
    // instances; resolve every persisted primitive property into the
    // return clause and wire up the row-to-instance function.
    let materializer = match &projection {
        Expression::QuerySourceRef(source) if materialized.contains(source) => {
            let entity = source_entity(model, *source)
                .ok_or_else(|| TranslationError::UnboundQuerySource(source.to_string()))?;
            Some(build_entity_materializer(*source, entity, metadata, &mut walker)?)
        }
        _ => None,
    };

    let primary = walker
        .context()
        .query_key_for(projected)
        .ok_or_else(|| TranslationError::UnboundQuerySource(projected.to_string()))?;
    let query = walker
        .context_mut()
        .find_mut(primary)
        .ok_or_else(|| TranslationError::UnboundQuerySource(primary.to_string()))?;
    query.close();

    let statement = generate(query, parameter_values)?;

    let mut auxiliary_statements = Vec::new();
    for key in walker.context().bound_sources().to_vec() {
        if key == primary {
            continue;
        }
        let query = walker.context().find(key).ok_or_else(|| {
            TranslationError::Internal(format!("query for source {} vanished", key))
        })?;
        auxiliary_statements.push((key, generate(query, parameter_values)?));
    }

    Ok(CompiledQuery {
        statement,
        projection,
        materializer,
        client_predicates: walker.client_predicates().to_vec(),
        client_expressions,
        auxiliary_statements,
    })
}

/// Entity type of the clause that introduced `source` into the model.
fn source_entity(model: &QueryModel, source: QuerySourceId) -> Option<&str> {
    if model.main_from.id == source {
        return Some(&model.main_from.entity);
    }
    model.body_clauses.iter().find_map(|clause| match clause {
        BodyClause::AdditionalFrom(from) if from.id == source => Some(from.entity.as_str()),
        BodyClause::Join(join) if join.source.id == source => Some(join.source.entity.as_str()),
        _ => None,
    })
}

fn build_entity_materializer(
    source: QuerySourceId,
    entity: &str,
    metadata: &dyn MetadataProvider,
    walker: &mut QueryModelWalker<'_>,
) -> Result<Materializer, CompileError> {
    let (owner, alias) = walker
        .context()
        .resolve_pattern(source)
        .ok_or_else(|| TranslationError::UnboundQuerySource(source.to_string()))?;
    let query = walker
        .context_mut()
        .find_mut(owner)
        .ok_or_else(|| TranslationError::UnboundQuerySource(owner.to_string()))?;

    let (materializer, _) = materializer::build(entity, metadata, query, |property, query| {
        if !property.value_type.is_primitive() {
            return Err(TranslationError::unsupported(format!(
                "property '{}' has a non-scalar type",
                property.name
            )));
        }
        let reference = CypherExpr::PropertyAccess(PropertyAccess {
            alias: alias.clone(),
            property: property.name.clone(),
        });
        match query.find_return_item(&reference) {
            Some(index) => Ok(index),
            None => Ok(query.add_return_item(ReturnItem::new(reference))?),
        }
    })?;
    Ok(materializer)
}
