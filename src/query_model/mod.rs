//! Structured object-query model consumed by the translator.
//!
//! The crate never parses query text: an external query-parsing component
//! hands in a [`QueryModel`] whose clauses and expression trees are already
//! structured. Query sources carry opaque identities ([`QuerySourceId`])
//! that correlate expression fragments to graph patterns during lowering.

mod expression;
mod value;

pub use expression::{
    Conditional, Expression, FnCall, MemberAccess, ObjectConstruction, Operator,
    OperatorApplication, RowRead, SubQuery,
};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of one "from"/"join" origin in a query model.
///
/// Assigned by the caller; the translator only uses it as a correlation key
/// and never interprets the numeric value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct QuerySourceId(pub u32);

impl fmt::Display for QuerySourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One row-producing origin: a from or join clause over an entity type.
#[derive(Debug, PartialEq, Clone)]
pub struct QuerySource {
    pub id: QuerySourceId,
    /// Item name from the originating clause, used as the alias candidate
    /// for the graph pattern bound to this source.
    pub name: String,
    /// Entity type name, resolved through the metadata provider.
    pub entity: String,
}

impl QuerySource {
    pub fn new(id: u32, name: impl Into<String>, entity: impl Into<String>) -> Self {
        QuerySource {
            id: QuerySourceId(id),
            name: name.into(),
            entity: entity.into(),
        }
    }
}

/// A complete query: main from clause, body clauses in document order,
/// and the final select projection.
#[derive(Debug, PartialEq, Clone)]
pub struct QueryModel {
    pub main_from: QuerySource,
    pub body_clauses: Vec<BodyClause>,
    pub select: SelectClause,
}

impl QueryModel {
    pub fn new(main_from: QuerySource, select: SelectClause) -> Self {
        QueryModel {
            main_from,
            body_clauses: Vec::new(),
            select,
        }
    }

    pub fn with_clause(mut self, clause: BodyClause) -> Self {
        self.body_clauses.push(clause);
        self
    }

    /// All join clauses in document order.
    pub fn join_clauses(&self) -> impl Iterator<Item = &JoinClause> {
        self.body_clauses.iter().filter_map(|c| match c {
            BodyClause::Join(join) => Some(join),
            _ => None,
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum BodyClause {
    Where(WhereClause),
    Join(JoinClause),
    AdditionalFrom(QuerySource),
    /// Nested query model appearing as a clause. Explicitly unhandled by
    /// the walker (pass-through no-op); kept in the model so callers see
    /// the same clause sequence they supplied.
    SubQuery(SubQueryClause),
}

#[derive(Debug, PartialEq, Clone)]
pub struct WhereClause {
    pub predicate: Expression,
}

#[derive(Debug, PartialEq, Clone)]
pub struct JoinClause {
    pub source: QuerySource,
    pub outer_key_selector: Expression,
    pub inner_key_selector: Expression,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SubQueryClause {
    pub model: Box<QueryModel>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectClause {
    pub selector: Expression,
}

impl SelectClause {
    pub fn new(selector: Expression) -> Self {
        SelectClause { selector }
    }

    /// Identity projection of one query source (`select w`).
    pub fn identity(source: QuerySourceId) -> Self {
        SelectClause {
            selector: Expression::QuerySourceRef(source),
        }
    }
}
