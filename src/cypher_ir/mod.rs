//! Mutable intermediate representation of a Cypher read statement under
//! construction.
//!
//! One [`ReadOnlyQuery`] exists per originating query source. It is created
//! when the source is first bound to a pattern and mutated throughout
//! clause processing: reading clauses accumulate as joins are applied,
//! predicates are AND-ed onto the most recently added pattern, and return
//! items append in a positionally stable order. The projection visitor
//! closes the query once the select clause for its source is finished;
//! any later return-item addition is a caller bug surfaced as [`IrError`].

mod alias_allocator;
mod expr;
pub mod errors;

pub use alias_allocator::{AliasAllocator, MAX_ALIAS_LENGTH};
pub use errors::IrError;
pub use expr::{
    CaseExpr, CypherExpr, NodeAlias, Operator, OperatorApplication, PropertyAccess,
};

use serde::{Deserialize, Serialize};

use crate::query_model::QuerySourceId;

/// A graph node-match fragment: labels, bound alias, and the conjunctive
/// predicate attached to it.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ReadingClause {
    pub labels: Vec<String>,
    pub alias: NodeAlias,
    /// Originating query source, when this pattern was created for one.
    pub source: Option<QuerySourceId>,
    pub predicate: Option<CypherExpr>,
}

impl ReadingClause {
    pub fn new(labels: Vec<String>, alias: NodeAlias, source: Option<QuerySourceId>) -> Self {
        ReadingClause {
            labels,
            alias,
            source,
            predicate: None,
        }
    }

    /// AND a newly lowered boolean expression onto the existing predicate.
    pub fn and_predicate(&mut self, predicate: CypherExpr) {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
    }
}

/// One scalar expression in the statement's output projection.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ReturnItem {
    pub expression: CypherExpr,
    /// Target name, emitted as `AS <alias>` when it differs from the
    /// source property name.
    pub alias: Option<String>,
}

impl ReturnItem {
    pub fn new(expression: CypherExpr) -> Self {
        ReturnItem {
            expression,
            alias: None,
        }
    }
}

/// Projection lifecycle of a [`ReadOnlyQuery`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ProjectionState {
    Unvisited,
    ReturnItemsAccumulating,
    Closed,
}

/// The per-query-source IR: patterns to match, predicate to apply, items
/// to return, and the member → return-item bookkeeping that lets later
/// passes reuse already-materialized values.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ReadOnlyQuery {
    reading_clauses: Vec<ReadingClause>,
    return_items: Vec<ReturnItem>,
    /// (source, member) → return-item index. Insertion-ordered so nothing
    /// downstream depends on hash iteration.
    member_items: Vec<((QuerySourceId, String), usize)>,
    state: ProjectionState,
}

impl ReadOnlyQuery {
    pub fn new(reading_clause: ReadingClause) -> Self {
        ReadOnlyQuery {
            reading_clauses: vec![reading_clause],
            return_items: Vec::new(),
            member_items: Vec::new(),
            state: ProjectionState::Unvisited,
        }
    }

    pub fn reading_clauses(&self) -> &[ReadingClause] {
        &self.reading_clauses
    }

    pub fn add_reading_clause(&mut self, clause: ReadingClause) {
        self.reading_clauses.push(clause);
    }

    /// AND a predicate onto the most recently added pattern.
    pub fn and_where(&mut self, predicate: CypherExpr) {
        if let Some(last) = self.reading_clauses.last_mut() {
            last.and_predicate(predicate);
        }
    }

    pub fn state(&self) -> ProjectionState {
        self.state
    }

    pub fn begin_projection(&mut self) -> Result<(), IrError> {
        match self.state {
            ProjectionState::Unvisited => {
                self.state = ProjectionState::ReturnItemsAccumulating;
                Ok(())
            }
            _ => Err(IrError::ProjectionRestarted),
        }
    }

    pub fn close(&mut self) {
        self.state = ProjectionState::Closed;
    }

    pub fn return_items(&self) -> &[ReturnItem] {
        &self.return_items
    }

    /// Append a return item, returning its position. Positions are stable:
    /// later additions only append.
    pub fn add_return_item(&mut self, item: ReturnItem) -> Result<usize, IrError> {
        if self.state == ProjectionState::Closed {
            return Err(IrError::QueryClosed);
        }
        self.return_items.push(item);
        Ok(self.return_items.len() - 1)
    }

    /// Drop return items past `len`, used when a later-lowered expression
    /// supersedes placeholder items for the same projection slot. Member
    /// mappings pointing past the cut are dropped with them.
    pub fn truncate_return_items(&mut self, len: usize) {
        self.return_items.truncate(len);
        self.member_items.retain(|(_, index)| *index < len);
    }

    /// Position of an identical return-item expression, for de-duplication.
    pub fn find_return_item(&self, expression: &CypherExpr) -> Option<usize> {
        self.return_items
            .iter()
            .position(|item| &item.expression == expression)
    }

    pub fn set_return_alias(&mut self, index: usize, alias: String) {
        if let Some(item) = self.return_items.get_mut(index) {
            item.alias = Some(alias);
        }
    }

    /// Record that `member` of `source` is satisfied by the return item at
    /// `index`.
    pub fn set_member_item(&mut self, source: QuerySourceId, member: String, index: usize) {
        let key = (source, member);
        if let Some(entry) = self.member_items.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = index;
        } else {
            self.member_items.push((key, index));
        }
    }

    pub fn member_item(&self, source: QuerySourceId, member: &str) -> Option<usize> {
        self.member_items
            .iter()
            .find(|((s, m), _)| *s == source && m == member)
            .map(|(_, index)| *index)
    }

    /// Alias of the pattern bound to `source`, when one exists in this
    /// query.
    pub fn resolve_alias(&self, source: QuerySourceId) -> Option<&NodeAlias> {
        self.reading_clauses
            .iter()
            .find(|clause| clause.source == Some(source))
            .map(|clause| &clause.alias)
    }

    pub fn contains_alias(&self, alias: &NodeAlias) -> bool {
        self.reading_clauses
            .iter()
            .any(|clause| &clause.alias == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_model::Value;

    fn query() -> ReadOnlyQuery {
        ReadOnlyQuery::new(ReadingClause::new(
            vec!["Warehouse".to_string()],
            NodeAlias("w".to_string()),
            Some(QuerySourceId(0)),
        ))
    }

    fn property(alias: &str, property: &str) -> CypherExpr {
        CypherExpr::PropertyAccess(PropertyAccess {
            alias: NodeAlias(alias.to_string()),
            property: property.to_string(),
        })
    }

    #[test]
    fn return_items_are_append_only() {
        let mut q = query();
        let first = q
            .add_return_item(ReturnItem::new(property("w", "Location")))
            .unwrap();
        let second = q
            .add_return_item(ReturnItem::new(property("w", "Size")))
            .unwrap();
        assert_eq!((first, second), (0, 1));
        assert_eq!(q.return_items()[0].expression, property("w", "Location"));
    }

    #[test]
    fn closed_query_rejects_additions() {
        let mut q = query();
        q.begin_projection().unwrap();
        q.close();
        let err = q
            .add_return_item(ReturnItem::new(property("w", "Size")))
            .unwrap_err();
        assert_eq!(err, IrError::QueryClosed);
    }

    #[test]
    fn truncation_drops_member_mappings_past_cut() {
        let mut q = query();
        q.add_return_item(ReturnItem::new(property("w", "Location")))
            .unwrap();
        let idx = q
            .add_return_item(ReturnItem::new(property("w", "Size")))
            .unwrap();
        q.set_member_item(QuerySourceId(0), "Size".to_string(), idx);
        q.truncate_return_items(1);
        assert_eq!(q.return_items().len(), 1);
        assert_eq!(q.member_item(QuerySourceId(0), "Size"), None);
    }

    #[test]
    fn predicates_chain_with_and() {
        let mut q = query();
        q.and_where(CypherExpr::Literal(Value::Boolean(true)));
        q.and_where(CypherExpr::Literal(Value::Boolean(false)));
        let predicate = q.reading_clauses()[0].predicate.as_ref().unwrap();
        match predicate {
            CypherExpr::OperatorApplication(op) => {
                assert_eq!(op.operator, Operator::And);
                assert_eq!(op.operands.len(), 2);
            }
            other => panic!("expected AND chain, got {:?}", other),
        }
    }
}
