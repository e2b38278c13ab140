use std::collections::HashMap;

use crate::cypher_ir::{AliasAllocator, CypherExpr, NodeAlias, ReadOnlyQuery};
use crate::query_model::QuerySourceId;

/// Per-compilation state threaded through every component call.
///
/// Owns the alias set and the query-source → [`ReadOnlyQuery`] arena for
/// one compilation. Never shared across concurrent compilations; a nested
/// walker gets its own context holding a read-only snapshot of its
/// parent's, so lookups that miss locally defer upward without ever
/// writing through.
#[derive(Debug, Default)]
pub struct CompilationContext {
    aliases: AliasAllocator,
    queries: HashMap<QuerySourceId, ReadOnlyQuery>,
    /// Binding order of `queries`, for deterministic iteration.
    order: Vec<QuerySourceId>,
    parent: Option<Box<ParentScope>>,
}

/// Read-only view of an enclosing compilation's bindings.
#[derive(Debug)]
struct ParentScope {
    queries: HashMap<QuerySourceId, ReadOnlyQuery>,
    order: Vec<QuerySourceId>,
    parent: Option<Box<ParentScope>>,
}

impl ParentScope {
    fn snapshot(&self) -> ParentScope {
        ParentScope {
            queries: self.queries.clone(),
            order: self.order.clone(),
            parent: self.parent.as_ref().map(|p| Box::new(p.snapshot())),
        }
    }
}

impl CompilationContext {
    pub fn new() -> Self {
        CompilationContext::default()
    }

    /// Context for a nested query model. The parent's bindings are
    /// snapshotted for upward lookup; the nested compilation gets a fresh
    /// alias set and query arena of its own.
    pub fn nested(&self) -> Self {
        CompilationContext {
            aliases: AliasAllocator::new(),
            queries: HashMap::new(),
            order: Vec::new(),
            parent: Some(Box::new(self.snapshot())),
        }
    }

    fn snapshot(&self) -> ParentScope {
        ParentScope {
            queries: self.queries.clone(),
            order: self.order.clone(),
            parent: self.parent.as_ref().map(|p| Box::new(p.snapshot())),
        }
    }

    pub fn aliases_mut(&mut self) -> &mut AliasAllocator {
        &mut self.aliases
    }

    /// Bind a query source to a freshly created query.
    pub fn bind(&mut self, source: QuerySourceId, query: ReadOnlyQuery) {
        if self.queries.insert(source, query).is_none() {
            self.order.push(source);
        }
    }

    /// The query created for `source`, if the source was bound as a "from"
    /// origin. Returns `None` for unbound sources; callers must treat that
    /// as "no server-side representation".
    pub fn find(&self, source: QuerySourceId) -> Option<&ReadOnlyQuery> {
        self.queries.get(&source)
    }

    pub fn find_mut(&mut self, source: QuerySourceId) -> Option<&mut ReadOnlyQuery> {
        self.queries.get_mut(&source)
    }

    /// Key of the query whose patterns bind `source`. Join sources resolve
    /// to the query they were joined into rather than owning one.
    pub fn query_key_for(&self, source: QuerySourceId) -> Option<QuerySourceId> {
        self.order.iter().copied().find(|key| {
            self.queries
                .get(key)
                .map(|q| q.resolve_alias(source).is_some())
                .unwrap_or(false)
        })
    }

    /// Resolve `source` to the pattern bound for it: the owning query's
    /// key plus the pattern alias.
    pub fn resolve_pattern(&self, source: QuerySourceId) -> Option<(QuerySourceId, NodeAlias)> {
        for key in &self.order {
            if let Some(alias) = self
                .queries
                .get(key)
                .and_then(|q| q.resolve_alias(source))
            {
                return Some((*key, alias.clone()));
            }
        }
        None
    }

    /// Resolve `source` against enclosing compilations only (read-only
    /// upward lookup, never a write).
    pub fn resolve_pattern_in_parent(&self, source: QuerySourceId) -> Option<NodeAlias> {
        let mut scope = self.parent.as_deref();
        while let Some(parent) = scope {
            for key in &parent.order {
                if let Some(alias) = parent
                    .queries
                    .get(key)
                    .and_then(|q| q.resolve_alias(source))
                {
                    return Some(alias.clone());
                }
            }
            scope = parent.parent.as_deref();
        }
        None
    }

    /// Already-materialized return item backing `member` of `source`, in
    /// whichever query registered it.
    pub fn find_member_item(
        &self,
        source: QuerySourceId,
        member: &str,
    ) -> Option<(QuerySourceId, CypherExpr)> {
        for key in &self.order {
            let query = self.queries.get(key)?;
            if let Some(index) = query.member_item(source, member) {
                if let Some(item) = query.return_items().get(index) {
                    return Some((*key, item.expression.clone()));
                }
            }
        }
        None
    }

    /// Bound sources in binding order.
    pub fn bound_sources(&self) -> &[QuerySourceId] {
        &self.order
    }
}
