//! Statement cache behavior through the public API.

use std::collections::HashMap;

use graphlinq::cypher_generator::{generate, StatementCache};
use graphlinq::cypher_ir::{NodeAlias, ReadOnlyQuery, ReadingClause};
use graphlinq::query_model::QuerySourceId;

fn warehouse(alias: &str) -> ReadOnlyQuery {
    ReadOnlyQuery::new(ReadingClause::new(
        vec!["Warehouse".to_string()],
        NodeAlias(alias.to_string()),
        Some(QuerySourceId(0)),
    ))
}

#[test]
fn cache_round_trip_serves_generated_text() {
    let mut cache = StatementCache::new();
    let query = warehouse("w");

    let key = StatementCache::fingerprint(&query).unwrap();
    assert!(cache.get(&key).is_none());

    let statement = generate(&query, &HashMap::new()).unwrap();
    cache.insert(key.clone(), statement.clone());

    let cached = cache.get(&key).expect("entry just inserted");
    assert_eq!(cached, statement);
    assert_eq!(cache.stats(), (1, 1));
}

#[test]
fn structurally_different_queries_do_not_collide() {
    let a = StatementCache::fingerprint(&warehouse("w")).unwrap();
    let b = StatementCache::fingerprint(&warehouse("x")).unwrap();
    assert_ne!(a, b);
}

#[test]
fn regeneration_matches_cached_text() {
    let query = warehouse("w");
    let first = generate(&query, &HashMap::new()).unwrap();
    let second = generate(&query, &HashMap::new()).unwrap();
    assert_eq!(first, second);
}
