//! Statement generation: serializing a finished [`ReadOnlyQuery`] into
//! literal Cypher text plus an ordered parameter list.
//!
//! Generation is a pure function of the query; the [`StatementCache`]
//! exploits that determinism to skip regeneration for structurally equal
//! queries.
//!
//! [`ReadOnlyQuery`]: crate::cypher_ir::ReadOnlyQuery

pub mod errors;
pub mod statement_cache;
pub mod to_cypher;

pub use errors::CypherGeneratorError;
pub use statement_cache::StatementCache;
pub use to_cypher::{generate, GeneratedStatement, StatementParameter, ToCypher};
