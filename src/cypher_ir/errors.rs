use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IrError {
    #[error("Return item added after the projection was closed")]
    QueryClosed,

    #[error("Projection begun twice for the same query")]
    ProjectionRestarted,
}
