use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetadataError {
    #[error("Entity type '{0}' is not part of the graph model")]
    UnknownEntity(String),

    #[error("Entity type '{entity}' declares unknown base type '{base}'")]
    UnknownBaseType { entity: String, base: String },

    #[error("Entity type '{0}' participates in an inheritance cycle")]
    InheritanceCycle(String),

    #[error("Entity type '{0}' has no labels (a pattern cannot be matched for it)")]
    MissingLabels(String),
}
