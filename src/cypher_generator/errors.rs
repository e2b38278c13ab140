use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CypherGeneratorError {
    #[error("No value supplied for parameter '${0}'")]
    MissingParameterValue(String),

    #[error("Reading clause bound to alias '{0}' has no labels")]
    EmptyPatternLabels(String),

    #[error("Operator {0} applied to {1} operands")]
    OperandCountMismatch(String, usize),

    #[error("Failed to fingerprint query for caching: {0}")]
    Fingerprint(String),
}
