use thiserror::Error;

use crate::cypher_ir::IrError;
use crate::metadata::MetadataError;

/// Failure taxonomy of the translation pipeline.
///
/// Unsupported constructs and binding failures are recoverable: the walker
/// falls back to client-side evaluation of the offending sub-expression
/// and the result stays correct, just less efficient. Everything else
/// aborts the compilation; a statement is either fully valid or never
/// produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Unsupported expression for graph translation: {0}")]
    UnsupportedExpression(String),

    #[error("Member '{member}' cannot be bound to any pattern or prior return item in scope")]
    UnboundMember { member: String },

    #[error("Query source '{0}' has no server-side representation")]
    UnboundQuerySource(String),

    #[error("Internal translation invariant violated: {0}")]
    Internal(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Ir(#[from] IrError),
}

impl TranslationError {
    /// Whether the caller may recover by evaluating the sub-expression
    /// client-side instead of aborting the compilation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TranslationError::UnsupportedExpression(_)
                | TranslationError::UnboundMember { .. }
                | TranslationError::UnboundQuerySource(_)
        )
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        TranslationError::UnsupportedExpression(what.into())
    }
}
