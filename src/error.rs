//! Error types for scriptql.

use thiserror::Error;

use crate::ast::NodeId;

/// The main error type for transpilation.
///
/// Every variant is terminal: the whole transpile call is aborted and no
/// partial script is returned to the caller.
#[derive(Debug, Error)]
pub enum TranspileError {
    /// Unresolved identifier, forbidden DML target or missing binding.
    #[error("Binding error: {message}")]
    Binding {
        message: String,
        node: Option<NodeId>,
    },

    /// Missing index or unsupported physical column type.
    #[error("Schema error: {message}")]
    Schema {
        message: String,
        node: Option<NodeId>,
    },

    /// Malformed statement shape or unknown function.
    #[error("Statement error: {message}")]
    Statement {
        message: String,
        node: Option<NodeId>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error taxonomy exposed to callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Binding,
    Schema,
    Statement,
    Config,
    Io,
}

impl TranspileError {
    /// Create a binding error attached to a node.
    pub fn binding(node: impl Into<Option<NodeId>>, message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
            node: node.into(),
        }
    }

    /// Create a schema error attached to a node.
    pub fn schema(node: impl Into<Option<NodeId>>, message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            node: node.into(),
        }
    }

    /// Create a statement error attached to a node.
    pub fn statement(node: impl Into<Option<NodeId>>, message: impl Into<String>) -> Self {
        Self::Statement {
            message: message.into(),
            node: node.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Binding { .. } => ErrorKind::Binding,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Statement { .. } => ErrorKind::Statement,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// The offending syntax node, when the error is tied to one.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Binding { node, .. } | Self::Schema { node, .. } | Self::Statement { node, .. } => {
                *node
            }
            Self::Config(_) | Self::Io(_) => None,
        }
    }
}

/// Result type alias for transpiler operations.
pub type TranspileResult<T> = Result<T, TranspileError>;
