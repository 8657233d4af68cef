//! Error types for the core library.

use thiserror::Error;

use crate::attribute::AttributeId;
use crate::node_id::NodeId;
use crate::status::StatusCode;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading attributes or browsing references.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The call into the transport failed (connection, timeout, malformed
    /// response). Never retried here.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request went through but the item for `node` carries a bad status.
    #[error("{node}{}: {status}", attribute_suffix(.attribute))]
    Status {
        node: NodeId,
        /// `None` when the status came from a browse result.
        attribute: Option<AttributeId>,
        status: StatusCode,
    },

    /// A browse kept handing back continuation points past the page limit.
    #[error("{node}: continuation point still set after {pages} pages")]
    PaginationExhausted { node: NodeId, pages: usize },

    /// A value did not have the shape the accessor asked for.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A NodeId string did not follow the `ns=<n>;<t>=<v>` grammar.
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    /// The operation was cancelled through the client's cancel token.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Status code carried by the error, if it is a [`Error::Status`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn attribute_suffix(attribute: &Option<AttributeId>) -> String {
    attribute.map(|a| format!(" ({a})")).unwrap_or_default()
}
