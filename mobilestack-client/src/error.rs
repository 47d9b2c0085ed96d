//! Client error types.
//!
//! Every failure surfaces as a [`ClientError`], whether it is returned from a
//! blocking call or handed to an async completion callback.

use mobilestack_model::{MappingError, SchemaError};
use std::fmt;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for query-builder configuration.
pub type QueryResult<T> = Result<T, QueryError>;

/// The table operations a client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Select,
}

impl Operation {
    /// The only status code that counts as success for this operation.
    pub const fn expected_status(self) -> u16 {
        match self {
            Operation::Insert => 201,
            Operation::Update => 200,
            Operation::Delete => 204,
            Operation::Select => 200,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Select => "select",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflicting or invalid query-builder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("value for top has already been set to {0}")]
    TopAlreadySet(u32),

    #[error("value for skip has already been set to {0}")]
    SkipAlreadySet(u32),

    #[error("value for {0} has already been set")]
    OrderAlreadySet(&'static str),

    #[error("cannot use both orderby and orderby desc in a single query")]
    MixedOrdering,

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
}

/// Failures of the raw HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A table operation that reached (or tried to reach) the server and failed.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("{operation} failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("{operation} failed, status code: {status}")]
    UnexpectedStatus {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{operation} returned a malformed response: {detail}")]
    MalformedResponse {
        operation: Operation,
        status: u16,
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{operation} was abandoned before completing: {reason}")]
    Abandoned { operation: Operation, reason: String },
}

impl OperationError {
    pub fn operation(&self) -> Operation {
        match self {
            OperationError::Transport { operation, .. }
            | OperationError::UnexpectedStatus { operation, .. }
            | OperationError::MalformedResponse { operation, .. }
            | OperationError::Abandoned { operation, .. } => *operation,
        }
    }

    /// The status code the server answered with, when one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            OperationError::UnexpectedStatus { status, .. }
            | OperationError::MalformedResponse { status, .. } => Some(*status),
            OperationError::Transport { source, .. } => match source {
                TransportError::Http(e) => e.status().map(|s| s.as_u16()),
                TransportError::Unavailable(_) => None,
            },
            OperationError::Abandoned { .. } => None,
        }
    }

    pub(crate) fn malformed(
        operation: Operation,
        status: u16,
        detail: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        OperationError::MalformedResponse {
            operation,
            status,
            detail: detail.into(),
            source,
        }
    }
}

/// Failures completing a provider login.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login was rejected: {0}")]
    Rejected(String),

    #[error("login redirect carries neither a token nor an error")]
    Incomplete,

    #[error("login redirect is not valid UTF-8 after decoding: {0}")]
    MalformedRedirect(String),

    #[error("error deserializing user object: {0}")]
    MalformedUser(#[from] serde_json::Error),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    Query,
    Mapping,
    Operation,
    Auth,
    Config,
}

/// Any failure raised by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[source] std::io::Error),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Schema(_) => ErrorKind::Schema,
            ClientError::Query(_) => ErrorKind::Query,
            ClientError::Mapping(_) => ErrorKind::Mapping,
            ClientError::Operation(_) => ErrorKind::Operation,
            ClientError::Auth(_) => ErrorKind::Auth,
            ClientError::Config(_) | ClientError::WorkerPool(_) => ErrorKind::Config,
        }
    }

    /// Observed HTTP status, for operation errors that got a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Operation(e) => e.status(),
            _ => None,
        }
    }
}
