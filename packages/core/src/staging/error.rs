//! Staging and transport error types

use thiserror::Error;

/// Misuse of the staging cache or editor session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StagingError {
    #[error("Node {id} is not staged")]
    UnknownNode { id: i64 },

    /// New nodes cannot be created under a node that is (or will be) removed
    #[error("Cannot add a child under removed node {id}")]
    ParentRemoved { id: i64 },

    #[error("No node is focused")]
    NoFocusedNode,
}

impl StagingError {
    pub fn unknown_node(id: i64) -> Self {
        Self::UnknownNode { id }
    }
}

/// Failures talking to the tree server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, decode)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with an error status
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Node not found: {id}")]
    NotFound { id: i64 },
}

impl ApiError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }
}

/// Errors surfaced by `EditorSession`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
