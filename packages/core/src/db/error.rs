//! Node store error types

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the libsql node store
///
/// Consistency problems (unknown ids, duplicate inserts) are not store errors;
/// the service layer reports those. A write that matches no row is reported
/// as `WriteOutcome::MissingNode`, not as an error.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Cannot open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: libsql::Error,
    },

    #[error("Cannot create database directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Table, index or pragma setup failed
    #[error("Schema setup failed: {0}")]
    Schema(String),

    /// `BEGIN` or `COMMIT` failed; the batch was rolled back
    #[error("Transaction {stage} failed: {source}")]
    Transaction {
        stage: &'static str,
        source: libsql::Error,
    },

    /// Insert or update of one node row failed; the batch was rolled back
    #[error("Write to node {id} failed: {source}")]
    NodeWrite { id: i64, source: libsql::Error },

    #[error("Query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Libsql(#[from] libsql::Error),
}

impl DatabaseError {
    pub fn open(path: PathBuf, source: libsql::Error) -> Self {
        Self::Open { path, source }
    }

    pub fn directory(path: PathBuf, source: std::io::Error) -> Self {
        Self::Directory { path, source }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn transaction(stage: &'static str, source: libsql::Error) -> Self {
        Self::Transaction { stage, source }
    }

    pub fn node_write(id: i64, source: libsql::Error) -> Self {
        Self::NodeWrite { id, source }
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}
