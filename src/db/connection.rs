//! Capability traits for the database handles carried by a
//! [`DbContext`](super::DbContext).
//!
//! The same query surface is available whether the current handle is a pooled
//! connection or an in-flight transaction, so callers never branch on which
//! one they hold. Connection providers implement [`Connection`] for their
//! pool handle and [`Transaction`] for the unit of work it opens.

use std::sync::Arc;

use async_trait::async_trait;

/// Errors surfaced by connection providers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// Failed to check out a connection from the pool.
    #[error("failed to check out a database connection: {message}")]
    Checkout { message: String },

    /// A query or statement failed to execute.
    #[error("database query failed: {message}")]
    Query { message: String },

    /// The driver could not open a transaction.
    #[error("failed to begin a database transaction: {message}")]
    Begin { message: String },

    /// The driver could not commit the current transaction.
    #[error("failed to commit the database transaction: {message}")]
    Commit { message: String },

    /// The driver could not roll back the current transaction.
    #[error("failed to roll back the database transaction: {message}")]
    Rollback { message: String },

    /// The transaction was already committed or rolled back.
    #[error("the transaction has already been finalized")]
    AlreadyFinalized,
}

impl DbError {
    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a begin-transaction error with the given message.
    pub fn begin(message: impl Into<String>) -> Self {
        Self::Begin {
            message: message.into(),
        }
    }

    /// Create a commit error with the given message.
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
        }
    }

    /// Create a rollback error with the given message.
    pub fn rollback(message: impl Into<String>) -> Self {
        Self::Rollback {
            message: message.into(),
        }
    }
}

/// Bind parameter for the pass-through query surface.
#[derive(Debug, Clone, PartialEq)]
pub enum BindParam {
    /// A text parameter.
    Text(String),
    /// A 64-bit integer parameter.
    Int(i64),
    /// A boolean parameter.
    Bool(bool),
}

impl From<&str> for BindParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for BindParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for BindParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// The query/execute surface shared by pooled connections and live
/// transactions.
///
/// Queries run in auto-commit mode on a bare connection and inside the
/// transaction on a transaction handle; the calling code is identical.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetch one text column from every matching row.
    ///
    /// The query must project a single text column aliased `value`, e.g.
    /// `select greeting_text as value from greetings`.
    async fn select_text(&self, query: &str, params: &[BindParam])
    -> Result<Vec<String>, DbError>;

    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, query: &str, params: &[BindParam]) -> Result<u64, DbError>;
}

/// A handle that can open transactions, typically the process-wide pool.
///
/// Many contexts may share one `Connection`; it is attached by reference and
/// is not itself transactional.
#[async_trait]
pub trait Connection: QueryExecutor {
    /// Begin a new transaction on this connection.
    ///
    /// The returned handle owns a dedicated link to the database until it is
    /// committed or rolled back.
    async fn begin(&self) -> Result<Arc<dyn Transaction>, DbError>;
}

/// A began-but-not-yet-finalized unit of database work.
///
/// Exactly one finalization (commit or rollback) is permitted; later calls
/// fail with [`DbError::AlreadyFinalized`].
#[async_trait]
pub trait Transaction: QueryExecutor {
    /// Commit the transaction, releasing its connection back to the pool.
    async fn commit(&self) -> Result<(), DbError>;

    /// Roll the transaction back, releasing its connection back to the pool.
    async fn rollback(&self) -> Result<(), DbError>;
}
