//! Database kernel: request-scoped contexts, reentrant transaction scopes,
//! and the connection pool they run over.
//!
//! # Architecture
//!
//! The kernel follows these principles:
//!
//! - **The context carries the state**: nesting detection works by asking
//!   whether the current handle is already a transaction, so call signatures
//!   never thread depth counters or booleans around.
//! - **One query surface**: [`QueryExecutor`] is implemented by pooled
//!   connections and live transactions alike, so adapters never branch on
//!   which one they were handed.
//! - **Strongly typed errors**: driver failures surface as [`DbError`];
//!   transaction lifecycle failures as [`TransactionError`], which keeps the
//!   operation's own error inspectable even when a rollback fails on top.

mod config;
mod connection;
mod context;
mod pool;
mod transaction;

pub use config::DatabaseSettings;
pub use connection::{BindParam, Connection, DbError, QueryExecutor, Transaction};
pub use context::{DatabaseHandle, DbContext};
pub use pool::{DbPool, PoolConfig, PoolError};
pub use transaction::{TransactionError, with_transaction, with_transaction_returning};
