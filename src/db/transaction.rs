//! Reentrant transaction scopes over the request context.
//!
//! [`with_transaction`] lets arbitrarily nested operations request "run this
//! inside a transaction" without knowing whether they are the outermost call.
//! The context itself carries the state: the first (owning) call begins a
//! transaction and finalizes it exactly once, nested calls observe the live
//! transaction already in place and reuse it, and mock contexts bypass the
//! machinery entirely so calling code can be exercised without a database.
//!
//! Nothing here retries; every failure surfaces to the immediate caller.
//! Cancellation is the driver's concern — if an in-flight query aborts, the
//! resulting error still routes through the rollback path.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use super::connection::{DbError, Transaction};
use super::context::{DatabaseHandle, DbContext};

/// Error returned from [`with_transaction`] and
/// [`with_transaction_returning`].
///
/// `E` is the operation's own error type. Lifecycle failures keep it
/// reachable through [`operation_error`](Self::operation_error) so callers
/// inspect causes structurally rather than by string matching.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError<E> {
    /// The driver could not open the transaction; the operation never ran.
    #[error("could not begin transaction: {0}")]
    Begin(#[source] DbError),

    /// The operation succeeded but the commit failed. The operation's result
    /// is discarded: its success is void once the commit fails.
    #[error("could not commit transaction: {0}")]
    Commit(#[source] DbError),

    /// The operation failed and the transaction rolled back cleanly; this is
    /// the operation's error, unchanged.
    #[error("{0}")]
    Operation(E),

    /// The operation failed and the rollback failed on top of it. Both
    /// causes are preserved.
    #[error("rollback failed after operation error ({operation}): {rollback}")]
    RollbackFailed {
        /// The error the operation returned.
        operation: E,
        /// The error the driver returned from the rollback attempt.
        #[source]
        rollback: DbError,
    },
}

impl<E> TransactionError<E> {
    /// The operation's own error, when one occurred.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(error) | Self::RollbackFailed {
                operation: error, ..
            } => Some(error),
            Self::Begin(_) | Self::Commit(_) => None,
        }
    }

    /// Consume the error, yielding the operation's own error when one
    /// occurred.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(error) | Self::RollbackFailed {
                operation: error, ..
            } => Some(error),
            Self::Begin(_) | Self::Commit(_) => None,
        }
    }

    /// The lifecycle failure reported by the driver, when one occurred.
    pub fn db_error(&self) -> Option<&DbError> {
        match self {
            Self::Begin(error)
            | Self::Commit(error)
            | Self::RollbackFailed {
                rollback: error, ..
            } => Some(error),
            Self::Operation(_) => None,
        }
    }
}

/// How the current call relates to the transaction lifecycle.
enum PreparedTransaction {
    /// Mock context: run the operation verbatim, no machinery engages.
    MockBypass,
    /// A transaction is already live: reuse it and leave finalization to
    /// its owner.
    Nested,
    /// This call opened the transaction and must commit or roll it back.
    Owning {
        derived: DbContext,
        transaction: Arc<dyn Transaction>,
    },
}

/// Inspect the context to decide the call's role, beginning a transaction
/// only for the owning call. This is what makes the scopes harmlessly
/// reentrant.
async fn prepare<E>(ctx: &DbContext) -> Result<PreparedTransaction, TransactionError<E>> {
    if ctx.is_mock() {
        return Ok(PreparedTransaction::MockBypass);
    }

    match ctx.resolve() {
        DatabaseHandle::Transaction(_) => Ok(PreparedTransaction::Nested),
        DatabaseHandle::Connection(connection) => {
            let transaction = connection
                .begin()
                .await
                .map_err(TransactionError::Begin)?;
            debug!("began database transaction");
            Ok(PreparedTransaction::Owning {
                derived: ctx.attach_transaction(Arc::clone(&transaction)),
                transaction,
            })
        }
    }
}

/// Finalize an owning call: commit on success, roll back on failure.
///
/// A commit failure replaces the operation's success. A rollback failure is
/// reported together with the operation error that triggered the rollback.
async fn finalize<T, E>(
    transaction: &Arc<dyn Transaction>,
    outcome: Result<T, E>,
) -> Result<T, TransactionError<E>> {
    match outcome {
        Ok(value) => match transaction.commit().await {
            Ok(()) => {
                debug!("committed database transaction");
                Ok(value)
            }
            Err(commit_error) => Err(TransactionError::Commit(commit_error)),
        },
        Err(operation_error) => match transaction.rollback().await {
            Ok(()) => {
                debug!("rolled back database transaction");
                Err(TransactionError::Operation(operation_error))
            }
            Err(rollback_error) => Err(TransactionError::RollbackFailed {
                operation: operation_error,
                rollback: rollback_error,
            }),
        },
    }
}

/// Run `operation` inside a database transaction, returning its value.
///
/// Safely reentrant: calling this inside another transaction scope reuses
/// the live transaction and performs no finalization of its own, so exactly
/// one begin and exactly one commit-or-rollback happen per owning call. On a
/// mock context the operation runs verbatim and no transaction machinery
/// engages.
///
/// # Errors
///
/// See [`TransactionError`] for the full taxonomy. The operation's own error
/// comes back as [`TransactionError::Operation`] after a clean rollback.
///
/// # Panics
///
/// Panics when the context has no database handle attached (a wiring
/// defect), matching [`DbContext::resolve`].
pub async fn with_transaction_returning<T, E, F, Fut>(
    ctx: &DbContext,
    operation: F,
) -> Result<T, TransactionError<E>>
where
    F: FnOnce(DbContext) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match prepare(ctx).await? {
        PreparedTransaction::MockBypass | PreparedTransaction::Nested => operation(ctx.clone())
            .await
            .map_err(TransactionError::Operation),
        PreparedTransaction::Owning {
            derived,
            transaction,
        } => {
            let outcome = operation(derived).await;
            finalize(&transaction, outcome).await
        }
    }
}

/// Run `operation` inside a database transaction.
///
/// The call shape for operations with no payload; lifecycle semantics are
/// identical to [`with_transaction_returning`].
///
/// # Errors
///
/// See [`TransactionError`].
pub async fn with_transaction<E, F, Fut>(
    ctx: &DbContext,
    operation: F,
) -> Result<(), TransactionError<E>>
where
    F: FnOnce(DbContext) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    with_transaction_returning(ctx, operation).await
}
