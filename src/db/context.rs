//! Request-scoped database context.
//!
//! A [`DbContext`] is an immutable chain of frames: each derivation returns a
//! new handle referencing its parent, and lookups walk the chain so the
//! nearest enclosing value wins. A request-handling layer attaches the pool
//! once at the edge; everything below resolves the current handle from the
//! context instead of being handed a connection explicitly.
//!
//! At most one handle is exposed at a time. A live transaction always sits
//! nearer than the connection it was opened from, so it takes precedence when
//! resolving.

use std::sync::Arc;

use async_trait::async_trait;

use super::connection::{BindParam, Connection, DbError, QueryExecutor, Transaction};

/// The database handle currently exposed by a context.
#[derive(Clone)]
pub enum DatabaseHandle {
    /// A pooled connection; queries run in auto-commit mode.
    Connection(Arc<dyn Connection>),
    /// A live transaction opened by an enclosing transaction scope.
    Transaction(Arc<dyn Transaction>),
}

impl DatabaseHandle {
    /// True when the handle is a live transaction.
    #[must_use]
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }
}

#[async_trait]
impl QueryExecutor for DatabaseHandle {
    async fn select_text(
        &self,
        query: &str,
        params: &[BindParam],
    ) -> Result<Vec<String>, DbError> {
        match self {
            Self::Connection(connection) => connection.select_text(query, params).await,
            Self::Transaction(transaction) => transaction.select_text(query, params).await,
        }
    }

    async fn execute(&self, query: &str, params: &[BindParam]) -> Result<u64, DbError> {
        match self {
            Self::Connection(connection) => connection.execute(query, params).await,
            Self::Transaction(transaction) => transaction.execute(query, params).await,
        }
    }
}

enum Frame {
    Root,
    Mock,
    Connection(Arc<dyn Connection>),
    Transaction(Arc<dyn Transaction>),
}

struct ContextInner {
    parent: Option<Arc<ContextInner>>,
    frame: Frame,
}

/// Immutable, chained context carrying the current database handle down a
/// call chain.
///
/// Cloning is cheap (a single `Arc` bump) and every derivation leaves the
/// parent untouched, so independent chains never observe each other's
/// attachments.
#[derive(Clone)]
pub struct DbContext {
    inner: Arc<ContextInner>,
}

impl Default for DbContext {
    fn default() -> Self {
        Self::root()
    }
}

impl DbContext {
    /// A context with no database handle attached.
    #[must_use]
    pub fn root() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                parent: None,
                frame: Frame::Root,
            }),
        }
    }

    fn derive(&self, frame: Frame) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                parent: Some(Arc::clone(&self.inner)),
                frame,
            }),
        }
    }

    /// Derive a context exposing `connection` as the current database handle.
    ///
    /// Attachment is idempotent: if the chain already exposes a handle the
    /// context comes back unchanged, so an enclosing attachment is never
    /// shadowed.
    #[must_use]
    pub fn attach(&self, connection: Arc<dyn Connection>) -> Self {
        if self.lookup_handle().is_some() {
            return self.clone();
        }
        self.derive(Frame::Connection(connection))
    }

    /// Derive a context flagged as a mock context.
    ///
    /// Transaction scopes run their operation verbatim on a mock context; no
    /// begin, commit, or rollback ever happens. Every context derived from a
    /// mock context inherits the flag.
    #[must_use]
    pub fn derive_mock(&self) -> Self {
        self.derive(Frame::Mock)
    }

    /// True when some enclosing derivation flagged this chain as a mock
    /// context.
    #[must_use]
    pub fn is_mock(&self) -> bool {
        let mut cursor = Some(&self.inner);
        while let Some(inner) = cursor {
            if matches!(inner.frame, Frame::Mock) {
                return true;
            }
            cursor = inner.parent.as_ref();
        }
        false
    }

    /// Expose a live transaction to the chain. Only the transaction scope
    /// derives these frames; nested scopes observe them via [`resolve`].
    ///
    /// [`resolve`]: Self::resolve
    pub(crate) fn attach_transaction(&self, transaction: Arc<dyn Transaction>) -> Self {
        self.derive(Frame::Transaction(transaction))
    }

    fn lookup_transaction(&self) -> Option<Arc<dyn Transaction>> {
        let mut cursor = Some(&self.inner);
        while let Some(inner) = cursor {
            if let Frame::Transaction(transaction) = &inner.frame {
                return Some(Arc::clone(transaction));
            }
            cursor = inner.parent.as_ref();
        }
        None
    }

    fn lookup_connection(&self) -> Option<Arc<dyn Connection>> {
        let mut cursor = Some(&self.inner);
        while let Some(inner) = cursor {
            if let Frame::Connection(connection) = &inner.frame {
                return Some(Arc::clone(connection));
            }
            cursor = inner.parent.as_ref();
        }
        None
    }

    fn lookup_handle(&self) -> Option<DatabaseHandle> {
        if let Some(transaction) = self.lookup_transaction() {
            return Some(DatabaseHandle::Transaction(transaction));
        }
        self.lookup_connection().map(DatabaseHandle::Connection)
    }

    /// Resolve the current database handle: the live transaction if one is
    /// in flight, otherwise the attached connection.
    ///
    /// # Panics
    ///
    /// Panics when no handle was ever attached. That is a wiring defect in
    /// whatever layer owns the edge of the call chain, not a runtime
    /// condition callers should handle.
    #[must_use]
    pub fn resolve(&self) -> DatabaseHandle {
        self.lookup_handle().unwrap_or_else(|| {
            panic!(
                "no database connection attached to the context; \
                 attach a pool at the edge of the call chain before running queries"
            )
        })
    }
}
