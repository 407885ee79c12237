//! Test utilities for the crate.
//!
//! This module provides in-memory stand-ins for the connection provider so
//! transaction machinery can be exercised without a database. It is compiled
//! for unit tests and, behind the `test-support` feature, for integration
//! tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::db::{BindParam, Connection, DbError, QueryExecutor, Transaction};

/// Lifecycle counters recorded by a [`RecordingConnection`] and the
/// transactions it opens.
#[derive(Debug, Default)]
pub struct TransactionLog {
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl TransactionLog {
    /// Number of transactions begun.
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Number of commit attempts, successful or not.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of rollback attempts, successful or not.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    log: Arc<TransactionLog>,
    rows: Mutex<Vec<String>>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
}

fn first_text_param(params: &[BindParam]) -> Option<String> {
    params.iter().find_map(|param| match param {
        BindParam::Text(value) => Some(value.clone()),
        _ => None,
    })
}

/// In-memory connection that records lifecycle calls and serves a single
/// string table, with switchable failures for begin, commit, and rollback.
///
/// `select_text` returns every row regardless of the SQL text; `execute`
/// appends its first text parameter as a new row. Writes made inside a
/// transaction stay staged until the commit, so tests can assert that a
/// rollback really discarded them.
///
/// Clones share state, so a test can keep one handle for assertions while
/// another travels inside a context.
#[derive(Clone, Default)]
pub struct RecordingConnection {
    state: Arc<RecordingState>,
}

impl RecordingConnection {
    /// A connection with an empty table and no failures armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table with the given rows.
    #[must_use]
    pub fn with_rows<I, S>(self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut table = self.state.rows.lock().expect("rows mutex poisoned");
            table.extend(rows.into_iter().map(Into::into));
        }
        self
    }

    /// Arm a failure on the next (and every) begin.
    #[must_use]
    pub fn failing_begin(self) -> Self {
        self.state.fail_begin.store(true, Ordering::SeqCst);
        self
    }

    /// Arm a failure on the next (and every) commit.
    #[must_use]
    pub fn failing_commit(self) -> Self {
        self.state.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    /// Arm a failure on the next (and every) rollback.
    #[must_use]
    pub fn failing_rollback(self) -> Self {
        self.state.fail_rollback.store(true, Ordering::SeqCst);
        self
    }

    /// Shared handle to the lifecycle counters.
    #[must_use]
    pub fn log(&self) -> Arc<TransactionLog> {
        Arc::clone(&self.state.log)
    }

    /// The committed rows currently in the table.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.state.rows.lock().expect("rows mutex poisoned").clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingConnection {
    async fn select_text(
        &self,
        _query: &str,
        _params: &[BindParam],
    ) -> Result<Vec<String>, DbError> {
        Ok(self.rows())
    }

    async fn execute(&self, _query: &str, params: &[BindParam]) -> Result<u64, DbError> {
        let Some(value) = first_text_param(params) else {
            return Err(DbError::query("recording execute expects a text parameter"));
        };
        self.state
            .rows
            .lock()
            .expect("rows mutex poisoned")
            .push(value);
        Ok(1)
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn begin(&self) -> Result<Arc<dyn Transaction>, DbError> {
        if self.state.fail_begin.load(Ordering::SeqCst) {
            return Err(DbError::begin("injected begin failure"));
        }
        self.state.log.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingTransaction {
            state: Arc::clone(&self.state),
            staged: Mutex::new(Vec::new()),
            finalized: AtomicBool::new(false),
        }))
    }
}

/// Transaction opened by a [`RecordingConnection`]: stages writes until the
/// commit merges them into the table.
pub struct RecordingTransaction {
    state: Arc<RecordingState>,
    staged: Mutex<Vec<String>>,
    finalized: AtomicBool,
}

impl RecordingTransaction {
    fn mark_finalized(&self) -> Result<(), DbError> {
        if self.finalized.swap(true, Ordering::SeqCst) {
            return Err(DbError::AlreadyFinalized);
        }
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for RecordingTransaction {
    async fn select_text(
        &self,
        _query: &str,
        _params: &[BindParam],
    ) -> Result<Vec<String>, DbError> {
        let mut rows = self
            .state
            .rows
            .lock()
            .expect("rows mutex poisoned")
            .clone();
        rows.extend(
            self.staged
                .lock()
                .expect("staged mutex poisoned")
                .iter()
                .cloned(),
        );
        Ok(rows)
    }

    async fn execute(&self, _query: &str, params: &[BindParam]) -> Result<u64, DbError> {
        if self.finalized.load(Ordering::SeqCst) {
            return Err(DbError::AlreadyFinalized);
        }
        let Some(value) = first_text_param(params) else {
            return Err(DbError::query("recording execute expects a text parameter"));
        };
        self.staged
            .lock()
            .expect("staged mutex poisoned")
            .push(value);
        Ok(1)
    }
}

#[async_trait]
impl Transaction for RecordingTransaction {
    async fn commit(&self) -> Result<(), DbError> {
        self.mark_finalized()?;
        self.state.log.commits.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_commit.load(Ordering::SeqCst) {
            return Err(DbError::commit("injected commit failure"));
        }
        let staged = std::mem::take(&mut *self.staged.lock().expect("staged mutex poisoned"));
        self.state
            .rows
            .lock()
            .expect("rows mutex poisoned")
            .extend(staged);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbError> {
        self.mark_finalized()?;
        self.state.log.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_rollback.load(Ordering::SeqCst) {
            return Err(DbError::rollback("injected rollback failure"));
        }
        self.staged.lock().expect("staged mutex poisoned").clear();
        Ok(())
    }
}
