//! Reentrant database transaction scopes threaded through a request-scoped
//! context, plus the sample greeting feature that exercises them end to end.
//!
//! The crate is organised hexagonally:
//!
//! - [`db`] is the database kernel: the [`db::DbContext`] handle carried down
//!   a call chain, the [`db::with_transaction`] scope that makes nested
//!   transactional calls harmless, and the Diesel-backed connection provider.
//! - [`domain`] holds the greeting feature's core logic and its driven ports.
//! - [`outbound`] holds the adapters implementing those ports, either against
//!   the database handle resolved from the context or in memory.
//!
//! There is no inbound surface here; a web layer would attach the pool to a
//! context per request and hand the context down.

pub mod db;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
