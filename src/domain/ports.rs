//! Driven ports for the greeting feature.
//!
//! Ports describe how the domain expects to interact with driven adapters.
//! Each trait exposes strongly typed errors so adapters map their failures
//! into predictable variants. Every operation takes the request context;
//! adapters resolve the current database handle from it, which is what lets
//! a transaction scope interpose transparently.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::DbContext;

/// Errors surfaced by greeting repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GreetingRepositoryError {
    /// Database connectivity failures.
    #[error("greeting store connection failed: {message}")]
    Connection { message: String },

    /// Read or write query failures.
    #[error("greeting store query failed: {message}")]
    Query { message: String },

    /// The store holds no greetings at all.
    #[error("no greetings are available")]
    Empty,
}

impl GreetingRepositoryError {
    /// Helper for connection related adapter errors.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Reads the set of greeting prefixes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GreetingReader: Send + Sync {
    /// A random greeting prefix.
    async fn random_greeting(&self, ctx: &DbContext) -> Result<String, GreetingRepositoryError>;

    /// Every greeting prefix available.
    async fn list(&self, ctx: &DbContext) -> Result<Vec<String>, GreetingRepositoryError>;
}

/// Writes to the set of greeting prefixes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GreetingWriter: Send + Sync {
    /// Add a new greeting to the set.
    async fn add_greeting(
        &self,
        ctx: &DbContext,
        greeting: &str,
    ) -> Result<(), GreetingRepositoryError>;
}
