//! Persistence adapters for the greeting ports.
//!
//! The database adapters are thin: they resolve whatever handle the context
//! currently exposes and translate [`DbError`](crate::db::DbError) into the
//! port's error type. Because the handle resolution goes through the
//! context, the same adapter code runs in auto-commit mode and inside a
//! transaction scope without branching.
//!
//! The in-memory repository serves demos and tests that want real adapter
//! behaviour without a database.

mod database_greeting_repository;
mod memory_greeting_repository;

pub use database_greeting_repository::{DatabaseGreetingReader, DatabaseGreetingWriter};
pub use memory_greeting_repository::MemoryGreetingRepository;
