//! Greeting feature: core logic and the ports it drives.
//!
//! The domain never touches the database directly; it threads the
//! [`DbContext`](crate::db::DbContext) through its ports and wraps mutating
//! flows in a transaction scope, so adapters stay thin and the logic is
//! testable against mocks.

pub mod greeting;
pub mod ports;

pub use greeting::{GreetingError, GreetingService};
