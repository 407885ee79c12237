//! In-memory greeting repository for demos and tests without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::db::DbContext;
use crate::domain::ports::{GreetingReader, GreetingRepositoryError, GreetingWriter};

const DEFAULT_GREETINGS: &[&str] = &["Hello", "Bonjour", "Hola", "Howdy", "Greetings", "Howdy-do"];

/// Greeting reader and writer over an in-process list.
///
/// Ignores the context's database handle entirely; the context still flows
/// through so the repository is a drop-in replacement for the database
/// adapters.
pub struct MemoryGreetingRepository {
    greetings: Mutex<Vec<String>>,
}

impl Default for MemoryGreetingRepository {
    fn default() -> Self {
        Self::with_greetings(DEFAULT_GREETINGS.iter().copied())
    }
}

impl MemoryGreetingRepository {
    /// A repository seeded with the stock greeting list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository seeded with the given greetings.
    pub fn with_greetings<I, S>(greetings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            greetings: Mutex::new(greetings.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl GreetingReader for MemoryGreetingRepository {
    async fn random_greeting(&self, _ctx: &DbContext) -> Result<String, GreetingRepositoryError> {
        let greetings = self.greetings.lock().expect("greetings mutex poisoned");
        if greetings.is_empty() {
            return Err(GreetingRepositoryError::Empty);
        }
        let index = SmallRng::from_entropy().gen_range(0..greetings.len());
        Ok(greetings[index].clone())
    }

    async fn list(&self, _ctx: &DbContext) -> Result<Vec<String>, GreetingRepositoryError> {
        Ok(self
            .greetings
            .lock()
            .expect("greetings mutex poisoned")
            .clone())
    }
}

#[async_trait]
impl GreetingWriter for MemoryGreetingRepository {
    async fn add_greeting(
        &self,
        _ctx: &DbContext,
        greeting: &str,
    ) -> Result<(), GreetingRepositoryError> {
        self.greetings
            .lock()
            .expect("greetings mutex poisoned")
            .push(greeting.to_owned());
        Ok(())
    }
}
