//! Core business logic of the greeting feature.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::db::{DbContext, TransactionError, with_transaction};

use super::ports::{GreetingReader, GreetingRepositoryError, GreetingWriter};

/// Errors produced by the greeting service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GreetingError {
    /// The greeting is already present in the store.
    #[error("the greeting \"{greeting}\" already exists")]
    AlreadyExists { greeting: String },

    /// A repository failed underneath the service.
    #[error(transparent)]
    Repository(#[from] GreetingRepositoryError),
}

/// Core greeting logic, sitting between driving adapters and the repository
/// ports.
pub struct GreetingService<R, W> {
    reader: Arc<R>,
    writer: Arc<W>,
}

impl<R, W> GreetingService<R, W>
where
    R: GreetingReader,
    W: GreetingWriter,
{
    /// Create the service over the given reader and writer ports.
    pub fn new(reader: Arc<R>, writer: Arc<W>) -> Self {
        Self { reader, writer }
    }

    /// Produce a greeting addressed to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GreetingError::Repository`] when the reader fails.
    pub async fn give_greeting(
        &self,
        ctx: &DbContext,
        name: &str,
    ) -> Result<String, GreetingError> {
        let prefix = self.reader.random_greeting(ctx).await?;
        debug!(greeting = %prefix, "fetched a greeting");
        Ok(format!("{prefix}, {name}!"))
    }

    /// Add a new greeting to the set used by [`give_greeting`].
    ///
    /// The duplicate check and the insert run inside one transaction so
    /// concurrent adds cannot interleave between them. Callers already
    /// inside a transaction scope nest harmlessly.
    ///
    /// # Errors
    ///
    /// [`GreetingError::AlreadyExists`] for duplicates, surfaced through
    /// [`TransactionError::Operation`] after the rollback; transaction
    /// lifecycle failures per [`TransactionError`].
    ///
    /// [`give_greeting`]: Self::give_greeting
    pub async fn add_greeting(
        &self,
        ctx: &DbContext,
        new_greeting: &str,
    ) -> Result<(), TransactionError<GreetingError>> {
        let reader = Arc::clone(&self.reader);
        let writer = Arc::clone(&self.writer);
        let greeting = new_greeting.to_owned();

        with_transaction(ctx, move |tx_ctx| async move {
            let existing = reader.list(&tx_ctx).await.map_err(GreetingError::from)?;
            if existing.contains(&greeting) {
                return Err(GreetingError::AlreadyExists { greeting });
            }
            writer
                .add_greeting(&tx_ctx, &greeting)
                .await
                .map_err(GreetingError::from)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockGreetingReader, MockGreetingWriter};

    fn make_service(
        reader: MockGreetingReader,
        writer: MockGreetingWriter,
    ) -> GreetingService<MockGreetingReader, MockGreetingWriter> {
        GreetingService::new(Arc::new(reader), Arc::new(writer))
    }

    fn mock_ctx() -> DbContext {
        DbContext::root().derive_mock()
    }

    #[tokio::test]
    async fn give_greeting_formats_the_random_prefix() {
        let mut reader = MockGreetingReader::new();
        reader
            .expect_random_greeting()
            .times(1)
            .returning(|_| Ok("Howdy".to_owned()));

        let service = make_service(reader, MockGreetingWriter::new());
        let greeting = service
            .give_greeting(&mock_ctx(), "Ada")
            .await
            .expect("greeting succeeds");

        assert_eq!(greeting, "Howdy, Ada!");
    }

    #[tokio::test]
    async fn give_greeting_surfaces_reader_failures() {
        let mut reader = MockGreetingReader::new();
        reader
            .expect_random_greeting()
            .times(1)
            .returning(|_| Err(GreetingRepositoryError::query("boom")));

        let service = make_service(reader, MockGreetingWriter::new());
        let error = service
            .give_greeting(&mock_ctx(), "Ada")
            .await
            .expect_err("reader failure surfaces");

        assert!(matches!(error, GreetingError::Repository(_)));
    }

    #[tokio::test]
    async fn add_greeting_inserts_when_new() {
        let mut reader = MockGreetingReader::new();
        reader
            .expect_list()
            .times(1)
            .returning(|_| Ok(vec!["Hello".to_owned()]));
        let mut writer = MockGreetingWriter::new();
        writer
            .expect_add_greeting()
            .times(1)
            .withf(|_, greeting| greeting == "Bonjour")
            .returning(|_, _| Ok(()));

        let service = make_service(reader, writer);
        service
            .add_greeting(&mock_ctx(), "Bonjour")
            .await
            .expect("add succeeds");
    }

    #[tokio::test]
    async fn add_greeting_rejects_duplicates_without_writing() {
        let mut reader = MockGreetingReader::new();
        reader
            .expect_list()
            .times(1)
            .returning(|_| Ok(vec!["Hello".to_owned()]));
        let writer = MockGreetingWriter::new();

        let service = make_service(reader, writer);
        let error = service
            .add_greeting(&mock_ctx(), "Hello")
            .await
            .expect_err("duplicate is rejected");

        assert_eq!(
            error.into_operation_error(),
            Some(GreetingError::AlreadyExists {
                greeting: "Hello".to_owned()
            })
        );
    }
}
