//! Database-backed greeting adapters.
//!
//! Both adapters resolve their handle from the context at call time, so they
//! participate in whatever transaction the caller's scope opened.

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::db::{BindParam, DbContext, DbError, QueryExecutor};
use crate::domain::ports::{GreetingReader, GreetingRepositoryError, GreetingWriter};

const LIST_GREETINGS_SQL: &str = "select greeting_text as value from greetings";
const INSERT_GREETING_SQL: &str = "insert into greetings (greeting_text) values ($1)";

fn map_db_error(error: DbError) -> GreetingRepositoryError {
    match error {
        DbError::Checkout { message } => GreetingRepositoryError::connection(message),
        other => GreetingRepositoryError::query(other.to_string()),
    }
}

/// Reads greetings through the handle the context currently exposes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DatabaseGreetingReader;

#[async_trait]
impl GreetingReader for DatabaseGreetingReader {
    async fn random_greeting(&self, ctx: &DbContext) -> Result<String, GreetingRepositoryError> {
        let mut greetings = self.list(ctx).await?;
        if greetings.is_empty() {
            return Err(GreetingRepositoryError::Empty);
        }
        let index = SmallRng::from_entropy().gen_range(0..greetings.len());
        Ok(greetings.swap_remove(index))
    }

    async fn list(&self, ctx: &DbContext) -> Result<Vec<String>, GreetingRepositoryError> {
        ctx.resolve()
            .select_text(LIST_GREETINGS_SQL, &[])
            .await
            .map_err(map_db_error)
    }
}

/// Writes greetings through the handle the context currently exposes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DatabaseGreetingWriter;

#[async_trait]
impl GreetingWriter for DatabaseGreetingWriter {
    async fn add_greeting(
        &self,
        ctx: &DbContext,
        greeting: &str,
    ) -> Result<(), GreetingRepositoryError> {
        let affected = ctx
            .resolve()
            .execute(INSERT_GREETING_SQL, &[BindParam::from(greeting)])
            .await
            .map_err(map_db_error)?;
        debug!(affected, greeting, "inserted greeting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::{TransactionError, with_transaction};
    use crate::test_support::RecordingConnection;

    fn context_over(connection: &RecordingConnection) -> DbContext {
        DbContext::root().attach(Arc::new(connection.clone()))
    }

    #[tokio::test]
    async fn list_reads_through_the_attached_connection() {
        let connection = RecordingConnection::new().with_rows(["Hello", "Bonjour"]);
        let ctx = context_over(&connection);

        let greetings = DatabaseGreetingReader
            .list(&ctx)
            .await
            .expect("list succeeds");
        assert_eq!(greetings, vec!["Hello".to_owned(), "Bonjour".to_owned()]);
    }

    #[tokio::test]
    async fn random_greeting_comes_from_the_stored_set() {
        let connection = RecordingConnection::new().with_rows(["Hola"]);
        let ctx = context_over(&connection);

        let greeting = DatabaseGreetingReader
            .random_greeting(&ctx)
            .await
            .expect("random greeting succeeds");
        assert_eq!(greeting, "Hola");
    }

    #[tokio::test]
    async fn random_greeting_on_an_empty_table_reports_empty() {
        let connection = RecordingConnection::new();
        let ctx = context_over(&connection);

        let error = DatabaseGreetingReader
            .random_greeting(&ctx)
            .await
            .expect_err("empty table is an error");
        assert_eq!(error, GreetingRepositoryError::Empty);
    }

    #[tokio::test]
    async fn writes_inside_a_scope_land_after_the_commit() {
        let connection = RecordingConnection::new();
        let ctx = context_over(&connection);

        let result: Result<(), TransactionError<GreetingRepositoryError>> =
            with_transaction(&ctx, |tx_ctx| async move {
                DatabaseGreetingWriter
                    .add_greeting(&tx_ctx, "Howdy-do")
                    .await?;
                // Inside the scope the staged row is already visible.
                let seen = DatabaseGreetingReader.list(&tx_ctx).await?;
                assert_eq!(seen, vec!["Howdy-do".to_owned()]);
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(connection.rows(), vec!["Howdy-do".to_owned()]);
    }
}
