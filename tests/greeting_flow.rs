//! End-to-end wiring of the greeting service, the database adapters, and the
//! recording connection provider.
//!
//! These tests stand in for a request-handling layer: they attach a
//! connection to a fresh context per "request" and drive the service through
//! its public surface, asserting the transaction lifecycle from the outside.

use std::sync::Arc;
use std::sync::Once;

use tracing_subscriber::EnvFilter;
use txctx::db::{DbContext, TransactionError, with_transaction_returning};
use txctx::domain::{GreetingError, GreetingService};
use txctx::outbound::persistence::{DatabaseGreetingReader, DatabaseGreetingWriter};
use txctx::test_support::RecordingConnection;

static INIT_TRACING: Once = Once::new();

fn make_service() -> GreetingService<DatabaseGreetingReader, DatabaseGreetingWriter> {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
    GreetingService::new(
        Arc::new(DatabaseGreetingReader),
        Arc::new(DatabaseGreetingWriter),
    )
}

fn request_context(connection: &RecordingConnection) -> DbContext {
    DbContext::root().attach(Arc::new(connection.clone()))
}

#[tokio::test]
async fn add_then_greet_uses_one_transaction_per_add() {
    let connection = RecordingConnection::new();
    let log = connection.log();
    let service = make_service();

    let ctx = request_context(&connection);
    service
        .add_greeting(&ctx, "Ahoy")
        .await
        .expect("add succeeds");

    assert_eq!(log.begins(), 1);
    assert_eq!(log.commits(), 1);
    assert_eq!(log.rollbacks(), 0);

    // A later "request" sees the committed greeting.
    let greeting = service
        .give_greeting(&request_context(&connection), "Grace")
        .await
        .expect("greeting succeeds");
    assert_eq!(greeting, "Ahoy, Grace!");
}

#[tokio::test]
async fn duplicate_add_rolls_back_and_reports_already_exists() {
    let connection = RecordingConnection::new().with_rows(["Hello"]);
    let log = connection.log();
    let service = make_service();

    let error = service
        .add_greeting(&request_context(&connection), "Hello")
        .await
        .expect_err("duplicate is rejected");

    assert_eq!(
        error.into_operation_error(),
        Some(GreetingError::AlreadyExists {
            greeting: "Hello".to_owned()
        })
    );
    assert_eq!(log.begins(), 1);
    assert_eq!(log.commits(), 0);
    assert_eq!(log.rollbacks(), 1);
    assert_eq!(connection.rows(), vec!["Hello".to_owned()]);
}

#[tokio::test]
async fn service_call_nests_inside_an_outer_scope() {
    let connection = RecordingConnection::new();
    let log = connection.log();
    let service = Arc::new(make_service());
    let ctx = request_context(&connection);

    let added: Result<usize, TransactionError<GreetingError>> =
        with_transaction_returning(&ctx, |tx_ctx| {
            let service = Arc::clone(&service);
            async move {
                // The service's own transaction scope nests inside ours and
                // must not finalize anything.
                for greeting in ["Ahoy", "Salut"] {
                    service
                        .add_greeting(&tx_ctx, greeting)
                        .await
                        .map_err(|error| {
                            error.into_operation_error().unwrap_or_else(|| {
                                GreetingError::AlreadyExists {
                                    greeting: greeting.to_owned(),
                                }
                            })
                        })?;
                }
                Ok(2)
            }
        })
        .await;

    assert_eq!(added.expect("both adds succeed"), 2);
    assert_eq!(log.begins(), 1);
    assert_eq!(log.commits(), 1);
    assert_eq!(log.rollbacks(), 0);
    assert_eq!(
        connection.rows(),
        vec!["Ahoy".to_owned(), "Salut".to_owned()]
    );
}

#[tokio::test]
async fn commit_failure_voids_a_successful_add() {
    let connection = RecordingConnection::new().failing_commit();
    let service = make_service();

    let error = service
        .add_greeting(&request_context(&connection), "Doomed")
        .await
        .expect_err("commit failure surfaces");

    assert!(matches!(error, TransactionError::Commit(_)));
    assert!(connection.rows().is_empty());
}
