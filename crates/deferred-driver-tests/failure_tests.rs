//! Failure handling tests.
//!
//! Registration errors must surface before any database work, and a failed
//! batch must leave every placeholder of the batch unpopulated.

use crate::fixtures::{Customer, TestDatabase, sakila};
use anyhow::Result;
use deferred_query::{
    DeferredContext, DeferredError, DeferredOptions, FutureQuery, ParamType, SelectQuery,
    SqlCommand, SqlParameter,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// A context whose database cannot be opened
fn unreachable_context(sakila: &TestDatabase) -> Result<DeferredContext> {
    let path = sakila.dir().join("missing").join("nowhere.db");
    Ok(DeferredContext::new(&format!("sqlite://{}", path.display()))?)
}

/// Nothing pending means no connection is opened, so even an unreachable
/// database executes cleanly, any number of times
#[rstest]
#[tokio::test]
async fn test_empty_execute_is_idempotent(sakila: TestDatabase) -> Result<()> {
    let mut ctx = unreachable_context(&sakila)?;

    ctx.execute().await?;
    ctx.execute().await?;

    assert_eq!(ctx.pending_count(), 0);
    Ok(())
}

/// Unsupported parameter types are rejected by the registering call
#[rstest]
#[tokio::test]
async fn test_unsupported_parameter_type(sakila: TestDatabase) -> Result<()> {
    let mut ctx = unreachable_context(&sakila)?;

    let query = SelectQuery::table("customer")
        .filter("customer_id = @id")
        .bind(SqlParameter::new(
            "@id",
            ParamType::UniqueIdentifier,
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
        ));
    let err = ctx.register_many::<Customer, _>(&query).unwrap_err();

    assert!(matches!(
        err,
        DeferredError::UnsupportedParameterType {
            param_type: ParamType::UniqueIdentifier,
            ..
        }
    ));
    assert!(err.to_string().contains("67e55044-10b1-426f-9247-bb680e5fe0c8"));
    assert_eq!(ctx.pending_count(), 0);

    // would fail to connect if anything had been queued
    ctx.execute().await?;
    Ok(())
}

/// Reading a placeholder before its batch runs is an error
#[rstest]
#[tokio::test]
async fn test_premature_read(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let customers: FutureQuery<Customer> = ctx.register_many(&SelectQuery::table("customer"))?;
    let count = ctx.register_count(&SelectQuery::table("customer"))?;

    assert!(matches!(
        customers.items(),
        Err(DeferredError::PrematureRead(_))
    ));
    assert!(matches!(count.value(), Err(DeferredError::PrematureRead(_))));

    ctx.execute().await?;
    assert_eq!(customers.items()?.len(), 5);
    Ok(())
}

/// A failing statement aborts the whole batch and keeps it pending
#[rstest]
#[tokio::test]
async fn test_failed_batch_populates_nothing(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let customers: FutureQuery<Customer> = ctx.register_many(&SelectQuery::table("customer"))?;
    let broken: FutureQuery<i64> = ctx.register_many(&SqlCommand::new("SELECT id FROM rental"))?;

    let err = ctx.execute().await.unwrap_err();
    assert!(matches!(err, DeferredError::Execution(_)));
    assert!(!customers.has_value());
    assert!(!broken.has_value());

    assert_eq!(
        ctx.pending_sql(),
        vec!["SELECT *\nFROM customer", "SELECT id FROM rental"]
    );

    ctx.clear();
    ctx.execute().await?;
    assert!(!customers.has_value());
    Ok(())
}

/// A value that cannot be converted fails the batch after the query ran
#[rstest]
#[tokio::test]
async fn test_conversion_failure(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let ids: FutureQuery<i64> =
        ctx.register_many(&SelectQuery::table("customer").columns(["customer_id"]))?;
    let names: FutureQuery<i64> =
        ctx.register_many(&SelectQuery::table("customer").columns(["first_name"]))?;

    let err = ctx.execute().await.unwrap_err();
    assert!(matches!(
        err,
        DeferredError::Conversion { ref column, .. } if column == "first_name"
    ));
    assert!(!ids.has_value());
    assert!(!names.has_value());
    Ok(())
}

/// Connection failures surface from execute and keep the batch pending
#[rstest]
#[tokio::test]
async fn test_connection_failure(sakila: TestDatabase) -> Result<()> {
    let mut ctx = unreachable_context(&sakila)?;

    let customers: FutureQuery<Customer> = ctx.register_many(&SelectQuery::table("customer"))?;
    let err = ctx.execute().await.unwrap_err();

    assert!(matches!(err, DeferredError::Execution(_)));
    assert!(!customers.has_value());
    assert_eq!(ctx.pending_count(), 1);
    Ok(())
}

/// Options loaded from configuration can drop a failed batch
#[rstest]
#[tokio::test]
async fn test_clear_on_failure_from_config(sakila: TestDatabase) -> Result<()> {
    let options: DeferredOptions = serde_json::from_str(r#"{ "clear_on_failure": true }"#)?;
    assert_eq!(options.statement_separator, ";\n\n");

    let mut ctx = sakila.context_with(options)?;
    ctx.register_many::<i64, _>("SELECT id FROM rental")?;

    assert!(ctx.execute().await.is_err());
    assert_eq!(ctx.pending_count(), 0);
    Ok(())
}
