//! Row sequence tests against the seeded SQLite database.
//!
//! Covers named-record and tuple materialization, registration order across
//! many queries, empty result sets and null handling.

use crate::fixtures::{Customer, Payment, TestDatabase, sakila};
use anyhow::Result;
use deferred_query::{FutureQuery, SelectQuery, SqlCommand, SqlParameter};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn payments_of(customer_id: i32) -> SelectQuery {
    SelectQuery::table("payment")
        .filter("customer_id = @customer")
        .bind(SqlParameter::int("@customer", customer_id))
        .order_by("payment_id")
}

/// Three named rows and their count come back from one execution
#[rstest]
#[tokio::test]
async fn test_rows_and_count_from_one_batch(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;
    let query = payments_of(1);

    let payments: FutureQuery<Payment> = ctx.register_many(&query)?;
    let count = ctx.register_count(&query)?;
    ctx.execute().await?;

    let ids: Vec<i64> = payments.iter()?.map(|p| p.payment_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(*count.value()?, 3);
    assert_eq!(ctx.pending_count(), 0);

    Ok(())
}

/// Null columns land as `None` in named records
#[rstest]
#[tokio::test]
async fn test_named_record_nulls(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let customers: FutureQuery<Customer> =
        ctx.register_many(&SelectQuery::table("customer").order_by("customer_id"))?;
    let payments: FutureQuery<Payment> = ctx.register_many(&payments_of(1))?;
    ctx.execute().await?;

    let customers = customers.items()?;
    assert_eq!(customers.len(), 5);
    assert_eq!(
        customers[1],
        Customer {
            customer_id: 2,
            first_name: "PATRICIA".into(),
            last_name: "JOHNSON".into(),
            email: None,
            active: true,
        }
    );
    assert!(!customers[2].active);

    let payments = payments.items()?;
    assert_eq!(
        payments[0].paid_on,
        chrono::NaiveDate::from_ymd_opt(2024, 5, 24)
    );
    assert_eq!(payments[2].paid_on, None);

    Ok(())
}

/// Tuples read columns by position regardless of their names
#[rstest]
#[tokio::test]
async fn test_tuple_rows(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let names: FutureQuery<(String, Option<String>)> = ctx.register_many(
        &SelectQuery::table("customer")
            .columns(["last_name", "email"])
            .filter("active = @active")
            .bind(SqlParameter::bit("@active", true))
            .order_by("last_name"),
    )?;
    ctx.execute().await?;

    assert_eq!(
        names.into_items()?,
        vec![
            ("BROWN".to_string(), None),
            ("JOHNSON".to_string(), None),
            (
                "JONES".to_string(),
                Some("barbara.jones@sakilacustomer.org".to_string())
            ),
            (
                "SMITH".to_string(),
                Some("mary.smith@sakilacustomer.org".to_string())
            ),
        ]
    );

    Ok(())
}

/// Placeholders are filled from the result set at their registration index
#[rstest]
#[tokio::test]
async fn test_many_queries_keep_registration_order(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let mut placeholders = Vec::new();
    for customer_id in [4, 1, 3, 2, 5] {
        let query = SelectQuery::table("customer")
            .columns(["customer_id"])
            .filter("customer_id = @id")
            .bind(SqlParameter::int("@id", customer_id));
        placeholders.push(ctx.register_many::<i64, _>(&query)?);
    }
    assert_eq!(ctx.pending_count(), 5);
    ctx.execute().await?;

    let ids: Vec<i64> = placeholders
        .iter()
        .map(|p| p.items().map(|ids| ids[0]))
        .collect::<Result<_, _>>()?;
    assert_eq!(ids, vec![4, 1, 3, 2, 5]);

    Ok(())
}

/// A query with no matching rows yields an empty, populated sequence
#[rstest]
#[tokio::test]
async fn test_zero_rows(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let payments: FutureQuery<Payment> = ctx.register_many(&payments_of(5))?;
    ctx.execute().await?;

    assert!(payments.has_value());
    assert!(payments.items()?.is_empty());

    Ok(())
}

/// Text parameters with quotes are escaped when inlined
#[rstest]
#[tokio::test]
async fn test_quoted_text_parameter(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let raw = SqlCommand::new("SELECT customer_id FROM customer WHERE last_name = @name")
        .with_parameter(SqlParameter::text("@name", "O'HARA"));
    let found: FutureQuery<i64> = ctx.register_many(&raw)?;
    let smith: FutureQuery<i64> = ctx.register_many(
        &SqlCommand::new("SELECT customer_id FROM customer WHERE last_name = :name")
            .with_parameter(SqlParameter::text(":name", "SMITH")),
    )?;
    ctx.execute().await?;

    assert!(found.items()?.is_empty());
    assert_eq!(smith.items()?, &[1]);

    Ok(())
}

/// A trailing line comment does not swallow the statement separator
#[rstest]
#[tokio::test]
async fn test_trailing_line_comment(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let first: FutureQuery<i64> = ctx.register_many(
        &SqlCommand::new("SELECT customer_id FROM customer WHERE customer_id = 1 -- by id"),
    )?;
    let count = ctx.register_many::<i64, _>("SELECT COUNT(*) FROM customer;")?;
    ctx.execute().await?;

    assert_eq!(first.items()?, &[1]);
    assert_eq!(count.items()?, &[5]);

    Ok(())
}

/// Whole-number floats stay floating point once inlined
#[rstest]
#[tokio::test]
async fn test_whole_number_float_parameter(sakila: TestDatabase) -> Result<()> {
    let mut ctx = sakila.context()?;

    let ratio: FutureQuery<f64> = ctx.register_many(
        &SqlCommand::new("SELECT 7 / @divisor")
            .with_parameter(SqlParameter::float("@divisor", 2.0)),
    )?;
    ctx.execute().await?;

    assert_eq!(ratio.items()?, &[3.5]);

    Ok(())
}
