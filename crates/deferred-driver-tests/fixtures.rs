//! Test fixtures for deferred query integration tests.
//!
//! Every test receives a [`TestDatabase`]: a file-backed SQLite database in
//! its own temporary directory. A file is required because each batch
//! execution opens a fresh connection, and an in-memory SQLite database does
//! not outlive its connection.
//!
//! # Usage
//!
//! ```rust,ignore
//! use deferred_driver_tests::fixtures::{sakila, TestDatabase};
//! use rstest::rstest;
//!
//! #[rstest]
//! #[tokio::test]
//! async fn test_something(sakila: TestDatabase) -> anyhow::Result<()> {
//!     let mut ctx = sakila.context()?;
//!     // register and execute...
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deferred_query::{DeferredContext, DeferredOptions, impl_named_record};
use indoc::indoc;
use once_cell::sync::Lazy;
use rstest::fixture;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Schema and seed rows shared by every test database
pub const SAKILA_SEED: &str = indoc! {"
    CREATE TABLE customer (
        customer_id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT,
        active INTEGER NOT NULL
    );

    CREATE TABLE payment (
        payment_id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customer(customer_id),
        amount INTEGER NOT NULL,
        paid_on TEXT
    );

    INSERT INTO customer VALUES
        (1, 'MARY', 'SMITH', 'mary.smith@sakilacustomer.org', 1),
        (2, 'PATRICIA', 'JOHNSON', NULL, 1),
        (3, 'LINDA', 'WILLIAMS', 'linda.williams@sakilacustomer.org', 0),
        (4, 'BARBARA', 'JONES', 'barbara.jones@sakilacustomer.org', 1),
        (5, 'ELIZABETH', 'BROWN', NULL, 1);

    INSERT INTO payment VALUES
        (1, 1, 299, '2024-05-24'),
        (2, 1, 99, '2024-05-28'),
        (3, 1, 599, NULL),
        (4, 2, 499, '2024-06-15'),
        (5, 3, 199, '2024-06-16'),
        (6, 4, 399, '2024-06-17');
"};

/// Number of rows in the seeded `customer` table
pub const CUSTOMER_COUNT: i64 = 5;

/// Row of the `customer` table, read by column name
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Customer {
    /// Primary key
    pub customer_id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact address, absent for some customers
    pub email: Option<String>,
    /// Whether the account is active
    pub active: bool,
}

impl_named_record!(Customer {
    customer_id,
    first_name,
    last_name,
    email,
    active,
});

/// Row of the `payment` table, read by column name
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Payment {
    /// Primary key
    pub payment_id: i64,
    /// Paying customer
    pub customer_id: i64,
    /// Amount in cents
    pub amount: i32,
    /// Settlement date, absent while pending
    pub paid_on: Option<chrono::NaiveDate>,
}

impl_named_record!(Payment {
    payment_id,
    customer_id,
    amount,
    paid_on,
});

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
});

/// Install the test log subscriber once per process
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// A seeded SQLite database that is deleted when dropped
pub struct TestDatabase {
    dir: TempDir,
    path: PathBuf,
}

impl TestDatabase {
    /// Create and seed a fresh database
    pub fn create() -> Result<Self> {
        init_tracing();

        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let path = dir.path().join("sakila.db");

        let conn = rusqlite::Connection::open(&path).context("failed to open fixture database")?;
        conn.execute_batch(SAKILA_SEED)
            .context("failed to seed fixture database")?;
        tracing::debug!(path = %path.display(), "seeded fixture database");

        Ok(Self { dir, path })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the database file
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Connection string understood by the driver registry
    pub fn connection_string(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    /// A deferred context on this database with default options
    pub fn context(&self) -> Result<DeferredContext> {
        DeferredContext::new(&self.connection_string()).context("failed to create context")
    }

    /// A deferred context on this database with explicit options
    pub fn context_with(&self, options: DeferredOptions) -> Result<DeferredContext> {
        Ok(self.context()?.with_options(options))
    }

    /// Run a single-value query directly, bypassing the batching engine
    pub fn scalar(&self, sql: &str) -> Result<Option<i64>> {
        let conn = rusqlite::Connection::open(&self.path)?;
        let value = conn.query_row(sql, [], |row| row.get::<_, Option<i64>>(0))?;
        Ok(value)
    }
}

/// rstest fixture: a freshly seeded database
#[fixture]
pub fn sakila() -> TestDatabase {
    TestDatabase::create().expect("fixture database should be created")
}
