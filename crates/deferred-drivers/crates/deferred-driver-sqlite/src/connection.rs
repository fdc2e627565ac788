//! SQLite connection implementation

use async_trait::async_trait;
use deferred_core::{
    ColumnMeta, Connection, DbError, MultiResultCursor, QueryResult, Result, Row, Value,
    split_statements,
};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Mutex<RusqliteConnection>,
    closed: AtomicBool,
}

impl SqliteConnection {
    /// Open a SQLite database. `:memory:` opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                DbError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            let expanded_path = Self::expand_path(path)?;
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    return Err(DbError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                DbError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| DbError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            closed: AtomicBool::new(false),
        })
    }

    /// Set a pragma on the open connection (e.g. `journal_mode`)
    pub fn set_pragma(&self, name: &str, value: &str) -> Result<()> {
        let conn = self.lock_open()?;
        conn.pragma_update(None, name, value)
            .map_err(|e| DbError::Connection(format!("Failed to set pragma {}: {}", name, e)))
    }

    /// Expand `~/` and make relative paths absolute
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            let home = std::env::var_os("HOME").ok_or_else(|| {
                DbError::Configuration("Unable to determine HOME directory".into())
            })?;
            std::path::PathBuf::from(home).join(rest)
        } else if path.starts_with('~') {
            return Err(DbError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            std::path::PathBuf::from(path)
        };

        let absolute = if expanded.is_relative() {
            std::env::current_dir()?.join(expanded)
        } else {
            expanded
        };
        Ok(absolute.to_string_lossy().to_string())
    }

    fn lock_open(&self) -> Result<MutexGuard<'_, RusqliteConnection>> {
        if self.is_closed() {
            return Err(DbError::Connection("connection is closed".into()));
        }
        Ok(self.conn.lock())
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let conn = self.lock_open()?;
        let result = run_query(&conn, sql, params)?;
        tracing::debug!(
            row_count = result.row_count(),
            execution_time_ms = result.execution_time_ms,
            "query executed successfully"
        );
        Ok(result)
    }

    /// Runs every statement of the command while holding the connection lock.
    /// Statements that return no columns (DML, DDL) are executed but do not
    /// produce a result set.
    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    async fn query_multi(&self, sql: &str) -> Result<MultiResultCursor> {
        let start_time = Instant::now();
        let conn = self.lock_open()?;

        let statements = split_statements(sql);
        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            let returns_rows = conn
                .prepare(statement)
                .map_err(|e| DbError::Query(format!("Failed to prepare query: {}", e)))?
                .column_count()
                > 0;

            if returns_rows {
                results.push(run_query(&conn, statement, &[])?);
            } else {
                conn.execute(statement, [])
                    .map_err(|e| DbError::Query(format!("Failed to execute statement: {}", e)))?;
            }
        }

        tracing::debug!(
            statements = statements.len(),
            result_sets = results.len(),
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "multi-statement command executed"
        );
        Ok(MultiResultCursor::new(results))
    }

    async fn close(&self) -> Result<()> {
        tracing::debug!("closing SQLite connection");
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Prepare, run and fully drain one row-returning statement
fn run_query(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = Instant::now();
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| DbError::Query(format!("Failed to prepare query: {}", e)))?;

    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .enumerate()
        .map(|(ordinal, col)| ColumnMeta {
            name: col.name().to_string(),
            data_type: col.decl_type().unwrap_or("DYNAMIC").to_string(),
            ordinal,
        })
        .collect();
    let column_names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))?;

    while let Some(row) = query_rows
        .next()
        .map_err(|e| DbError::Query(format!("Failed to fetch row: {}", e)))?
    {
        let values = (0..columns.len())
            .map(|idx| rusqlite_to_value(row, idx))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row::new(Arc::clone(&column_names), values));
    }

    Ok(QueryResult {
        columns,
        rows,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

/// Convert our Value types to rusqlite-compatible types
fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;

    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Int8(i) => Sql::Integer(*i as i64),
        Value::Int16(i) => Sql::Integer(*i as i64),
        Value::Int32(i) => Sql::Integer(*i as i64),
        Value::Int64(i) => Sql::Integer(*i),
        Value::Float32(f) => Sql::Real(*f as f64),
        Value::Float64(f) => Sql::Real(*f),
        Value::Decimal(d) => Sql::Text(d.clone()),
        Value::String(s) => Sql::Text(s.clone()),
        Value::Bytes(b) => Sql::Blob(b.clone()),
        Value::Uuid(u) => Sql::Text(u.to_string()),
        Value::Date(d) => Sql::Text(d.to_string()),
        Value::Time(t) => Sql::Text(t.to_string()),
        Value::DateTime(dt) => Sql::Text(dt.to_string()),
    }
}

/// Convert a rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| DbError::Query(e.to_string()))?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded() -> SqliteConnection {
        let conn = SqliteConnection::open(":memory:").expect("open in-memory db");
        let cursor = conn
            .query_multi(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER);
                 INSERT INTO users (name, age) VALUES ('alice', 31), ('bob', NULL)",
            )
            .await
            .expect("seed users");
        assert_eq!(cursor.result_count(), 0);
        conn
    }

    #[tokio::test]
    async fn test_query_multi_returns_sets_in_order() {
        let conn = seeded().await;

        let mut cursor = conn
            .query_multi("SELECT name FROM users ORDER BY id;\n\nSELECT COUNT(*) FROM users")
            .await
            .unwrap();

        assert_eq!(cursor.result_count(), 2);
        assert_eq!(cursor.column_name(0), Some("name"));
        assert!(cursor.next_row());
        assert_eq!(cursor.value_at(0).unwrap(), &Value::String("alice".into()));

        assert!(cursor.next_result());
        assert!(cursor.next_row());
        assert_eq!(cursor.value_at(0).unwrap(), &Value::Int64(2));
    }

    #[tokio::test]
    async fn test_query_multi_skips_statements_without_columns() {
        let conn = seeded().await;

        let cursor = conn
            .query_multi("UPDATE users SET age = 40 WHERE name = 'bob'; SELECT age FROM users")
            .await
            .unwrap();

        assert_eq!(cursor.result_count(), 1);
    }

    #[tokio::test]
    async fn test_query_multi_propagates_syntax_errors() {
        let conn = seeded().await;

        let err = conn
            .query_multi("SELECT 1; SELEC broken")
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Query(_)));
    }

    #[tokio::test]
    async fn test_null_and_blob_values() {
        let conn = seeded().await;

        let result = conn
            .query("SELECT age, x'00ff' AS raw FROM users WHERE name = 'bob'", &[])
            .await
            .unwrap();

        assert_eq!(result.rows[0].get(0), Some(&Value::Null));
        assert_eq!(result.rows[0].get(1), Some(&Value::Bytes(vec![0, 255])));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_work() {
        let conn = seeded().await;
        conn.close().await.unwrap();

        assert!(conn.is_closed());
        assert!(matches!(
            conn.query("SELECT 1", &[]).await,
            Err(DbError::Connection(_))
        ));
    }

    #[test]
    fn test_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("db.sqlite");

        let result = SqliteConnection::open(path.to_str().unwrap());
        assert!(matches!(result, Err(DbError::Connection(_))));
    }
}
