//! A small composable SELECT builder
//!
//! [`SelectQuery`] is the stock [`ComposableQuery`]: a single-table select
//! with filters, ordering and a row window, rendered for one of a few SQL
//! dialects. Filters reference named parameters that are carried alongside
//! the text and inlined when the query is registered.

use crate::{
    Aggregate, ComposableQuery, DeferredError, DeferredResult, Projection, QuerySource,
    SqlCommand, SqlParameter,
};

/// SQL flavor used to render row windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    SqlServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    projection: Projection,
    aggregate: Option<Aggregate>,
    filters: Vec<String>,
    parameters: Vec<SqlParameter>,
    order_by: Vec<(String, SortOrder)>,
    offset: u64,
    limit: Option<u64>,
    dialect: Dialect,
}

impl SelectQuery {
    /// `SELECT * FROM table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::All,
            aggregate: None,
            filters: Vec::new(),
            parameters: Vec::new(),
            order_by: Vec::new(),
            offset: 0,
            limit: None,
            dialect: Dialect::default(),
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Projection::Columns(columns.into_iter().map(Into::into).collect());
        self.aggregate = None;
        self
    }

    /// Add a `WHERE` condition. Multiple conditions are joined with `AND`.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filters.push(condition.into());
        self
    }

    /// Bind a parameter referenced by a filter
    pub fn bind(mut self, parameter: SqlParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push((column.into(), SortOrder::Asc));
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push((column.into(), SortOrder::Desc));
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn is_windowed(&self) -> bool {
        self.offset > 0 || self.limit.is_some()
    }

    /// Render the query text
    pub fn to_sql(&self) -> DeferredResult<String> {
        if self.table.trim().is_empty() {
            return Err(DeferredError::InvalidQuery("select has no table".into()));
        }

        match &self.aggregate {
            Some(aggregate) if self.is_windowed() => Ok(format!(
                "SELECT {} FROM ({}) AS windowed",
                aggregate.to_sql(),
                self.render_rows()?
            )),
            Some(aggregate) => {
                let mut sql = format!("SELECT {}\nFROM {}", aggregate.to_sql(), self.table);
                self.push_filters(&mut sql);
                Ok(sql)
            }
            None => self.render_rows(),
        }
    }

    fn render_projection(&self) -> DeferredResult<String> {
        match &self.projection {
            Projection::All => Ok("*".to_string()),
            Projection::Columns(columns) if columns.is_empty() => Err(
                DeferredError::InvalidQuery("select has an empty column list".into()),
            ),
            Projection::Columns(columns) => Ok(columns.join(", ")),
            Projection::Aggregate(aggregate) => Ok(aggregate.to_sql()),
        }
    }

    /// The row-producing select, ignoring any aggregate
    fn render_rows(&self) -> DeferredResult<String> {
        let projection = self.render_projection()?;
        let top = match (self.dialect, self.offset, self.limit) {
            (Dialect::SqlServer, 0, Some(limit)) => format!("TOP ({}) ", limit),
            _ => String::new(),
        };

        let mut sql = format!("SELECT {}{}\nFROM {}", top, projection, self.table);
        self.push_filters(&mut sql);

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(column, order)| format!("{} {}", column, order.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str("\nORDER BY ");
            sql.push_str(&order);
        }

        self.push_window(&mut sql);
        Ok(sql)
    }

    fn push_filters(&self, sql: &mut String) {
        match self.filters.as_slice() {
            [] => {}
            [single] => {
                sql.push_str("\nWHERE ");
                sql.push_str(single);
            }
            many => {
                let joined = many
                    .iter()
                    .map(|f| format!("({})", f))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                sql.push_str("\nWHERE ");
                sql.push_str(&joined);
            }
        }
    }

    fn push_window(&self, sql: &mut String) {
        match self.dialect {
            Dialect::Sqlite | Dialect::Postgres => match (self.limit, self.offset) {
                (Some(limit), 0) => sql.push_str(&format!("\nLIMIT {}", limit)),
                (Some(limit), offset) => {
                    sql.push_str(&format!("\nLIMIT {} OFFSET {}", limit, offset))
                }
                (None, 0) => {}
                (None, offset) if self.dialect == Dialect::Sqlite => {
                    sql.push_str(&format!("\nLIMIT -1 OFFSET {}", offset))
                }
                (None, offset) => sql.push_str(&format!("\nOFFSET {}", offset)),
            },
            Dialect::SqlServer => {
                if self.offset == 0 {
                    // take-only windows are rendered as TOP
                    return;
                }
                if self.order_by.is_empty() {
                    sql.push_str("\nORDER BY (SELECT NULL)");
                }
                sql.push_str(&format!("\nOFFSET {} ROWS", self.offset));
                if let Some(limit) = self.limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
            }
        }
    }
}

impl QuerySource for SelectQuery {
    fn build_command(&self) -> DeferredResult<SqlCommand> {
        Ok(SqlCommand {
            sql: self.to_sql()?,
            parameters: self.parameters.clone(),
        })
    }
}

impl ComposableQuery for SelectQuery {
    fn with_projection(&self, projection: Projection) -> Self {
        let mut query = self.clone();
        match projection {
            Projection::Aggregate(aggregate) => query.aggregate = Some(aggregate),
            other => {
                query.projection = other;
                query.aggregate = None;
            }
        }
        query
    }

    fn skip(&self, count: u64) -> Self {
        let mut query = self.clone();
        query.offset = query.offset.saturating_add(count);
        query.limit = query.limit.map(|limit| limit.saturating_sub(count));
        query
    }

    fn take(&self, count: u64) -> Self {
        let mut query = self.clone();
        query.limit = Some(query.limit.map_or(count, |limit| limit.min(count)));
        query
    }
}
