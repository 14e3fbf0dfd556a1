//! Database connections that run finished statement text.
//!
//! The prepare engine never touches a connection. A [`Connection`] only receives
//! the substituted SQL, and optionally supplies the dialect's [`Escaper`].

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::error::{Error, Result};
use crate::escape::{Escaper, MySqlEscaper};
use crate::value::{format_float, Value};

/// One result row as ordered column/value pairs.
pub type Row = Vec<(String, Value)>;

/// Result of a statement that returns no rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// A live database that can run statement text.
///
/// Only [`exec`](Connection::exec) and [`query`](Connection::query) are required;
/// the fetch helpers are built on `query`.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    async fn exec(&self, sql: &str) -> Result<ExecOutcome>;

    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// First column of the first row when the result has a single column,
    /// otherwise the whole first row as a [`Value::Map`].
    async fn lookup(&self, sql: &str) -> Result<Option<Value>> {
        let mut rows = self.query(sql).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut row = rows.swap_remove(0);
        if row.len() == 1 {
            return Ok(row.pop().map(|(_, value)| value));
        }
        Ok(Some(Value::Map(row)))
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>> {
        self.query(sql).await
    }

    /// Rows keyed by the text of their `key` column. Later rows win on duplicates.
    async fn fetch_all_indexed_by(&self, sql: &str, key: &str) -> Result<HashMap<String, Row>> {
        let rows = self.query(sql).await?;
        let mut indexed = HashMap::with_capacity(rows.len());
        for row in rows {
            let index = row
                .iter()
                .find(|(column, _)| column == key)
                .map(|(_, value)| index_key(value))
                .ok_or_else(|| Error::UnknownKey {
                    template: sql.to_owned(),
                    key: key.to_owned(),
                })?;
            indexed.insert(index, row);
        }
        Ok(indexed)
    }

    /// Rows with column names dropped.
    async fn fetch_all_as_rows(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let rows = self.query(sql).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(|(_, value)| value).collect())
            .collect())
    }

    /// Escaper matching the connection's dialect.
    fn escaper(&self) -> Arc<dyn Escaper> {
        Arc::new(MySqlEscaper::default())
    }
}

fn index_key(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Bool(b) => u8::from(*b).to_string(),
        _ => String::new(),
    }
}

/// [`Connection`] over an sqlx MySQL pool.
///
/// Statements go through the text protocol, so multi-statement strings and
/// `CALL` work exactly as written.
///
/// ```rust,no_run
/// use sqlx_prepare::{Connection, MySqlConnection};
///
/// # async fn example() -> sqlx_prepare::Result<()> {
/// let conn = MySqlConnection::connect("mysql://localhost/test").await?;
/// let total = conn.lookup("SELECT COUNT(*) FROM users").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MySqlConnection {
    pool: MySqlPool,
}

impl MySqlConnection {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(MySqlPool::connect(url).await?))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Connection for MySqlConnection {
    async fn exec(&self, sql: &str) -> Result<ExecOutcome> {
        tracing::debug!(sql, "exec");
        let done = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(ExecOutcome {
            rows_affected: done.rows_affected(),
            last_insert_id: done.last_insert_id(),
        })
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!(sql, "query");
        let rows = sqlx::raw_sql(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut out = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let i = column.ordinal();
        let value = if row.try_get_raw(i)?.is_null() {
            Value::Null
        } else {
            decode_column(row, i, column.type_info().name())?
        };
        out.push((column.name().to_owned(), value));
    }
    Ok(out)
}

// text protocol: every non-binary column arrives as text, so unchecked decodes are safe
fn decode_column(row: &MySqlRow, i: usize, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(i)?),
        "BIGINT UNSIGNED" => Value::from(row.try_get_unchecked::<u64, _>(i)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" | "TINYINT UNSIGNED"
        | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => {
            Value::Int(row.try_get_unchecked::<i64, _>(i)?)
        }
        "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(i)?),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(i)?;
            Value::Str(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::Str(row.try_get_unchecked::<String, _>(i)?),
    };
    Ok(value)
}
