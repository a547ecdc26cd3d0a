use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Row as _};

use super::{QueryError, Row, RowSource};
use crate::filter::PageQuery;

/// Row source over the tenant database. Count and page run on one pooled connection.
#[derive(Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn fetch_rows(&self, query: &PageQuery, limit: i64, offset: i64) -> Result<(Vec<Row>, i64), QueryError> {
        let mut conn = self.pool.acquire().await.map_err(store_error)?;

        let count_sql = query.to_count_sql();
        let mut count_query = sqlx::query(&count_sql.query);
        for p in count_sql.params.iter() {
            count_query = bind_param_query(count_query, p);
        }
        let total: i64 = count_query
            .fetch_one(&mut *conn)
            .await
            .map_err(store_error)?
            .try_get("count")
            .map_err(store_error)?;

        let page_sql = query.to_sql(limit, offset);
        let wrapped = format!("SELECT row_to_json(t) AS row FROM ({}) t", page_sql.query);
        let mut page_query = sqlx::query(&wrapped);
        for p in page_sql.params.iter() {
            page_query = bind_param_query(page_query, p);
        }
        let records = page_query.fetch_all(&mut *conn).await.map_err(store_error)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            match record.try_get::<Value, _>("row").map_err(store_error)? {
                Value::Object(map) => rows.push(map),
                other => return Err(QueryError::Store(format!("unexpected row shape: {}", other))),
            }
        }

        Ok((rows, total))
    }
}

fn store_error(err: sqlx::Error) -> QueryError {
    tracing::error!("Paginated query failed: {}", err);
    QueryError::Store(err.to_string())
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays and objects go over as JSONB.
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
