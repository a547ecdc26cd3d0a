use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row, TypeInfo, ValueRef};

use super::{BackendFactory, DataSourceBackend, DataSourceError};
use crate::config::DataSourceConfig;
use crate::query::postgres::bind_param_query;

/// sqlx pool to the secondary postgres database.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataSourceBackend for PgBackend {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>, DataSourceError> {
        let mut query = sqlx::query(sql);
        for p in params {
            query = bind_param_query(query, p);
        }

        let records = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        records.iter().map(row_to_map).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn size(&self) -> u32 {
        self.pool.size()
    }

    fn idle(&self) -> usize {
        self.pool.num_idle()
    }
}

pub struct PgBackendFactory;

#[async_trait]
impl BackendFactory for PgBackendFactory {
    async fn connect(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSourceBackend>, DataSourceError> {
        let url = config
            .connection_url()
            .map_err(|e| DataSourceError::Connection(e.to_string()))?;

        // Connections open on demand; the first statement surfaces connectivity errors.
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&url)
            .map_err(map_sqlx_error)?;

        Ok(Arc::new(PgBackend::new(pool)))
    }
}

/// How a result column is turned into JSON, by postgres type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Json,
    Uuid,
    TimestampTz,
    Timestamp,
    Date,
    Unsupported,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "BOOL" => ColumnKind::Bool,
        "INT2" => ColumnKind::Int2,
        "INT4" => ColumnKind::Int4,
        "INT8" => ColumnKind::Int8,
        "FLOAT4" => ColumnKind::Float4,
        "FLOAT8" => ColumnKind::Float8,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => ColumnKind::Text,
        "JSON" | "JSONB" => ColumnKind::Json,
        "UUID" => ColumnKind::Uuid,
        "TIMESTAMPTZ" => ColumnKind::TimestampTz,
        "TIMESTAMP" => ColumnKind::Timestamp,
        "DATE" => ColumnKind::Date,
        _ => ColumnKind::Unsupported,
    }
}

fn row_to_map(row: &PgRow) -> Result<Map<String, Value>, DataSourceError> {
    let mut map = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let i = column.ordinal();
        let type_name = column.type_info().name();

        let value = if row.try_get_raw(i).map_err(map_sqlx_error)?.is_null() {
            Value::Null
        } else {
            match column_kind(type_name) {
                ColumnKind::Bool => Value::Bool(row.try_get(i).map_err(map_sqlx_error)?),
                ColumnKind::Int2 => Value::from(row.try_get::<i16, _>(i).map_err(map_sqlx_error)?),
                ColumnKind::Int4 => Value::from(row.try_get::<i32, _>(i).map_err(map_sqlx_error)?),
                ColumnKind::Int8 => Value::from(row.try_get::<i64, _>(i).map_err(map_sqlx_error)?),
                ColumnKind::Float4 => Value::from(row.try_get::<f32, _>(i).map_err(map_sqlx_error)?),
                ColumnKind::Float8 => Value::from(row.try_get::<f64, _>(i).map_err(map_sqlx_error)?),
                ColumnKind::Text => Value::String(row.try_get(i).map_err(map_sqlx_error)?),
                ColumnKind::Json => row.try_get::<Value, _>(i).map_err(map_sqlx_error)?,
                ColumnKind::Uuid => Value::String(row.try_get::<uuid::Uuid, _>(i).map_err(map_sqlx_error)?.to_string()),
                ColumnKind::TimestampTz => Value::String(
                    row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                        .map_err(map_sqlx_error)?
                        .to_rfc3339(),
                ),
                ColumnKind::Timestamp => Value::String(
                    row.try_get::<chrono::NaiveDateTime, _>(i)
                        .map_err(map_sqlx_error)?
                        .to_string(),
                ),
                ColumnKind::Date => Value::String(row.try_get::<chrono::NaiveDate, _>(i).map_err(map_sqlx_error)?.to_string()),
                ColumnKind::Unsupported => {
                    return Err(DataSourceError::Decode(format!(
                        "column '{}' has unsupported type {}; cast it to text in the query",
                        column.name(),
                        type_name
                    )))
                }
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn map_sqlx_error(err: sqlx::Error) -> DataSourceError {
    match err {
        sqlx::Error::PoolTimedOut => DataSourceError::PoolExhausted("timed out waiting for a connection".to_string()),
        sqlx::Error::PoolClosed => DataSourceError::Closed,
        sqlx::Error::Io(e) => DataSourceError::Connection(e.to_string()),
        sqlx::Error::Tls(e) => DataSourceError::Connection(e.to_string()),
        sqlx::Error::Configuration(e) => DataSourceError::Connection(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => DataSourceError::Decode(err.to_string()),
        other => DataSourceError::Query(other.to_string()),
    }
}
