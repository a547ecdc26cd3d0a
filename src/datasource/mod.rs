use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, Semaphore, TryAcquireError};

use crate::config::DataSourceConfig;

pub mod postgres;
pub mod probe;

pub use postgres::{PgBackend, PgBackendFactory};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataSourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Pool is closed")]
    Closed,

    #[error("Row decode error: {0}")]
    Decode(String),
}

/// A live connection pool to the secondary database.
#[async_trait]
pub trait DataSourceBackend: Send + Sync {
    /// Runs one statement as given, with bound parameters, returning rows as JSON objects.
    /// Fails with `PoolExhausted` when no connection frees up within the acquire timeout.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>, DataSourceError>;

    /// Waits for checked-out connections to come back, then closes everything.
    async fn close(&self);

    fn size(&self) -> u32;

    fn idle(&self) -> usize;
}

#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn connect(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSourceBackend>, DataSourceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStatus {
    pub max_connections: u32,
    pub queue_limit: u32,
    pub size: u32,
    pub idle: usize,
    pub in_flight: usize,
}

/// Bounded front for a backend pool.
///
/// At most `max_connections + queue_limit` requests are admitted at once; the rest fail
/// fast with `PoolExhausted`. The permit is dropped with the request future, so a
/// cancelled request frees its slot and its connection.
pub struct DataSourcePool {
    backend: Arc<dyn DataSourceBackend>,
    admission: Semaphore,
    capacity: usize,
    max_connections: u32,
    queue_limit: u32,
}

impl DataSourcePool {
    pub fn new(backend: Arc<dyn DataSourceBackend>, config: &DataSourceConfig) -> Self {
        let capacity = config.max_connections as usize + config.queue_limit as usize;
        Self {
            backend,
            admission: Semaphore::new(capacity),
            capacity,
            max_connections: config.max_connections,
            queue_limit: config.queue_limit,
        }
    }

    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>, DataSourceError> {
        let _permit = self.admission.try_acquire().map_err(|e| match e {
            TryAcquireError::Closed => DataSourceError::Closed,
            TryAcquireError::NoPermits => {
                tracing::warn!("Data source saturated: {} requests in flight", self.capacity);
                DataSourceError::PoolExhausted(format!("{} requests already in flight", self.capacity))
            }
        })?;

        // Waiting for a connection is bounded by the backend's acquire timeout, which it
        // reports as `PoolExhausted`. Statement run time is not bounded here.
        self.backend.execute(sql, params).await
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            max_connections: self.max_connections,
            queue_limit: self.queue_limit,
            size: self.backend.size(),
            idle: self.backend.idle(),
            in_flight: self.capacity.saturating_sub(self.admission.available_permits()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.admission.is_closed()
    }

    async fn close(&self) {
        self.admission.close();
        self.backend.close().await;
    }
}

/// Owns the one data-source pool for the process, created on first use.
pub struct PoolManager {
    config: DataSourceConfig,
    factory: Arc<dyn BackendFactory>,
    slot: Mutex<Option<Arc<DataSourcePool>>>,
}

impl PoolManager {
    pub fn new(config: DataSourceConfig, factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            config,
            factory,
            slot: Mutex::new(None),
        }
    }

    /// Returns the shared pool, connecting on the first call after startup or `close_pool`.
    pub async fn get_pool(&self) -> Result<Arc<DataSourcePool>, DataSourceError> {
        let mut slot = self.slot.lock().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let backend = self.factory.connect(&self.config).await?;
        let pool = Arc::new(DataSourcePool::new(backend, &self.config));
        tracing::info!(
            "Created data source pool for {}:{}/{} (max {}, queue {})",
            self.config.host,
            self.config.port,
            self.config.database,
            self.config.max_connections,
            self.config.queue_limit
        );
        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Runs a parameterised statement and decodes each row into `T`.
    pub async fn execute_query<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, DataSourceError> {
        let pool = self.get_pool().await?;
        let rows = pool.execute(sql, params).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(|e| DataSourceError::Decode(e.to_string())))
            .collect()
    }

    /// Drains and closes the pool; the next `get_pool` builds a fresh one.
    pub async fn close_pool(&self) {
        let pool = self.slot.lock().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!("Closed data source pool");
        }
    }

    pub async fn status(&self) -> Option<PoolStatus> {
        self.slot.lock().await.as_ref().map(|pool| pool.status())
    }
}
