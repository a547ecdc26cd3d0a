use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DataSourceError, PoolManager, PoolStatus};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub success: bool,
    pub connected: bool,
    pub version: String,
    pub pool: PoolStatus,
    pub sample: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct VersionRow {
    version: String,
}

/// Connects if needed, reads the server version, and runs the configured sample query.
pub async fn run(manager: &PoolManager, sample_query: &str) -> Result<HealthReport, DataSourceError> {
    let pool = manager.get_pool().await?;

    let version = manager
        .execute_query::<VersionRow>("SELECT version() AS version", &[])
        .await?
        .into_iter()
        .next()
        .map(|row| row.version)
        .ok_or_else(|| DataSourceError::Query("version() returned no rows".to_string()))?;

    let sample = manager.execute_query::<Map<String, Value>>(sample_query, &[]).await?;

    Ok(HealthReport {
        success: true,
        connected: true,
        version,
        pool: pool.status(),
        sample,
    })
}
