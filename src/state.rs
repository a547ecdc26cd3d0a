use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::{AccessValidator, PgTenantStore};
use crate::auth::{IdentityProvider, JwtIdentityProvider};
use crate::config::{AppConfig, QueryConfig};
use crate::datasource::{PgBackendFactory, PoolManager};
use crate::query::{PgRowSource, RowSource};

/// Everything a request handler may touch, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub access: AccessValidator,
    pub rows: Arc<dyn RowSource>,
    pub data_source: Arc<PoolManager>,
    pub query: QueryConfig,
    pub sample_query: String,
    pub enable_cors: bool,
}

impl AppState {
    /// Wires the postgres-backed collaborators over the tenant database pool.
    pub fn from_config(config: &AppConfig, tenant_pool: PgPool) -> Self {
        let identity = JwtIdentityProvider::new(&config.auth.jwt_secret, config.auth.leeway_secs, tenant_pool.clone());
        let access = AccessValidator::new(Arc::new(PgTenantStore::new(tenant_pool.clone())))
            .with_audit_logging(config.security.enable_audit_logging);
        let data_source = PoolManager::new(config.data_source.clone(), Arc::new(PgBackendFactory));

        Self {
            identity: Arc::new(identity),
            access,
            rows: Arc::new(PgRowSource::new(tenant_pool)),
            data_source: Arc::new(data_source),
            query: config.query.clone(),
            sample_query: config.data_source.sample_query.clone(),
            enable_cors: config.security.enable_cors,
        }
    }
}
