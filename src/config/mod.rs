use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub query: QueryConfig,
    pub data_source: DataSourceConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Tenant and identity database (accounts, memberships, auth users).
    pub database_url: Option<String>,
    pub database_max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

/// Connection settings for the secondary data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    /// Requests allowed to wait for a connection once all are checked out.
    pub queue_limit: u32,
    pub acquire_timeout_ms: u64,
    pub sample_query: String,
}

impl DataSourceConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Builds a postgres URL, percent-encoding the credentials.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        let mut url = url::Url::parse(&format!("postgres://{}:{}", self.host, self.port))
            .map_err(|e| ConfigError::Invalid("DATA_SOURCE_HOST", e.to_string()))?;
        url.set_username(&self.user)
            .map_err(|_| ConfigError::Invalid("DATA_SOURCE_USER", self.user.clone()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConfigError::Invalid("DATA_SOURCE_PASSWORD", "<redacted>".to_string()))?;
        }
        url.set_path(&format!("/{}", self.database));
        Ok(url.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub enable_audit_logging: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.server.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.server.database_max_connections = v.parse().unwrap_or(self.server.database_max_connections);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_LEEWAY_SECS") {
            self.auth.leeway_secs = v.parse().unwrap_or(self.auth.leeway_secs);
        }

        // Query overrides
        if let Ok(v) = env::var("QUERY_DEFAULT_PAGE_SIZE") {
            self.query.default_page_size = v.parse().unwrap_or(self.query.default_page_size);
        }
        if let Ok(v) = env::var("QUERY_MAX_PAGE_SIZE") {
            self.query.max_page_size = v.parse().unwrap_or(self.query.max_page_size);
        }

        // Data source overrides
        if let Ok(v) = env::var("DATA_SOURCE_HOST") {
            self.data_source.host = v;
        }
        if let Ok(v) = env::var("DATA_SOURCE_PORT") {
            self.data_source.port = v.parse().unwrap_or(self.data_source.port);
        }
        if let Ok(v) = env::var("DATA_SOURCE_USER") {
            self.data_source.user = v;
        }
        if let Ok(v) = env::var("DATA_SOURCE_PASSWORD") {
            self.data_source.password = v;
        }
        if let Ok(v) = env::var("DATA_SOURCE_DATABASE") {
            self.data_source.database = v;
        }
        if let Ok(v) = env::var("DATA_SOURCE_MAX_CONNECTIONS") {
            self.data_source.max_connections = v.parse().unwrap_or(self.data_source.max_connections);
        }
        if let Ok(v) = env::var("DATA_SOURCE_QUEUE_LIMIT") {
            self.data_source.queue_limit = v.parse().unwrap_or(self.data_source.queue_limit);
        }
        if let Ok(v) = env::var("DATA_SOURCE_ACQUIRE_TIMEOUT_MS") {
            self.data_source.acquire_timeout_ms = v.parse().unwrap_or(self.data_source.acquire_timeout_ms);
        }
        if let Ok(v) = env::var("DATA_SOURCE_SAMPLE_QUERY") {
            self.data_source.sample_query = v;
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        self
    }

    /// Fails fast on settings the server cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("AUTH_JWT_SECRET"));
        }
        if self.server.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.query.default_page_size < 1 || self.query.default_page_size > self.query.max_page_size {
            return Err(ConfigError::Invalid(
                "QUERY_DEFAULT_PAGE_SIZE",
                format!("{} (max {})", self.query.default_page_size, self.query.max_page_size),
            ));
        }
        if self.data_source.max_connections == 0 {
            return Err(ConfigError::Invalid("DATA_SOURCE_MAX_CONNECTIONS", "0".to_string()));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                database_url: None,
                database_max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                leeway_secs: 30,
            },
            query: QueryConfig {
                default_page_size: 10,
                max_page_size: 200,
            },
            data_source: DataSourceConfig {
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                database: "postgres".to_string(),
                max_connections: 10,
                queue_limit: 50,
                acquire_timeout_ms: 5_000,
                sample_query: "SELECT NOW() AS now".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                enable_audit_logging: false,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.database_max_connections = 20;
        config.query.max_page_size = 100;
        config.data_source.max_connections = 10;
        config.data_source.queue_limit = 20;
        config.data_source.acquire_timeout_ms = 3_000;
        config.security.enable_audit_logging = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.database_max_connections = 50;
        config.query.max_page_size = 100;
        config.data_source.max_connections = 10;
        config.data_source.queue_limit = 10;
        config.data_source.acquire_timeout_ms = 2_000;
        config.security.enable_cors = false;
        config.security.enable_audit_logging = true;
        config
    }
}

// Read once at the composition root; components receive what they need explicitly.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
