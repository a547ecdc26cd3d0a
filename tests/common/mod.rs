#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use tenant_console_core::accounts::{AccessValidator, AccountSummary, StoreError, TenantStore};
use tenant_console_core::auth::{AssuranceLevel, AssuranceLevels, AuthError, Caller, IdentityProvider, Session};
use tenant_console_core::config::{AppConfig, DataSourceConfig};
use tenant_console_core::datasource::{BackendFactory, DataSourceBackend, DataSourceError, PoolManager};
use tenant_console_core::filter::PageQuery;
use tenant_console_core::query::{QueryError, Row, RowSource};
use tenant_console_core::{app, AppState};

pub const ADMIN: &str = "admin-token";
pub const ADMIN_NEEDS_MFA: &str = "admin-aal1-token";
pub const MEMBER: &str = "member-token";
pub const ANONYMOUS: &str = "anon-token";
pub const BROKEN: &str = "broken-token";

/// Token -> caller table standing in for the identity provider.
pub struct TokenIdentity {
    users: HashMap<&'static str, (Option<Caller>, AssuranceLevels)>,
}

impl TokenIdentity {
    pub fn new() -> Self {
        let relaxed = AssuranceLevels { current: AssuranceLevel::Aal1, next: AssuranceLevel::Aal1 };
        let pending = AssuranceLevels { current: AssuranceLevel::Aal1, next: AssuranceLevel::Aal2 };
        let mut users = HashMap::new();
        users.insert(ADMIN, (Some(Caller::new("root").with_role("super-admin")), relaxed));
        users.insert(ADMIN_NEEDS_MFA, (Some(Caller::new("root-2").with_role("super-admin")), pending));
        users.insert(MEMBER, (Some(Caller::new("alice")), relaxed));
        users.insert(ANONYMOUS, (None, relaxed));
        Self { users }
    }

    fn lookup(&self, session: &Session) -> Result<&(Option<Caller>, AssuranceLevels), AuthError> {
        self.users
            .get(session.token())
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentity {
    async fn current_user(&self, session: &Session) -> Result<Option<Caller>, AuthError> {
        Ok(self.lookup(session)?.0.clone())
    }

    async fn assurance_levels(&self, session: &Session) -> Result<AssuranceLevels, AuthError> {
        Ok(self.lookup(session)?.1)
    }
}

/// One account, `t1`/`acme`, with `alice` as its only member.
pub struct SingleTenantStore;

#[async_trait]
impl TenantStore for SingleTenantStore {
    async fn select_by_id(&self, id: &str) -> Result<Option<AccountSummary>, StoreError> {
        Ok((id == "t1").then(acme))
    }

    async fn select_by_slug(&self, slug: &str) -> Result<Option<AccountSummary>, StoreError> {
        Ok((slug == "acme").then(acme))
    }

    async fn is_member(&self, account_id: &str, caller_id: &str) -> Result<bool, StoreError> {
        Ok(account_id == "t1" && caller_id == "alice")
    }
}

pub fn acme() -> AccountSummary {
    AccountSummary { id: "t1".into(), slug: Some("acme".into()), name: "Acme".into() }
}

/// Fixed table of rows; records the last query it was asked for.
pub struct CannedRows {
    rows: Vec<Row>,
    pub last_query: Mutex<Option<PageQuery>>,
}

impl CannedRows {
    pub fn accounts(count: usize) -> Self {
        let rows = (0..count)
            .map(|i| {
                let Value::Object(row) = json!({ "id": format!("t{}", i), "slug": format!("acct-{}", i), "name": format!("Account {:02}", i) }) else {
                    unreachable!()
                };
                row
            })
            .collect();
        Self { rows, last_query: Mutex::new(None) }
    }
}

#[async_trait]
impl RowSource for CannedRows {
    async fn fetch_rows(&self, query: &PageQuery, limit: i64, offset: i64) -> Result<(Vec<Row>, i64), QueryError> {
        *self.last_query.lock().unwrap() = Some(query.clone());
        let page = self.rows.iter().skip(offset as usize).take(limit as usize).cloned().collect();
        Ok((page, self.rows.len() as i64))
    }
}

pub enum Backend {
    Healthy,
    Down,
    /// Connects, but every statement finds the pool saturated.
    Busy,
}

struct FakeFactory(Backend);

struct FakeBackend {
    busy: bool,
}

#[async_trait]
impl DataSourceBackend for FakeBackend {
    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Map<String, Value>>, DataSourceError> {
        if self.busy {
            return Err(DataSourceError::PoolExhausted("timed out waiting for a connection".to_string()));
        }
        let Value::Object(row) = json!({ "version": "PostgreSQL 16.2", "now": "2026-10-19T12:00:00Z" }) else {
            unreachable!()
        };
        Ok(vec![row])
    }

    async fn close(&self) {}

    fn size(&self) -> u32 {
        1
    }

    fn idle(&self) -> usize {
        1
    }
}

#[async_trait]
impl BackendFactory for FakeFactory {
    async fn connect(&self, _config: &DataSourceConfig) -> Result<Arc<dyn DataSourceBackend>, DataSourceError> {
        match self.0 {
            Backend::Healthy => Ok(Arc::new(FakeBackend { busy: false })),
            Backend::Busy => Ok(Arc::new(FakeBackend { busy: true })),
            Backend::Down => Err(DataSourceError::Connection("connection refused".to_string())),
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    pub rows: Arc<CannedRows>,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

/// Boots the router on a free port inside the current test runtime.
pub async fn spawn_server(backend: Backend) -> Result<TestServer> {
    let config = AppConfig::development();
    let rows = Arc::new(CannedRows::accounts(15));
    let state = AppState {
        identity: Arc::new(TokenIdentity::new()),
        access: AccessValidator::new(Arc::new(SingleTenantStore)),
        rows: rows.clone(),
        data_source: Arc::new(PoolManager::new(config.data_source.clone(), Arc::new(FakeFactory(backend)))),
        query: config.query.clone(),
        sample_query: config.data_source.sample_query.clone(),
        enable_cors: config.security.enable_cors,
    };

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        rows,
        client: reqwest::Client::new(),
    })
}
