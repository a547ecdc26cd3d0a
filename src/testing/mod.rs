//! In-memory collaborators for unit tests.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::accounts::{AccountSummary, StoreError, TenantStore};
use crate::auth::{AssuranceLevel, AssuranceLevels, AuthError, Caller, IdentityProvider, Session};
use crate::config::DataSourceConfig;
use crate::datasource::{BackendFactory, DataSourceBackend, DataSourceError};
use crate::filter::{PageQuery, Predicate, SortDirection};
use crate::query::{QueryError, Row, RowSource};

/// Identity provider whose answers are set by the test and can change between calls.
pub struct ScriptedIdentity {
    user: Result<Option<Caller>, AuthError>,
    levels: Mutex<Result<AssuranceLevels, AuthError>>,
    assurance_calls: AtomicUsize,
}

impl ScriptedIdentity {
    pub fn signed_in(id: &str) -> Self {
        Self::with_user(Ok(Some(Caller::new(id))))
    }

    pub fn anonymous() -> Self {
        Self::with_user(Ok(None))
    }

    pub fn failing(err: AuthError) -> Self {
        Self::with_user(Err(err))
    }

    fn with_user(user: Result<Option<Caller>, AuthError>) -> Self {
        Self {
            user,
            levels: Mutex::new(Ok(AssuranceLevels {
                current: AssuranceLevel::Aal1,
                next: AssuranceLevel::Aal1,
            })),
            assurance_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        if let Ok(Some(caller)) = &mut self.user {
            *caller = caller.clone().with_role(role);
        }
        self
    }

    pub fn with_levels(self, current: AssuranceLevel, next: AssuranceLevel) -> Self {
        self.set_levels(current, next);
        self
    }

    pub fn failing_assurance(self, err: AuthError) -> Self {
        *self.levels.lock().unwrap() = Err(err);
        self
    }

    pub fn set_levels(&self, current: AssuranceLevel, next: AssuranceLevel) {
        *self.levels.lock().unwrap() = Ok(AssuranceLevels { current, next });
    }

    pub fn assurance_calls(&self) -> usize {
        self.assurance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_user(&self, _session: &Session) -> Result<Option<Caller>, AuthError> {
        self.user.clone()
    }

    async fn assurance_levels(&self, _session: &Session) -> Result<AssuranceLevels, AuthError> {
        self.assurance_calls.fetch_add(1, Ordering::SeqCst);
        self.levels.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MemoryTenantStore {
    accounts: Mutex<Vec<AccountSummary>>,
    members: Mutex<HashSet<(String, String)>>,
    lookup_failure: Mutex<Option<String>>,
    membership_failure: Mutex<Option<String>>,
    panic_on_lookup: Mutex<bool>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: AccountSummary) {
        self.accounts.lock().unwrap().push(account);
    }

    pub fn add_member(&self, account_id: &str, caller_id: &str) {
        self.members
            .lock()
            .unwrap()
            .insert((account_id.to_string(), caller_id.to_string()));
    }

    pub fn fail_lookups(&self, message: &str) {
        *self.lookup_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_membership(&self, message: &str) {
        *self.membership_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn panic_on_lookup(&self) {
        *self.panic_on_lookup.lock().unwrap() = true;
    }

    fn check_lookup(&self) -> Result<(), StoreError> {
        if *self.panic_on_lookup.lock().unwrap() {
            panic!("tenant store blew up");
        }
        match self.lookup_failure.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn select_by_id(&self, id: &str) -> Result<Option<AccountSummary>, StoreError> {
        self.check_lookup()?;
        Ok(self.accounts.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn select_by_slug(&self, slug: &str) -> Result<Option<AccountSummary>, StoreError> {
        self.check_lookup()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn is_member(&self, account_id: &str, caller_id: &str) -> Result<bool, StoreError> {
        if let Some(message) = self.membership_failure.lock().unwrap().as_ref() {
            return Err(StoreError(message.clone()));
        }
        Ok(self
            .members
            .lock()
            .unwrap()
            .contains(&(account_id.to_string(), caller_id.to_string())))
    }
}

/// Evaluates predicates the way postgres would, in insertion order unless sorted.
#[derive(Default)]
pub struct MemoryRowSource {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    fetch_calls: AtomicUsize,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: &str, row: Value) {
        let Value::Object(row) = row else {
            panic!("rows must be JSON objects");
        };
        self.tables.lock().unwrap().entry(table.to_string()).or_default().push(row);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn fetch_rows(&self, query: &PageQuery, limit: i64, offset: i64) -> Result<(Vec<Row>, i64), QueryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Row> = tables
            .get(query.collection().name())
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.predicates().iter().all(|p| matches(p, row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for info in query.order().iter().rev() {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&info.column), b.get(&info.column));
                match info.sort {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        let total = rows.len() as i64;
        let page = rows.into_iter().skip(offset as usize).take(limit as usize).collect();
        Ok((page, total))
    }
}

fn matches(predicate: &Predicate, row: &Row) -> bool {
    match predicate {
        Predicate::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
        Predicate::ILike { column, pattern } => match row.get(column) {
            Some(Value::String(s)) => like(&s.to_lowercase(), &pattern.to_lowercase()),
            Some(Value::Null) | None => false,
            Some(other) => like(&other.to_string().to_lowercase(), &pattern.to_lowercase()),
        },
        Predicate::Any(nested) => nested.iter().any(|p| matches(p, row)),
    }
}

/// SQL LIKE with `\` as the escape character.
fn like(text: &str, pattern: &str) -> bool {
    fn go(text: &[char], pattern: &[char]) -> bool {
        match pattern.first() {
            None => text.is_empty(),
            Some('%') => (0..=text.len()).any(|i| go(&text[i..], &pattern[1..])),
            Some('_') => !text.is_empty() && go(&text[1..], &pattern[1..]),
            Some('\\') if pattern.len() > 1 => text.first() == Some(&pattern[1]) && go(&text[1..], &pattern[2..]),
            Some(c) => text.first() == Some(c) && go(&text[1..], &pattern[1..]),
        }
    }
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    go(&text, &pattern)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Greater,
        (Some(_), None) => CmpOrdering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[derive(Clone)]
pub enum FakeBehavior {
    Rows(Vec<Value>),
    Fail(String),
    Delay(Duration),
    /// No connection freed up within the acquire timeout.
    AcquireTimeout,
}

#[derive(Default)]
struct FakeCounters {
    connects: AtomicUsize,
    closes: AtomicUsize,
    checked_out: AtomicUsize,
    last_statement: Mutex<Option<(String, Vec<Value>)>>,
}

pub struct FakeBackendFactory {
    behavior: FakeBehavior,
    refuse: Option<String>,
    counters: Arc<FakeCounters>,
}

impl FakeBackendFactory {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            refuse: None,
            counters: Arc::new(FakeCounters::default()),
        }
    }

    pub fn refusing(message: &str) -> Self {
        Self {
            refuse: Some(message.to_string()),
            ..Self::new(FakeBehavior::Rows(vec![]))
        }
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn checked_out(&self) -> usize {
        self.counters.checked_out.load(Ordering::SeqCst)
    }

    pub fn last_statement(&self) -> Option<(String, Vec<Value>)> {
        self.counters.last_statement.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendFactory for FakeBackendFactory {
    async fn connect(&self, _config: &DataSourceConfig) -> Result<Arc<dyn DataSourceBackend>, DataSourceError> {
        if let Some(message) = &self.refuse {
            return Err(DataSourceError::Connection(message.clone()));
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeBackend {
            behavior: self.behavior.clone(),
            counters: self.counters.clone(),
        }))
    }
}

struct FakeBackend {
    behavior: FakeBehavior,
    counters: Arc<FakeCounters>,
}

/// Stands in for a checked-out connection; returned on drop.
struct Checkout(Arc<FakeCounters>);

impl Drop for Checkout {
    fn drop(&mut self) {
        self.0.checked_out.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSourceBackend for FakeBackend {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>, DataSourceError> {
        self.counters.checked_out.fetch_add(1, Ordering::SeqCst);
        let _checkout = Checkout(self.counters.clone());
        *self.counters.last_statement.lock().unwrap() = Some((sql.to_string(), params.to_vec()));

        match &self.behavior {
            FakeBehavior::Rows(rows) => Ok(rows
                .iter()
                .filter_map(|row| row.as_object().cloned())
                .collect()),
            FakeBehavior::Fail(message) => Err(DataSourceError::Query(message.clone())),
            FakeBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(vec![])
            }
            FakeBehavior::AcquireTimeout => Err(DataSourceError::PoolExhausted(
                "timed out waiting for a connection".to_string(),
            )),
        }
    }

    async fn close(&self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn size(&self) -> u32 {
        self.counters.checked_out.load(Ordering::SeqCst) as u32
    }

    fn idle(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_honours_wildcards_and_escapes() {
        assert!(like("acme corp", "%me c%"));
        assert!(like("a_b", "a\\_b"));
        assert!(!like("axb", "a\\_b"));
        assert!(like("axb", "a_b"));
        assert!(!like("acme", "%zz%"));
        assert!(like("50%", "%50\\%%"));
    }
}
