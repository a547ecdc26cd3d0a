use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountSummary, StoreError, TenantStore};

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    slug: Option<String>,
    name: String,
}

impl From<AccountRow> for AccountSummary {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id.to_string(),
            slug: row.slug,
            name: row.name,
        }
    }
}

/// `accounts` and `account_memberships` in the tenant database.
#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn select_by_id(&self, id: &str) -> Result<Option<AccountSummary>, StoreError> {
        // A non-UUID id cannot name a row.
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, AccountRow>("SELECT id, slug, name FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(row.map(AccountSummary::from))
    }

    async fn select_by_slug(&self, slug: &str) -> Result<Option<AccountSummary>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT id, slug, name FROM accounts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(row.map(AccountSummary::from))
    }

    async fn is_member(&self, account_id: &str, caller_id: &str) -> Result<bool, StoreError> {
        let (Ok(account_id), Ok(caller_id)) = (Uuid::parse_str(account_id), Uuid::parse_str(caller_id)) else {
            return Ok(false);
        };
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM account_memberships WHERE account_id = $1 AND user_id = $2)",
        )
        .bind(account_id)
        .bind(caller_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError(e.to_string()))
    }
}
