use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filter::{Collection, FilterError};

pub mod access;
pub mod store;

pub use access::AccessValidator;
pub use store::PgTenantStore;

/// Columns admin screens may filter and sort accounts on.
pub const ACCOUNT_COLUMNS: &[&str] = &["id", "slug", "name", "created_at"];

pub fn collection() -> Result<Collection, FilterError> {
    Collection::new("accounts", ACCOUNT_COLUMNS)
}

/// Minimal tenant projection handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub slug: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Id lookups never reveal whether the account exists.
    #[error("Account not found or access denied")]
    NotFoundOrDenied,

    /// Slug lookups may reveal absence.
    #[error("Account not found")]
    NotFound,

    #[error("Failed to validate account access")]
    InternalValidationError,
}

/// Result shape of both validation entry points. Validation never returns `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "tenant", skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountSummary>,
    #[serde(skip)]
    pub reason: Option<AccessError>,
}

impl AccessOutcome {
    pub fn granted(account: AccountSummary) -> Self {
        Self {
            success: true,
            error: None,
            account: Some(account),
            reason: None,
        }
    }

    pub fn denied(reason: AccessError) -> Self {
        Self {
            success: false,
            error: Some(reason.to_string()),
            account: None,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Tenant store error: {0}")]
pub struct StoreError(pub String);

/// Read-only view of accounts and their members. Absence is `Ok(None)`, never an error.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn select_by_id(&self, id: &str) -> Result<Option<AccountSummary>, StoreError>;

    async fn select_by_slug(&self, slug: &str) -> Result<Option<AccountSummary>, StoreError>;

    async fn is_member(&self, account_id: &str, caller_id: &str) -> Result<bool, StoreError>;
}
