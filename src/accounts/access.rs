use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::{AccessError, AccessOutcome, AccountSummary, TenantStore};

/// Decides whether a caller may act inside an account.
///
/// Both entry points end in `authorize`, the only place a grant is made.
#[derive(Clone)]
pub struct AccessValidator {
    store: Arc<dyn TenantStore>,
    audit: bool,
}

impl AccessValidator {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store, audit: false }
    }

    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    pub async fn validate_access(&self, caller_id: &str, account_id: &str) -> AccessOutcome {
        let outcome = AssertUnwindSafe(self.authorize(caller_id, account_id)).catch_unwind().await;
        self.finish(caller_id, account_id, outcome)
    }

    pub async fn validate_access_by_slug(&self, caller_id: &str, slug: &str) -> AccessOutcome {
        let outcome = AssertUnwindSafe(async {
            match self.store.select_by_slug(slug).await {
                Ok(Some(account)) => self.authorize(caller_id, &account.id).await,
                Ok(None) => Err(AccessError::NotFound),
                Err(e) => {
                    tracing::error!("Slug lookup for '{}' failed: {}", slug, e);
                    Err(AccessError::InternalValidationError)
                }
            }
        })
        .catch_unwind()
        .await;
        self.finish(caller_id, slug, outcome)
    }

    async fn authorize(&self, caller_id: &str, account_id: &str) -> Result<AccountSummary, AccessError> {
        let account = match self.store.select_by_id(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return Err(AccessError::NotFoundOrDenied),
            Err(e) => {
                tracing::error!("Account lookup for '{}' failed: {}", account_id, e);
                return Err(AccessError::NotFoundOrDenied);
            }
        };

        match self.store.is_member(&account.id, caller_id).await {
            Ok(true) => Ok(account),
            Ok(false) => Err(AccessError::NotFoundOrDenied),
            Err(e) => {
                tracing::error!("Membership lookup for '{}' in '{}' failed: {}", caller_id, account.id, e);
                Err(AccessError::InternalValidationError)
            }
        }
    }

    fn finish(
        &self,
        caller_id: &str,
        target: &str,
        outcome: std::thread::Result<Result<AccountSummary, AccessError>>,
    ) -> AccessOutcome {
        match outcome {
            Ok(Ok(account)) => {
                tracing::debug!("Caller {} granted access to account {}", caller_id, account.id);
                AccessOutcome::granted(account)
            }
            Ok(Err(reason)) => {
                if self.audit {
                    tracing::warn!("Caller {} denied access to '{}': {}", caller_id, target, reason);
                }
                AccessOutcome::denied(reason)
            }
            Err(_) => {
                tracing::error!("Access validation for '{}' panicked", target);
                AccessOutcome::denied(AccessError::InternalValidationError)
            }
        }
    }
}
