// Admin handlers. The super-admin gate is evaluated on every request; nothing is cached.

pub mod accounts;
pub mod data_source;

use crate::auth::{super_admin_decision, AuthError, Caller, Session, SuperAdminDecision};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_super_admin(state: &AppState, session: &Session) -> Result<Caller, ApiError> {
    match super_admin_decision(state.identity.as_ref(), session).await? {
        SuperAdminDecision::Granted(caller) => Ok(caller),
        SuperAdminDecision::Anonymous => Err(AuthError::Unauthenticated("anonymous session".to_string()).into()),
        SuperAdminDecision::StepUpRequired(caller) => {
            tracing::warn!("Admin access for {} requires multi-factor step-up", caller.id);
            Err(ApiError::step_up_required("Multi-factor authentication required"))
        }
        SuperAdminDecision::NotSuperAdmin(caller) => {
            tracing::warn!("Admin access denied for {}", caller.id);
            Err(ApiError::forbidden("Super-admin access required"))
        }
    }
}
