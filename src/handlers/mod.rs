// handlers/mod.rs - request handlers grouped by guard
//
// public:   /health
// session:  /api/accounts/*            (bearer session, membership checked per account)
// admin:    /admin/*                   (bearer session; super-admin where noted)

pub mod accounts;
pub mod admin;
pub mod health;

use crate::auth::{AuthError, Caller, Session};
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the caller for this request; anonymous sessions are rejected.
pub async fn require_caller(state: &AppState, session: &Session) -> Result<Caller, ApiError> {
    match state.identity.current_user(session).await {
        Ok(Some(caller)) => Ok(caller),
        Ok(None) => Err(AuthError::Unauthenticated("anonymous session".to_string()).into()),
        Err(e) => Err(e.into()),
    }
}
