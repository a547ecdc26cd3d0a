use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use super::require_caller;
use crate::accounts::AccessOutcome;
use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/accounts/:id
pub async fn account_by_id(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let caller = require_caller(&state, &session).await?;
    Ok(outcome_response(state.access.validate_access(&caller.id, &id).await))
}

/// GET /api/accounts/slug/:slug
pub async fn account_by_slug(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let caller = require_caller(&state, &session).await?;
    Ok(outcome_response(state.access.validate_access_by_slug(&caller.id, &slug).await))
}

fn outcome_response(outcome: AccessOutcome) -> Response {
    let status = match outcome.reason.clone() {
        None => StatusCode::OK,
        Some(reason) => ApiError::from(reason).status_code(),
    };
    (status, Json(outcome)).into_response()
}
