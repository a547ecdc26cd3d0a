use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;

use crate::auth::Session;
use crate::datasource::probe;
use crate::error::ApiError;
use crate::handlers::require_caller;
use crate::state::AppState;

/// GET /admin/data-source/health - diagnostic probe of the secondary database
pub async fn data_source_health(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, ApiError> {
    let caller = require_caller(&state, &session).await?;
    tracing::debug!("Data source probe requested by {}", caller.id);

    match probe::run(&state.data_source, &state.sample_query).await {
        Ok(report) => Ok((StatusCode::OK, Json(report)).into_response()),
        Err(e) => {
            tracing::error!("Data source probe failed: {}", e);
            // The probe is diagnostic, so the body keeps the backend message.
            let status = ApiError::from(e.clone()).status_code();
            Ok((status, Json(json!({ "success": false, "error": e.to_string() }))).into_response())
        }
    }
}
