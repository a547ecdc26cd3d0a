use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use super::require_super_admin;
use crate::accounts;
use crate::auth::Session;
use crate::filter::SortDirection;
use crate::middleware::{ApiResponse, ApiResult};
use crate::query::{fetch_page, PageRequest, PageResult, QueryError, Row};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub slug: Option<String>,
}

/// GET /admin/accounts - paginated account listing for super-admins
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<AccountListQuery>,
) -> ApiResult<PageResult<Row>> {
    require_super_admin(&state, &session).await?;

    let request = PageRequest::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(state.query.default_page_size),
        state.query.max_page_size,
    )?;
    let collection = accounts::collection().map_err(QueryError::from)?;

    let page = fetch_page(state.rows.as_ref(), collection, request, |query| {
        if let Some(slug) = params.slug.as_deref() {
            query.eq("slug", slug)?;
        }
        if let Some(term) = params.search.as_deref() {
            query.ilike_any(&["name", "slug"], term)?;
        }
        query.order_by("name", SortDirection::Asc)?;
        Ok(())
    })
    .await?;

    Ok(ApiResponse::success(page))
}
