use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::require_session;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .route("/health", get(handlers::health::health))
        // Session-guarded
        .merge(account_routes())
        .merge(admin_routes());

    let router = if state.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn account_routes() -> Router<AppState> {
    use handlers::accounts;

    Router::new()
        .route("/api/accounts/slug/:slug", get(accounts::account_by_slug))
        .route("/api/accounts/:id", get(accounts::account_by_id))
        .route_layer(middleware::from_fn(require_session))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route("/admin/accounts", get(admin::accounts::list_accounts))
        .route("/admin/data-source/health", get(admin::data_source::data_source_health))
        .route_layer(middleware::from_fn(require_session))
}
