use crate::access;
use crate::handlers;
use crate::state::AppState;
use axum::{middleware, routing::get, Router};

pub fn router(state: AppState) -> Router {
    let report = Router::new()
        .route("/", get(handlers::index))
        .route("/api/report", get(handlers::get_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), access::guard));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(report)
        .with_state(state)
}
