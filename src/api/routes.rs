//! Router construction

use super::handlers::{self, AppState};
use crate::fabric::Fabric;
use axum::{routing::get, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Build the router with all triple routes and middlewares
pub fn build_router(fabric: Fabric, body_limit: usize) -> Router {
    let state = AppState { fabric };

    Router::new()
        .route(
            "/triples",
            get(handlers::query_triples)
                .post(handlers::insert_triple)
                .patch(handlers::reweight_triples)
                .delete(handlers::delete_triples),
        )
        .route("/triples/count", get(handlers::count_triples))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
