//! Capplan Web Server
//!
//! Axum-based REST API over a quarter record store.

pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use capplan_core::RecordStore;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/quarters",
            get(routes::quarters::list_quarters).post(routes::quarters::create_quarter),
        )
        .route("/quarters/active", get(routes::quarters::get_active_quarter))
        .route(
            "/quarters/{id}",
            get(routes::quarters::get_quarter)
                .put(routes::quarters::update_quarter)
                .delete(routes::quarters::delete_quarter),
        )
        .route(
            "/quarters/{id}/activate",
            post(routes::quarters::activate_quarter),
        )
        .route("/quarters/{id}/baseline", post(routes::quarters::set_baseline))
        .route("/quarters/{id}/summary", get(routes::quarters::get_summary))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server.
pub async fn run_server(store: Arc<dyn RecordStore>, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(store);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("Web server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}
