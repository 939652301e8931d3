use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api::handlers;
use crate::jobs::JobQueue;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub queue: JobQueue,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/reports", post(handlers::create_report))
        .route("/reports", get(handlers::list_reports))
        .route("/reports/:id", get(handlers::get_report))
        .route(
            "/reports/:id/transactions",
            get(handlers::get_report_transactions),
        )
        .route("/reports/:id/export", get(handlers::export_report))
        .route("/crossings", post(handlers::create_crossing))
        .route("/crossings", get(handlers::list_crossings))
        .route("/crossings/:id", get(handlers::get_crossing))
        .route("/crossings/:id/export", get(handlers::export_crossing))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port, "api server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
