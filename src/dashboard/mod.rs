//! Browser dashboard: a JSON API over one shared [`MetricStore`] plus a static page.
//!
//! Store calls are short local-file operations and run inline on the request task.

mod error;
mod handlers;

pub use error::ApiError;

use crate::errors::AppResult;
use crate::store::MetricStore;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

pub type SharedStore = Arc<MetricStore>;

pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/records",
            get(handlers::list_records)
                .post(handlers::add_record)
                .delete(handlers::clear_records),
        )
        .route("/api/metrics", get(handlers::list_metrics))
        .route("/api/series", get(handlers::series))
        .route("/api/export", get(handlers::export_csv))
        .route("/api/import", post(handlers::import_csv))
        .route("/api/reload", post(handlers::reload))
        .with_state(store)
}

pub async fn serve(store: SharedStore, listen: SocketAddr) -> AppResult<()> {
    let app = build_router(store);

    tracing::info!(%listen, "dashboard starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
