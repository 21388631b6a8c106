use std::sync::Arc;

use axum::{routing::post, Router};
use tower_http::cors::CorsLayer;
use tower::ServiceBuilder;
use axum::extract::DefaultBodyLimit;

use crate::pipeline::Pipeline;
use super::handlers::*;

pub fn create_router(pipeline: Arc<Pipeline>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", post(upload_image))
        .with_state(pipeline)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(max_body_bytes)) // base64 inflates uploads by a third
                .layer(CorsLayer::permissive())
        )
}
