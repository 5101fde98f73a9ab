//! Print API module
//!
//! Every route runs exactly one print job; a second request waits for the printer.

mod handler;

use axum::{Router, extract::DefaultBodyLimit, routing::post};

use crate::AppState;

/// Largest accepted image upload (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new().nest("/print", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/text", post(handler::text))
        .route("/receipt", post(handler::receipt))
        .route("/joke", post(handler::joke))
        .route("/fortune", post(handler::fortune))
        .route("/qr", post(handler::qr))
        .route("/barcode", post(handler::barcode))
        .route(
            "/image",
            post(handler::image).layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE)),
        )
        .route("/image-url", post(handler::image_url))
        .route("/url", post(handler::url_form))
}
