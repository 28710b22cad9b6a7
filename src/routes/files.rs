use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// File Router Module
///
/// The file API, mounted under `/api/files`. Both routes delegate straight to their
/// handlers; the router itself validates nothing about the payload.
///
/// Access Control:
/// `create_router` wraps this router in the authentication gate with `route_layer`,
/// so a rejected request never reaches a handler while unknown paths and methods
/// still fall through to the default 404/405.
pub fn file_routes() -> Router<AppState> {
    Router::new()
        // POST /upload
        // Multipart upload of a single `file` field into the classroom bucket.
        .route("/upload", post(handlers::upload_file))
        // GET /
        // Lists every stored file with its public URL.
        .route("/", get(handlers::list_files))
}
