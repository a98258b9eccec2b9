//! HTTP handler for the embedded chat page.

use axum::{
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::static_assets;

const INDEX: &str = "index.html";

fn asset_response(path: &str) -> Option<Response> {
    let content = static_assets::Assets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(
        (
            [
                (header::CONTENT_TYPE, mime.as_ref().to_string()),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            content.data.into_owned(),
        )
            .into_response(),
    )
}

/// Serve an embedded asset, falling back to the chat page for unknown paths.
/// Anything other than GET or HEAD is a 404.
#[instrument]
pub async fn serve_embedded_asset(method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() || path.ends_with('/') { INDEX } else { path };

    if let Some(response) = asset_response(path) {
        return response;
    }

    debug!("No embedded asset for {}, serving chat page", uri.path());
    asset_response(INDEX).unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
}
