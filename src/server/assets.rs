//! Static UI assets.
//!
//! Files are served from a directory. Extension-less paths are client-side
//! routes: they fall back to `index.html` and are never cached.

use std::path::Path;

use axum::extract::Request;
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};

const NO_STORE: &str = "no-cache, no-store, must-revalidate, max-age=0";

/// Router serving `dir` for every path it is mounted under as a fallback.
pub fn router(dir: &Path) -> Router {
    let serve = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
    let service = ServiceBuilder::new()
        .layer(middleware::from_fn(no_store_for_pages))
        .service(serve);

    Router::new().fallback_service(service)
}

async fn no_store_for_pages(request: Request, next: Next) -> Response {
    let is_page = Path::new(request.uri().path()).extension().is_none();
    let mut response = next.run(request).await;
    if is_page {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    }
    response
}
