use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The Mini App is served from Telegram's web view on another origin.
pub fn mini_app_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any)
}
