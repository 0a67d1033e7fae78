//! 页面与静态资源

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use super::catalog::AppState;
use crate::config::WebConfig;

pub fn routes(web: &WebConfig) -> Router<AppState> {
    Router::new()
        .route_service(
            "/",
            ServeFile::new(web.templates_dir.join("homepage.html")),
        )
        .route_service(
            "/products",
            ServeFile::new(web.templates_dir.join("products.html")),
        )
        .nest_service("/static", ServeDir::new(&web.static_dir))
}
