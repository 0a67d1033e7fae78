//! # Eshop 商品目录服务
//!
//! 提供两个静态页面和三个数据接口：
//! - `GET /search?query=` 按名称前缀搜索（不区分大小写），按价格降序
//! - `POST /like` 原子地为商品点赞
//! - `GET /popular-products` 点赞最多的 5 个商品
//!
//! 分层结构：
//! - `app` 应用层（处理器、业务服务、存储实现）
//! - `core` 核心层（错误处理、中间件）
//! - `infrastructure` 基础设施层（MongoDB 连接、日志）

pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use app::catalog::handler::{health_check, like_product, popular_products, search_products};
pub use app::catalog::AppState;
use config::AppConfig;
use crate::core::middleware::request_logging_middleware;

/// 数据接口路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_products))
        .route("/like", post(like_product))
        .route("/popular-products", get(popular_products))
        .route("/health", get(health_check))
}

/// 组装完整应用：页面 + 数据接口 + 中间件
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .merge(app::pages::routes(&config.web))
        .merge(api_routes())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.timeout_seconds,
        )))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
