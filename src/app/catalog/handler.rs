//! 商品目录处理器

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
};
use tracing::{debug, warn};

use super::{
    model::{HealthStatus, LikeRequest, LikeResponse, Product, SearchParams},
    service::CatalogService,
};
use crate::core::error::CoreError;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }
}

/// GET /search?query=<term>
pub async fn search_products(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Product>>, CoreError> {
    let Query(pairs) = query.map_err(|rejection| {
        warn!("无法解析查询参数: {}", rejection);
        CoreError::BadRequest("Invalid query string".to_string())
    })?;
    let params = SearchParams::from_pairs(pairs);

    let products = state.catalog.search(params.query.as_deref()).await?;
    debug!("搜索 {:?} 命中 {} 个商品", params.query, products.len());
    Ok(Json(products))
}

/// POST /like
///
/// 请求体无法解析时按缺少 `product_id` 处理；数据库不可用的检查先于请求体检查。
pub async fn like_product(
    State(state): State<AppState>,
    payload: Result<Json<LikeRequest>, JsonRejection>,
) -> Result<Json<LikeResponse>, CoreError> {
    state.catalog.ensure_available()?;

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("无法解析点赞请求体: {}", rejection);
            LikeRequest::default()
        }
    };

    let response = state.catalog.like(request.product_id.as_ref()).await?;
    Ok(Json(response))
}

/// GET /popular-products
pub async fn popular_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, CoreError> {
    let products = state.catalog.popular().await?;
    Ok(Json(products))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.catalog.health().await)
}
