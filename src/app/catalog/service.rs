//! 商品目录业务服务

use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    model::{HealthStatus, LikeOutcome, LikeResponse, Product},
    repository::{ProductRepository, Storage, StorageError},
};
use crate::core::error::CoreError;

/// 热门商品数量
pub const POPULAR_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct CatalogService {
    storage: Storage,
}

impl CatalogService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn repository(&self) -> Result<&Arc<dyn ProductRepository>, CoreError> {
        match &self.storage {
            Storage::Available(repository) => Ok(repository),
            Storage::Unavailable(reason) => {
                debug!("数据库不可用: {}", reason);
                Err(CoreError::StorageUnavailable)
            }
        }
    }

    /// 数据接口在处理请求前先调用，数据库不可用时直接返回错误
    pub fn ensure_available(&self) -> Result<(), CoreError> {
        self.repository().map(|_| ())
    }

    /// 按名称前缀搜索商品，结果按价格降序
    pub async fn search(&self, term: Option<&str>) -> Result<Vec<Product>, CoreError> {
        let repository = self.repository()?;

        repository.search_by_name_prefix(term).await.map_err(|e| {
            error!("搜索失败, term={:?}: {}", term, e);
            CoreError::Internal("An error occurred during search".to_string())
        })
    }

    /// 为商品点赞
    ///
    /// `product_id` 是请求体中的原始值，缺失、非字符串或不是合法 ObjectId 都返回 400。
    pub async fn like(&self, product_id: Option<&Value>) -> Result<LikeResponse, CoreError> {
        self.ensure_available()?;

        let raw = product_id.filter(|v| !v.is_null()).ok_or_else(|| {
            CoreError::BadRequest("Missing 'product_id' in request body".to_string())
        })?;
        let (id_str, id) = parse_product_id(raw)?;

        let outcome = self.increment_likes(id).await?;
        let response = match outcome {
            LikeOutcome::Incremented { likes } => {
                info!("商品 {} 点赞成功, likes={:?}", id_str, likes);
                LikeResponse {
                    message: "Like registered successfully".to_string(),
                    product_id: id_str,
                    new_likes: likes,
                }
            }
            LikeOutcome::Unmodified => {
                warn!("商品 {} 已匹配但点赞数未修改", id_str);
                LikeResponse {
                    message: "Like registered but count not modified".to_string(),
                    product_id: id_str,
                    new_likes: None,
                }
            }
        };

        Ok(response)
    }

    /// 自增并回读新的点赞数
    pub async fn increment_likes(&self, id: ObjectId) -> Result<LikeOutcome, CoreError> {
        let repository = self.repository()?;
        let failed = |e: StorageError| {
            error!("点赞失败, id={}: {}", id, e);
            CoreError::Internal("An error occurred while liking the product".to_string())
        };

        let count = repository.increment_likes(id).await.map_err(failed)?;
        if count.matched == 0 {
            return Err(CoreError::NotFound("Product not found".to_string()));
        }
        if count.modified != 1 {
            return Ok(LikeOutcome::Unmodified);
        }

        let updated = repository.find_by_id(id).await.map_err(failed)?;
        Ok(LikeOutcome::Incremented {
            likes: updated.and_then(|p| p.likes()),
        })
    }

    /// 点赞数最高的商品，最多 `POPULAR_LIMIT` 个
    pub async fn popular(&self) -> Result<Vec<Product>, CoreError> {
        let repository = self.repository()?;

        repository.most_liked(POPULAR_LIMIT).await.map_err(|e| {
            error!("获取热门商品失败: {}", e);
            CoreError::Internal("An error occurred fetching popular products".to_string())
        })
    }

    pub async fn health(&self) -> HealthStatus {
        let database = match &self.storage {
            Storage::Available(repository) => match repository.ping().await {
                Ok(()) => "connected",
                Err(e) => {
                    warn!("数据库 ping 失败: {}", e);
                    "unreachable"
                }
            },
            Storage::Unavailable(_) => "unavailable",
        };

        HealthStatus {
            status: "ok".to_string(),
            database: database.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// 解析请求中的商品 ID
fn parse_product_id(raw: &Value) -> Result<(String, ObjectId), CoreError> {
    let invalid = || CoreError::BadRequest("Invalid product ID format".to_string());

    let id_str = raw.as_str().ok_or_else(invalid)?;
    let id = ObjectId::parse_str(id_str).map_err(|_| invalid())?;
    Ok((id_str.to_string(), id))
}
