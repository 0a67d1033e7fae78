//! 商品存储抽象

use async_trait::async_trait;
use std::sync::Arc;
use mongodb::bson::oid::ObjectId;

use super::model::{Product, UpdateCount};

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 名称前缀匹配（不区分大小写），按价格降序；`None` 或空串匹配全部
    async fn search_by_name_prefix(&self, term: Option<&str>)
        -> Result<Vec<Product>, StorageError>;

    /// 单文档原子自增 `likes`
    async fn increment_likes(&self, id: ObjectId) -> Result<UpdateCount, StorageError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Product>, StorageError>;

    /// 按点赞数降序取前 `limit` 个
    async fn most_liked(&self, limit: i64) -> Result<Vec<Product>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}

/// 空串视为未提供搜索词
pub fn normalize_term(term: Option<&str>) -> Option<&str> {
    term.filter(|t| !t.is_empty())
}

/// 注入到请求处理器中的存储句柄
///
/// 启动时连接失败不会终止进程，而是进入 `Unavailable`，数据接口统一返回 500。
#[derive(Clone)]
pub enum Storage {
    Available(Arc<dyn ProductRepository>),
    Unavailable(Arc<str>),
}

impl Storage {
    pub fn available<R: ProductRepository + 'static>(repository: R) -> Self {
        Storage::Available(Arc::new(repository))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Storage::Unavailable(Arc::from(reason.into()))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Storage::Available(_))
    }
}
