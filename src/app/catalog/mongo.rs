//! MongoDB 商品存储实现

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Collection, Database,
};
use tracing::warn;

use super::{
    model::{Product, UpdateCount},
    repository::{normalize_term, ProductRepository, StorageError},
};

pub struct MongoProductRepository {
    database: Database,
    collection: Collection<Document>,
}

impl MongoProductRepository {
    pub fn new(database: Database, collection_name: &str) -> Self {
        let collection = database.collection::<Document>(collection_name);
        Self {
            database,
            collection,
        }
    }

    pub async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

/// 把查询结果转换为商品，`_id` 不是 ObjectId 的文档记录警告后跳过
fn decode_products(documents: Vec<Document>) -> Vec<Product> {
    documents
        .into_iter()
        .filter_map(|document| match Product::try_from(document) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!("跳过无法识别的商品文档: {}", e);
                None
            }
        })
        .collect()
}

/// 构造名称前缀过滤条件
///
/// 搜索词按字面量处理：先转义正则元字符，再用 `^` 锚定开头，`i` 忽略大小写。
pub fn name_prefix_filter(term: Option<&str>) -> Document {
    match normalize_term(term) {
        Some(term) => doc! {
            "name": {
                "$regex": format!("^{}", regex::escape(term)),
                "$options": "i",
            }
        },
        None => doc! {},
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    async fn search_by_name_prefix(
        &self,
        term: Option<&str>,
    ) -> Result<Vec<Product>, StorageError> {
        let cursor = self
            .collection
            .find(name_prefix_filter(term))
            .sort(doc! { "price": -1, "_id": 1 })
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(decode_products(documents))
    }

    async fn increment_likes(&self, id: ObjectId) -> Result<UpdateCount, StorageError> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$inc": { "likes": 1 } })
            .await?;

        Ok(UpdateCount {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Product>, StorageError> {
        let document = self.collection.find_one(doc! { "_id": id }).await?;
        document
            .map(Product::try_from)
            .transpose()
            .map_err(|e| StorageError::InvalidDocument(e.to_string()))
    }

    async fn most_liked(&self, limit: i64) -> Result<Vec<Product>, StorageError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "likes": -1, "_id": 1 })
            .limit(limit)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(decode_products(documents))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
