//! 内存商品存储实现
//!
//! 语义与 MongoDB 实现一致：前缀匹配不区分大小写，排序稳定（相同键按插入顺序），
//! 自增在写锁内完成。

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson};
use std::cmp::Ordering;
use tokio::sync::RwLock;

use super::{
    model::{Product, UpdateCount},
    repository::{normalize_term, ProductRepository, StorageError},
};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    pub async fn insert(&self, product: Product) {
        self.products.write().await.push(product);
    }

    /// 当前全部商品（插入顺序）
    pub async fn snapshot(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }
}

fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// 降序比较，缺失值排在最后
fn descending<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `$inc: 1` 的效果：保留原数值类型，缺失时置为 1
fn incremented(current: Option<&Bson>) -> Result<Bson, StorageError> {
    match current {
        None => Ok(Bson::Int32(1)),
        Some(Bson::Int32(v)) => Ok(v
            .checked_add(1)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i64::from(*v) + 1))),
        Some(Bson::Int64(v)) => v
            .checked_add(1)
            .map(Bson::Int64)
            .ok_or_else(|| StorageError::InvalidDocument("likes overflow".to_string())),
        Some(Bson::Double(v)) => Ok(Bson::Double(v + 1.0)),
        Some(other) => Err(StorageError::InvalidDocument(format!(
            "cannot increment non-numeric likes: {}",
            other
        ))),
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn search_by_name_prefix(
        &self,
        term: Option<&str>,
    ) -> Result<Vec<Product>, StorageError> {
        let products = self.products.read().await;
        let mut matched: Vec<Product> = match normalize_term(term) {
            Some(term) => products
                .iter()
                .filter(|p| p.name().is_some_and(|name| has_prefix_ignore_case(name, term)))
                .cloned()
                .collect(),
            None => products.clone(),
        };

        matched.sort_by(|a, b| descending(a.price(), b.price()));
        Ok(matched)
    }

    async fn increment_likes(&self, id: ObjectId) -> Result<UpdateCount, StorageError> {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                let likes = incremented(product.fields.get("likes"))?;
                product.fields.insert("likes", likes);
                Ok(UpdateCount {
                    matched: 1,
                    modified: 1,
                })
            }
            None => Ok(UpdateCount {
                matched: 0,
                modified: 0,
            }),
        }
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Product>, StorageError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn most_liked(&self, limit: i64) -> Result<Vec<Product>, StorageError> {
        let mut products = self.products.read().await.clone();
        products.sort_by(|a, b| descending(a.likes(), b.likes()));
        products.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(products)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
