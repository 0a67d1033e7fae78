//! 商品目录数据模型

use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

/// 商品文档
///
/// 只有 `_id` 是强类型的，其余字段原样保存在 `fields` 中：数据库里的文档
/// 结构并不固定（`likes` 可能是 Int32/Int64/Double，`price` 可能缺失），
/// 序列化时 `_id` 输出为 24 位十六进制字符串，其余字段输出为 relaxed extended JSON。
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ObjectId,
    pub fields: Document,
}

/// 文档的 `_id` 不是 ObjectId
#[derive(Debug, thiserror::Error)]
#[error("文档 _id 不是 ObjectId: {0:?}")]
pub struct InvalidDocumentId(pub Option<Bson>);

impl Product {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        let mut fields = Document::new();
        fields.insert("name", name.into());
        fields.insert("price", price);
        Self {
            id: ObjectId::new(),
            fields,
        }
    }

    pub fn with_likes(self, likes: i64) -> Self {
        self.with_field("likes", likes)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.fields.insert(key, value);
        self
    }

    /// 字符串类型的 `name`，缺失或类型不符时为 `None`
    pub fn name(&self) -> Option<&str> {
        self.fields.get_str("name").ok()
    }

    /// 数值类型的 `price`
    pub fn price(&self) -> Option<f64> {
        self.fields.get("price").and_then(numeric_f64)
    }

    /// 数值类型的 `likes`；缺失表示从未被点赞
    pub fn likes(&self) -> Option<i64> {
        self.fields.get("likes").and_then(numeric_i64)
    }
}

/// Int32、Int64、Double 统一为 f64
pub fn numeric_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Int32、Int64、有限的 Double（截断小数）统一为 i64
pub fn numeric_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.is_finite() => Some(*v as i64),
        _ => None,
    }
}

impl TryFrom<Document> for Product {
    type Error = InvalidDocumentId;

    fn try_from(mut document: Document) -> Result<Self, Self::Error> {
        match document.remove("_id") {
            Some(Bson::ObjectId(id)) => Ok(Self {
                id,
                fields: document,
            }),
            other => Err(InvalidDocumentId(other)),
        }
    }
}

impl Serialize for Product {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("_id", &self.id.to_hex())?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, &value.clone().into_relaxed_extjson())?;
        }
        map.end()
    }
}

/// 搜索查询参数
///
/// 从原始键值对中提取，`query` 重复出现时取第一个。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: Option<String>,
}

impl SearchParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let query = pairs
            .into_iter()
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value);
        Self { query }
    }
}

/// 点赞请求体
///
/// `product_id` 保留原始 JSON 值，类型错误（比如数字）按格式无效处理，
/// 而不是被当成缺失字段。
#[derive(Debug, Default, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub product_id: Option<serde_json::Value>,
}

/// 点赞响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message: String,
    pub product_id: String,
    pub new_likes: Option<i64>,
}

/// 一次自增更新的匹配/修改计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateCount {
    pub matched: u64,
    pub modified: u64,
}

/// 点赞结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// 自增成功，`likes` 为重新读取到的值
    Incremented { likes: Option<i64> },
    /// 匹配到文档但未修改
    Unmodified,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub timestamp: String,
}
