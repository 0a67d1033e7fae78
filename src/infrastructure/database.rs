//! 数据库基础设施

use mongodb::{bson::doc, error::Error, options::ClientOptions, Client, Database};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::app::catalog::{MongoProductRepository, Storage};
use crate::config::DatabaseConfig;

pub struct DatabaseManager {
    database: Database,
}

impl DatabaseManager {
    /// 建立连接并 ping 一次，确认服务器可达
    pub async fn connect(uri: &str, config: &DatabaseConfig) -> Result<Self, Error> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(Duration::from_millis(config.connect_timeout_ms));
        options.server_selection_timeout =
            Some(Duration::from_millis(config.server_selection_timeout_ms));

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        database.run_command(doc! { "ping": 1 }).await?;

        Ok(Self { database })
    }

    pub fn get_database(&self) -> &Database {
        &self.database
    }
}

/// 根据配置构建存储句柄
///
/// 连接字符串缺失或连接失败时返回 `Storage::Unavailable`，页面接口仍可用。
pub async fn connect_storage(config: &DatabaseConfig) -> Storage {
    let Some(uri) = config.connection_uri() else {
        error!("未配置 MongoDB 连接字符串，数据接口不可用");
        return Storage::unavailable("MONGO_URI not set");
    };

    let manager = match DatabaseManager::connect(uri, config).await {
        Ok(manager) => manager,
        Err(e) => {
            error!("连接 MongoDB 失败: {}", e);
            return Storage::unavailable(e.to_string());
        }
    };
    info!("MongoDB 连接成功, 数据库: {}", config.database);

    let repository =
        MongoProductRepository::new(manager.get_database().clone(), &config.collection);
    match repository.count().await {
        Ok(count) => info!("集合 '{}' 中共有 {} 个文档", config.collection, count),
        Err(e) => warn!("统计集合 '{}' 文档数失败: {}", config.collection, e),
    }

    Storage::available(repository)
}
