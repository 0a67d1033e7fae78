//! 服务配置
//!
//! 配置优先从 `config.toml` 或 `./config/config.toml` 读取，找不到时使用默认值，
//! 之后再用环境变量覆盖（`MONGO_URI`、`PORT`、`BIND_ADDRESS`）。
//! 工作目录下的 `.env` 文件作为环境变量的补充，进程环境变量优先。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_PATHS: [&str; 2] = ["config.toml", "./config/config.toml"];
const DOTENV_FILE: &str = ".env";

/// 服务配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// MongoDB 配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 页面与静态资源配置
    pub web: WebConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// MongoDB 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 连接字符串，缺失时服务以"数据库不可用"模式运行
    pub uri: Option<String>,
    /// 数据库名称
    pub database: String,
    /// 集合名称
    pub collection: String,
    pub connect_timeout_ms: u64,
    pub server_selection_timeout_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志目录
    pub log_dir: PathBuf,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 是否写入按日期分割的日志文件
    pub file_output: bool,
}

/// 页面与静态资源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "Eshop".to_string(),
            collection: "products".to_string(),
            connect_timeout_ms: 5000,
            server_selection_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            file_prefix: "eshop".to_string(),
            level: "info".to_string(),
            console_output: true,
            file_output: true,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("web/templates"),
            static_dir: PathBuf::from("web/static"),
        }
    }
}

impl DatabaseConfig {
    /// 非空的连接字符串
    pub fn connection_uri(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
    }
}

impl AppConfig {
    /// 加载配置：配置文件（可选）+ 环境变量覆盖 + 校验
    ///
    /// 此时日志系统尚未初始化，加载来源通过 `ConfigSources` 返回，由调用方记录。
    pub fn load() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_in(Path::new("."), |key| std::env::var(key).ok())
    }

    /// 以 `base` 为工作目录加载配置，`lookup` 为进程环境变量
    pub fn load_in<F>(base: &Path, lookup: F) -> Result<(Self, ConfigSources), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = CONFIG_PATHS
            .iter()
            .map(|path| base.join(path))
            .find(|path| path.exists());
        let mut config = match &file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        let dotenv_path = base.join(DOTENV_FILE);
        let (dotenv, dotenv_path) = if dotenv_path.exists() {
            (read_dotenv(&dotenv_path)?, Some(dotenv_path))
        } else {
            (HashMap::new(), None)
        };

        config.apply_env_overrides(|key| lookup(key).or_else(|| dotenv.get(key).cloned()))?;
        config.validate()?;

        Ok((
            config,
            ConfigSources {
                file,
                dotenv: dotenv_path,
            },
        ))
    }

    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 用环境变量覆盖配置项
    ///
    /// `lookup` 抽象了环境变量读取，测试里可以直接传入闭包。
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("MONGO_URI") {
            self.database.uri = Some(uri);
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|e| ConfigError::InvalidEnv {
                key: "PORT".to_string(),
                reason: format!("{}", e),
            })?;
        }

        if let Some(bind_address) = lookup("BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.database.is_empty() {
            return Err(ConfigError::Validation("数据库名称不能为空".to_string()));
        }
        if self.database.collection.is_empty() {
            return Err(ConfigError::Validation("集合名称不能为空".to_string()));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Validation("HTTP端口必须大于0".to_string()));
        }
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }

    /// 监听地址，形如 `0.0.0.0:5000`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

/// 配置实际读取的文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    pub file: Option<PathBuf>,
    pub dotenv: Option<PathBuf>,
}

/// 读取 `.env` 文件中的键值对，不修改进程环境变量
pub fn read_dotenv<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, ConfigError> {
    dotenvy::from_path_iter(path.as_ref())
        .map_err(|e| ConfigError::FileRead(e.to_string()))?
        .map(|item| item.map_err(|e| ConfigError::Parse(e.to_string())))
        .collect()
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("环境变量 {key} 无效: {reason}")]
    InvalidEnv { key: String, reason: String },
    #[error("配置验证错误: {0}")]
    Validation(String),
}
