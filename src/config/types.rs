//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM 配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 书稿输出配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,

    /// 流水线配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

// ============================================================================
// Server
// ============================================================================

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体上限（MB）
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// 允许跨域的来源，为空时允许任意来源
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

fn default_body_limit_mb() -> usize {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_mb: default_body_limit_mb(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// LLM
// ============================================================================

/// 生成服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Gemini generateContent 接口
    Gemini,
    /// 本地确定性生成，不访问网络
    Fake,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::Fake => "fake",
        }
    }
}

/// LLM 配置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,

    /// 服务基础 URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// provider 为 gemini 时必填
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_outline_tokens")]
    pub max_outline_tokens: u32,

    #[serde(default = "default_max_chapter_tokens")]
    pub max_chapter_tokens: u32,

    #[serde(default = "default_max_summary_tokens")]
    pub max_summary_tokens: u32,

    /// fake provider 生成的章节数
    #[serde(default = "default_fake_chapters")]
    pub fake_chapters: u32,
}

fn default_provider() -> LlmProvider {
    LlmProvider::Gemini
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_llm_timeout() -> u64 {
    180
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_outline_tokens() -> u32 {
    4096
}

fn default_max_chapter_tokens() -> u32 {
    8192
}

fn default_max_summary_tokens() -> u32 {
    500
}

fn default_fake_chapters() -> u32 {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
            max_outline_tokens: default_max_outline_tokens(),
            max_chapter_tokens: default_max_chapter_tokens(),
            max_summary_tokens: default_max_summary_tokens(),
            fake_chapters: default_fake_chapters(),
        }
    }
}

// ============================================================================
// Database
// ============================================================================

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/bookforge.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

// ============================================================================
// Storage
// ============================================================================

/// 书稿输出配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 书稿输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 输出格式（md / txt）
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/manuscripts")
}

fn default_formats() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string()]
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            formats: default_formats(),
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// 通知配置
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// 未设置时只做 WebSocket 广播
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// webhook 超时时间（秒）
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_webhook_timeout(),
        }
    }
}

impl NotificationConfig {
    /// 非空的 webhook 地址
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// 流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 请求未指定时是否自动批准大纲和章节
    #[serde(default)]
    pub auto_approve: bool,

    /// 同时运行的书籍数
    #[serde(default = "default_max_concurrent_books")]
    pub max_concurrent_books: usize,

    /// 任务队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent_books() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_approve: false,
            max_concurrent_books: default_max_concurrent_books(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

// ============================================================================
// Log
// ============================================================================

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5070);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.database.path, "data/bookforge.db");
        assert_eq!(config.storage.formats, vec!["md", "txt"]);
        assert!(!config.pipeline.auto_approve);
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/bookforge.db?mode=rwc");
    }

    #[test]
    fn test_blank_webhook_is_ignored() {
        let mut config = NotificationConfig::default();
        assert!(config.webhook().is_none());

        config.webhook_url = Some("   ".to_string());
        assert!(config.webhook().is_none());

        config.webhook_url = Some("https://hooks.example.com/x".to_string());
        assert_eq!(config.webhook(), Some("https://hooks.example.com/x"));
    }

    #[test]
    fn test_provider_deserializes_lowercase() {
        let provider: LlmProvider = serde_json::from_str("\"fake\"").unwrap();
        assert_eq!(provider, LlmProvider::Fake);
    }
}
