//! Configuration Loader
//!
//! 多源配置加载与合并
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, LlmProvider};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 支持的书稿格式
const SUPPORTED_FORMATS: &[&str] = &["md", "markdown", "txt", "text"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `BOOKFORGE_SERVER__PORT=8080`
/// - `BOOKFORGE_LLM__PROVIDER=fake`
/// - `BOOKFORGE_LLM__API_KEY=...`
/// - `BOOKFORGE_STORAGE__FORMATS=md,txt`
/// - `BOOKFORGE_PIPELINE__AUTO_APPROVE=true`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置，`None` 时搜索默认文件名
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 默认值由 AppConfig 的 serde default 提供

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 前缀 BOOKFORGE_，层级分隔符 __，例如 BOOKFORGE_LLM__MODEL
    builder = builder.add_source(
        Environment::with_prefix("BOOKFORGE")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("storage.formats")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }
    if config.server.body_limit_mb == 0 {
        return Err(ConfigError::ValidationError(
            "server.body_limit_mb cannot be 0".to_string(),
        ));
    }

    if config.llm.provider == LlmProvider::Gemini {
        if config.llm.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.api_key is required when llm.provider is gemini".to_string(),
            ));
        }
        if config.llm.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.base_url cannot be empty".to_string(),
            ));
        }
    }

    if config.llm.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "llm.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.storage.formats.is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.formats cannot be empty".to_string(),
        ));
    }
    if let Some(unknown) = config
        .storage
        .formats
        .iter()
        .find(|f| !SUPPORTED_FORMATS.contains(&f.to_ascii_lowercase().as_str()))
    {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported manuscript format: {}",
            unknown
        )));
    }

    if config.pipeline.max_concurrent_books == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_books cannot be 0".to_string(),
        ));
    }
    if config.pipeline.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.queue_capacity cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（启动日志，不输出 api_key）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("LLM Provider: {}", config.llm.provider.as_str());
    if config.llm.provider == LlmProvider::Gemini {
        tracing::info!("LLM Endpoint: {}", config.llm.base_url);
        tracing::info!("LLM Model: {}", config.llm.model);
        tracing::info!("LLM Timeout: {}s", config.llm.timeout_secs);
    }
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Output Directory: {:?}", config.storage.output_dir);
    tracing::info!("Output Formats: {}", config.storage.formats.join(", "));
    tracing::info!(
        "Webhook: {}",
        config.notification.webhook().unwrap_or("disabled")
    );
    tracing::info!("Auto Approve: {}", config.pipeline.auto_approve);
    tracing::info!("Max Concurrent Books: {}", config.pipeline.max_concurrent_books);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = AppConfig::default();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_body_limit() {
        let mut config = valid_config();
        config.server.body_limit_mb = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_formats() {
        let mut config = valid_config();
        config.storage.formats = vec![];
        assert!(validate_config(&config).is_err());

        config.storage.formats = vec!["md".to_string(), "pdf".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = valid_config();
        config.pipeline.max_concurrent_books = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000
cors_origins = ["https://editor.example"]

[llm]
provider = "fake"
fake_chapters = 5

[storage]
formats = ["md"]

[pipeline]
auto_approve = true
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.body_limit_mb, 8);
        assert_eq!(config.server.cors_origins, vec!["https://editor.example"]);
        assert_eq!(config.llm.provider, LlmProvider::Fake);
        assert_eq!(config.llm.fake_chapters, 5);
        assert_eq!(config.storage.formats, vec!["md"]);
        assert!(config.pipeline.auto_approve);
        assert_eq!(config.database.path, "data/bookforge.db");
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = load_config_from_path(Some(Path::new("/nonexistent/bookforge.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
