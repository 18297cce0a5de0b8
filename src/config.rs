//! 配置系统
//! 从环境变量加载客户端配置（前缀 YARDLY_，层级分隔符 __）

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后端地址，例如 "http://localhost:8080"
    pub base_url: String,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 访问令牌持久化文件
    pub storage_path: PathBuf,
    /// 刷新 cookie 持久化文件
    pub cookie_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty, compact
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

impl ClientConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.timeout_secs", 30)?
            .set_default(
                "session.storage_path",
                default_storage_path().to_string_lossy().to_string(),
            )?
            .set_default(
                "session.cookie_path",
                default_cookie_path().to_string_lossy().to_string(),
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(
                Environment::with_prefix("YARDLY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: ClientConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// 指定后端地址，其余使用默认值
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                timeout_secs: 30,
            },
            session: SessionConfig {
                storage_path: default_storage_path(),
                cookie_path: default_cookie_path(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Message(format!("Invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Message(format!(
                "api.base_url must use http or https, got: {}",
                url.scheme()
            )));
        }

        if self.api.timeout_secs == 0 || self.api.timeout_secs > 300 {
            return Err(ConfigError::Message(
                "api.timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty, compact",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}

fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".yardly")
}

fn default_storage_path() -> PathBuf {
    state_dir().join("session.json")
}

fn default_cookie_path() -> PathBuf {
    state_dir().join("cookies.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "YARDLY_API__BASE_URL",
            "YARDLY_API__TIMEOUT_SECS",
            "YARDLY_SESSION__STORAGE_PATH",
            "YARDLY_SESSION__COOKIE_PATH",
            "YARDLY_LOGGING__LEVEL",
            "YARDLY_LOGGING__FORMAT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.session.storage_path.ends_with("session.json"));
        assert!(config.session.cookie_path.ends_with("cookies.json"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("YARDLY_API__BASE_URL", "https://api.yardly.test");
        std::env::set_var("YARDLY_API__TIMEOUT_SECS", "5");
        std::env::set_var("YARDLY_SESSION__STORAGE_PATH", "/tmp/yardly-test/session.json");
        std::env::set_var("YARDLY_SESSION__COOKIE_PATH", "/tmp/yardly-test/cookies.json");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api.base_url, "https://api.yardly.test");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(
            config.session.storage_path,
            PathBuf::from("/tmp/yardly-test/session.json")
        );
        assert_eq!(
            config.session.cookie_path,
            PathBuf::from("/tmp/yardly-test/cookies.json")
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_base_url_rejected() {
        clear_env();
        std::env::set_var("YARDLY_API__BASE_URL", "ftp://files.example.com");
        assert!(ClientConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_validate_timeout_and_logging() {
        let mut config = ClientConfig::with_base_url("http://127.0.0.1:8080");
        assert!(config.validate().is_ok());

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.api.timeout_secs = 10;
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        config.logging.format = "json".to_string();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
