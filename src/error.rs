//! 统一错误模型
//! 客户端的所有失败（传输、HTTP 4xx/5xx、解码、本地校验）都收敛为 ApiError

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// 客户端错误类型
///
/// 需要实现 `Clone`：同一次令牌刷新的结果会分发给所有等待者。
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// 传输层失败，没有拿到任何响应
    #[error("Transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// 后端返回非 2xx
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: String,
        payload: Option<Value>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 从状态码和解析后的响应体构造错误
    ///
    /// 消息优先取 `payload.error`，其次 `payload.message`，最后回落为 `HTTP <status>`。
    pub fn from_status(status: StatusCode, payload: Option<Value>) -> Self {
        let message = payload
            .as_ref()
            .and_then(|p| {
                p.get("error")
                    .and_then(Value::as_str)
                    .or_else(|| p.get("message").and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        ApiError::Http {
            status,
            message,
            payload,
        }
    }

    /// HTTP 状态码（仅 Http 变体有）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 获取错误码
    pub fn code(&self) -> Option<u16> {
        self.status().map(|s| s.as_u16())
    }

    /// 解析后的错误响应体
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ApiError::Http { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// 可以直接展示给用户的消息（不包含传输层细节）
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "Network error, please try again".to_string(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Decode(_) => "Unexpected response from server".to_string(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Config(_) => "Configuration error".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(Arc::new(e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for ApiError {
    fn from(e: config::ConfigError) -> Self {
        ApiError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}
