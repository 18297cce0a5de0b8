//! Yardly 客户端库
//! 会话、带刷新重试的请求客户端、业务接口与查询缓存

pub mod availability;
pub mod cache;
pub mod client;
pub mod config;
pub mod cookies;
pub mod endpoints;
pub mod error;
pub mod media;
pub mod models;
pub mod queries;
pub mod session;
pub mod telemetry;

pub use client::{ApiClient, ApiRequest, RequestOptions};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use queries::Queries;
pub use session::{FileTokenStorage, MemoryTokenStorage, SessionStore, TokenStorage};
