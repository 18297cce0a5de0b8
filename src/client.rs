//! 带认证的 API 客户端
//!
//! 所有后端调用都经过 [`ApiClient::fetch_body`]：
//! - 按需附加 `Authorization: Bearer <token>`
//! - 收到 401 时执行一次刷新，然后用新令牌重发原请求，且只重发一次
//! - 并发的 401 共享同一个进行中的刷新（single-flight），不会重复调用刷新接口

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ApiConfig, ClientConfig};
use crate::cookies::CookieJar;
use crate::error::{ApiError, ApiResult};
use crate::session::{FileTokenStorage, SessionStore};

/// 刷新接口路径，发往该路径的请求永远不会触发刷新
pub const REFRESH_PATH: &str = "/api/auth/refresh";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// 单次调用的选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// 持有令牌时附加 bearer 头
    pub auth: bool,
    /// 401 时执行一次刷新并重试
    pub retry_401: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            auth: true,
            retry_401: true,
        }
    }
}

impl RequestOptions {
    /// 公开接口：不带令牌
    pub fn public() -> Self {
        Self {
            auth: false,
            ..Self::default()
        }
    }

    pub fn without_retry(self) -> Self {
        Self {
            retry_401: false,
            ..self
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
}

/// 请求描述（方法、请求体、额外请求头）
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// 设置 JSON 请求体
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// 解析后的响应体：能解析成 JSON 就是 JSON，否则原始文本，空响应为 Empty
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn parse(text: String) -> Self {
        if text.is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn into_payload(self) -> Option<Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(s) => Some(Value::String(s)),
            ResponseBody::Empty => None,
        }
    }

    /// 解码为目标类型；空响应按 `null` 处理，因此可以解码为 `()` 或 `Option<T>`
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<T> {
        let value = self.into_payload().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

type RefreshFuture = Shared<BoxFuture<'static, ApiResult<()>>>;

struct ClientInner {
    http: Client,
    base_url: String,
    session: Arc<SessionStore>,
    cookies: Arc<CookieJar>,
    /// 进行中的刷新；刷新完成（无论成败）时由刷新任务自己清空
    refresh_in_flight: Mutex<Option<RefreshFuture>>,
}

/// 后端 API 客户端
///
/// 克隆开销很小，克隆体共享会话、连接池、cookie 以及进行中的刷新。
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// 创建新的客户端，cookie 只保存在内存中
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> ApiResult<Self> {
        Self::with_cookie_jar(config, session, Arc::new(CookieJar::in_memory()))
    }

    /// 使用指定的 cookie jar 创建客户端
    pub fn with_cookie_jar(
        config: &ApiConfig,
        session: Arc<SessionStore>,
        cookies: Arc<CookieJar>,
    ) -> ApiResult<Self> {
        // 刷新令牌是 httponly cookie，由 jar 保存和回传
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_provider(cookies.clone())
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                session,
                cookies,
                refresh_in_flight: Mutex::new(None),
            }),
        })
    }

    /// 按配置创建客户端：访问令牌和刷新 cookie 都持久化到文件，并在启动时读回
    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let storage = Arc::new(FileTokenStorage::new(&config.session.storage_path));
        let session = Arc::new(SessionStore::new(storage));
        if session.hydrate() {
            debug!(path = %config.session.storage_path.display(), "Restored session");
        }
        let cookies = Arc::new(CookieJar::load(&config.session.cookie_path));
        Self::with_cookie_jar(&config.api, session, cookies)
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.inner.cookies
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// 发送请求并解码为 `T`
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        request: ApiRequest,
        opts: RequestOptions,
    ) -> ApiResult<T> {
        self.fetch_body(path, request, opts).await?.decode()
    }

    /// 发送请求，丢弃响应体
    pub async fn execute(&self, path: &str, request: ApiRequest, opts: RequestOptions) -> ApiResult<()> {
        self.fetch_body(path, request, opts).await.map(|_| ())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, opts: RequestOptions) -> ApiResult<T> {
        self.fetch(path, ApiRequest::get(), opts).await
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        opts: RequestOptions,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch(path, ApiRequest::new(method).json(body)?, opts).await
    }

    /// 发送请求并返回解析后的响应体
    ///
    /// 401 且允许重试时，先等待（或加入）一次刷新，再用当前令牌重发一次。
    /// 重发后的任何非 2xx（包括第二次 401）直接作为错误返回。
    pub async fn fetch_body(
        &self,
        path: &str,
        request: ApiRequest,
        opts: RequestOptions,
    ) -> ApiResult<ResponseBody> {
        let (status, body) = self.send(path, &request, opts).await?;

        if status == StatusCode::UNAUTHORIZED && opts.retry_401 && !path.starts_with(REFRESH_PATH) {
            debug!(path, "Access token rejected, refreshing before retry");
            self.refresh().await?;

            let (status, body) = self.send(path, &request, opts).await?;
            return into_result(status, body);
        }

        into_result(status, body)
    }

    /// 刷新访问令牌
    ///
    /// 已有刷新在进行时加入它，所有调用方拿到同一个结果。
    pub async fn refresh(&self) -> ApiResult<()> {
        let in_flight = {
            let mut slot = self
                .inner
                .refresh_in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner());

            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let client = self.clone();
                    let task = async move {
                        let result = client.exchange_refresh_token().await;
                        *client
                            .inner
                            .refresh_in_flight
                            .lock()
                            .unwrap_or_else(|e| e.into_inner()) = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(task.clone());
                    task
                }
            }
        };

        in_flight.await
    }

    /// 刷新协议：用 cookie 中的刷新令牌换新的访问令牌
    ///
    /// 后端拒绝或响应里没有 `access_token` 时清空会话。传输失败不清空。
    async fn exchange_refresh_token(&self) -> ApiResult<()> {
        info!("Refreshing access token");
        metrics::counter!("api_refresh_total").increment(1);

        let opts = RequestOptions {
            auth: false,
            retry_401: false,
        };
        let (status, body) = self.send(REFRESH_PATH, &ApiRequest::post(), opts).await?;
        let payload = body.into_payload();

        if !status.is_success() {
            warn!(status = status.as_u16(), "Token refresh rejected, clearing session");
            metrics::counter!("api_refresh_failures_total").increment(1);
            self.inner.session.clear();
            return Err(ApiError::from_status(status, payload));
        }

        let access_token = payload
            .as_ref()
            .and_then(|p| p.get("access_token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());

        match access_token {
            Some(token) => {
                self.inner.session.set_access_token(token);
                info!("Access token refreshed");
                Ok(())
            }
            None => {
                warn!("Refresh response has no access_token, clearing session");
                metrics::counter!("api_refresh_failures_total").increment(1);
                self.inner.session.clear();
                Err(ApiError::from_status(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some(serde_json::json!({ "error": "invalid refresh response" })),
                ))
            }
        }
    }

    /// 发送一次请求，不做任何重试
    async fn send(
        &self,
        path: &str,
        request: &ApiRequest,
        opts: RequestOptions,
    ) -> ApiResult<(StatusCode, ResponseBody)> {
        let url = format!("{}{}", self.inner.base_url, path);
        let request_id = Uuid::new_v4().to_string();

        let mut headers = request.headers.clone();
        if matches!(request.body, RequestBody::Json(_)) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if opts.auth {
            if let Some(bearer) = self.inner.session.bearer() {
                let value = HeaderValue::from_str(&bearer).map_err(|_| {
                    ApiError::Validation("access token is not a valid header value".to_string())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if let RequestBody::Json(value) = &request.body {
            builder = builder.body(serde_json::to_vec(value)?);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %request.method, path, request_id = %request_id, error = %e, "API request failed");
            ApiError::from(e)
        })?;
        let status = response.status();
        let text = response.text().await?;

        metrics::counter!(
            "api_requests_total",
            "method" => request.method.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
        debug!(
            method = %request.method,
            path,
            status = status.as_u16(),
            request_id = %request_id,
            "API request completed"
        );

        Ok((status, ResponseBody::parse(text)))
    }
}

fn into_result(status: StatusCode, body: ResponseBody) -> ApiResult<ResponseBody> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(ApiError::from_status(status, body.into_payload()))
    }
}
