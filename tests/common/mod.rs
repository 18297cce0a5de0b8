//! 测试公共模块
//! 提供一个内存中的假后端（axum）和客户端构造辅助函数

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use yardly_client::{
    config::ApiConfig,
    session::{MemoryTokenStorage, StorageError, TokenStorage},
    ApiClient, SessionStore,
};

/// 受保护接口接受的令牌
pub const FRESH_TOKEN: &str = "fresh";
pub const STALE_TOKEN: &str = "stale";

/// 刷新接口的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// 返回 `FRESH_TOKEN`
    Issue,
    /// 401 拒绝
    Reject,
    /// 200 但没有 access_token
    NoToken,
    /// 返回一个仍会被拒绝的令牌
    IssueStale,
    /// 只有带上登录时下发的 cookie 才签发 `FRESH_TOKEN`
    RequireCookie,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub request_id: Option<String>,
}

pub struct FakeState {
    pub refresh_calls: AtomicUsize,
    pub refresh_mode: Mutex<RefreshMode>,
    pub logout_fails: AtomicBool,
    pub favorite: AtomicBool,
    pub requests: Mutex<Vec<Recorded>>,
    pub last_body: Mutex<Option<Value>>,
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    /// 在随机端口上启动假后端
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState {
            refresh_calls: AtomicUsize::new(0),
            refresh_mode: Mutex::new(RefreshMode::Issue),
            logout_fails: AtomicBool::new(false),
            favorite: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            last_body: Mutex::new(None),
        });

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/logout_all", post(logout_all))
            .route("/api/users/me", get(me))
            .route("/api/protected", get(protected))
            .route("/api/items", get(list_items))
            .route("/api/items/{id}", get(get_item))
            .route("/api/items/{id}/availability", get(availability))
            .route("/api/items/{id}/bookings", post(create_booking))
            .route("/api/items/{id}/images", get(list_images).post(add_image))
            .route("/api/items/{id}/images/{image_id}", delete(delete_image))
            .route(
                "/api/items/{id}/favorite",
                get(favorite_status).post(add_favorite).delete(remove_favorite),
            )
            .route("/api/bookings/{id}/{action}", post(booking_action))
            .route("/api/my/bookings", get(my_bookings))
            .route("/api/my/items/bookings", get(my_bookings))
            .route("/api/fail/{kind}", get(fail))
            .route("/api/admin/users", get(admin_users))
            .route("/api/admin/users/{id}", get(admin_user).patch(admin_patch_user))
            .route("/api/admin/items", get(admin_items))
            .route("/api/admin/items/{id}", patch(admin_patch_item))
            .route("/api/admin/items/{id}/{action}", post(admin_moderate_item))
            .route("/api/admin/bookings", get(admin_bookings))
            .route("/api/admin/events", get(admin_events))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.state.refresh_mode.lock().unwrap() = mode;
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().unwrap().clone()
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
        }
    }

    /// 使用内存存储的客户端，可选预置令牌
    pub fn client(&self, token: Option<&str>) -> ApiClient {
        self.client_with(Arc::new(MemoryTokenStorage::new()), token)
    }

    pub fn client_with(&self, storage: Arc<dyn TokenStorage>, token: Option<&str>) -> ApiClient {
        let session = Arc::new(SessionStore::new(storage));
        if let Some(token) = token {
            session.set_access_token(token);
        }
        ApiClient::new(&self.api_config(), session).expect("Failed to build client")
    }
}

/// 统计 remove 次数的存储，用来断言会话只被清空一次
#[derive(Default)]
pub struct CountingStorage {
    inner: MemoryTokenStorage,
    pub removes: AtomicUsize,
}

impl CountingStorage {
    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

impl TokenStorage for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

// ==================== 处理函数 ====================

async fn record(State(state): State<Arc<FakeState>>, req: Request, next: Next) -> Response {
    // 借用 req 的闭包必须在 await 之前结束
    let recorded = {
        let header_str = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        Recorded {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(String::from),
            authorization: header_str("authorization"),
            cookie: header_str("cookie"),
            request_id: header_str("x-request-id"),
        }
    };
    state.requests.lock().unwrap().push(recorded);
    next.run(req).await
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", FRESH_TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

fn booking_json(id: i64, item_id: i64, booking_type: &str, status: &str) -> Value {
    json!({
        "id": id,
        "item_id": item_id,
        "requester_id": 1,
        "owner_id": 9,
        "type": booking_type,
        "status": status,
        "created_at": "2025-01-01T00:00:00Z"
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "wrong-password" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid credentials" })),
        )
            .into_response();
    }
    (
        [(
            header::SET_COOKIE,
            "refresh_token=r1; HttpOnly; Path=/api/auth; Max-Age=3600",
        )],
        Json(json!({ "access_token": FRESH_TOKEN, "token_type": "Bearer" })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // 让并发的 401 有机会在刷新完成前汇合
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mode = *state.refresh_mode.lock().unwrap();
    match mode {
        RefreshMode::Issue => Json(json!({ "access_token": FRESH_TOKEN })).into_response(),
        RefreshMode::IssueStale => Json(json!({ "access_token": STALE_TOKEN })).into_response(),
        RefreshMode::NoToken => Json(json!({ "token_type": "Bearer" })).into_response(),
        RefreshMode::RequireCookie => {
            let has_cookie = headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("refresh_token=r1"))
                .unwrap_or(false);
            if has_cookie {
                Json(json!({ "access_token": FRESH_TOKEN })).into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "missing refresh token" })),
                )
                    .into_response()
            }
        }
        RefreshMode::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "refresh token expired" })),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<Arc<FakeState>>) -> Response {
    if state.logout_fails.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn logout_all(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": 1,
        "email": "ann@example.com",
        "role": "admin",
        "first_name": "Ann"
    }))
    .into_response()
}

async fn protected(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "ok": true })).into_response()
}

async fn list_items() -> Response {
    Json(json!([
        { "id": 1, "owner_id": 9, "title": "Drill", "status": "active", "mode": "rent" }
    ]))
    .into_response()
}

async fn get_item(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "item not found" }))).into_response();
    }
    let mode = if id == 2 { "sale" } else { "rent" };
    Json(json!({
        "id": id,
        "owner_id": 9,
        "title": "Drill",
        "status": "active",
        "mode": mode
    }))
    .into_response()
}

async fn availability(Path(id): Path<i64>, Query(q): Query<HashMap<String, String>>) -> Response {
    Json(json!({
        "item_id": id,
        "from": q.get("from").cloned().unwrap_or_default(),
        "to": q.get("to").cloned().unwrap_or_default(),
        "timezone": "UTC",
        "is_in_use_now": false,
        "busy": [{ "start": "2025-01-11", "end": "2025-01-11" }]
    }))
    .into_response()
}

async fn create_booking(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let booking_type = body["type"].as_str().unwrap_or("rent").to_string();
    *state.last_body.lock().unwrap() = Some(body);
    (
        StatusCode::CREATED,
        Json(booking_json(100, id, &booking_type, "requested")),
    )
        .into_response()
}

async fn booking_action(headers: HeaderMap, Path((id, action)): Path<(i64, String)>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let status = match action.as_str() {
        "approve" => "approved",
        "handover" => "in_use",
        "return" => "completed",
        "cancel" => "cancelled",
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(booking_json(id, 1, "rent", status)).into_response()
}

async fn my_bookings(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "items": [booking_json(5, 1, "rent", "requested")],
        "limit": 20,
        "offset": 0
    }))
    .into_response()
}

async fn favorite_status(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "is_favorite": state.favorite.load(Ordering::SeqCst) })).into_response()
}

async fn add_favorite(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.favorite.store(true, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn remove_favorite(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.favorite.store(false, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn fail(Path(kind): Path<String>) -> Response {
    match kind.as_str() {
        "error" => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "item already booked", "message": "ignored" })),
        )
            .into_response(),
        "message" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "title is required", "field": "title" })),
        )
            .into_response(),
        "text" => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ==================== 图片 ====================

fn image_json(id: i64, item_id: i64, url: &str) -> Value {
    json!({
        "id": id,
        "item_id": item_id,
        "url": url,
        "sort_order": 0,
        "created_at": "2025-01-01T00:00:00Z"
    })
}

async fn list_images(Path(id): Path<i64>) -> Response {
    Json(json!([image_json(1, id, "/uploads/drill.jpg")])).into_response()
}

async fn add_image(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let url = body["url"].as_str().unwrap_or_default().to_string();
    *state.last_body.lock().unwrap() = Some(body);
    (StatusCode::CREATED, Json(image_json(2, id, &url))).into_response()
}

async fn delete_image(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

// ==================== 后台 ====================

fn admin_user_json(id: i64, role: &str) -> Value {
    json!({
        "id": id,
        "email": "bob@example.com",
        "role": role,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-02T00:00:00Z"
    })
}

fn admin_item_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "owner_id": 9,
        "title": "Drill",
        "status": status,
        "mode": "rent"
    })
}

fn page(q: &HashMap<String, String>) -> (u32, u32) {
    let limit = q.get("limit").and_then(|v| v.parse().ok()).unwrap_or(50);
    let offset = q.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    (limit, offset)
}

async fn admin_users(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let (limit, offset) = page(&q);
    Json(json!({
        "users": [admin_user_json(2, "user")],
        "limit": limit,
        "offset": offset
    }))
    .into_response()
}

async fn admin_user(headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(admin_user_json(id, "user")).into_response()
}

async fn admin_patch_user(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let role = body["role"].as_str().unwrap_or("user").to_string();
    *state.last_body.lock().unwrap() = Some(body);
    Json(admin_user_json(id, &role)).into_response()
}

async fn admin_items(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let (limit, offset) = page(&q);
    Json(json!({
        "items": [admin_item_json(3, "active")],
        "limit": limit,
        "offset": offset
    }))
    .into_response()
}

async fn admin_patch_item(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let status = body["status"].as_str().unwrap_or("active").to_string();
    *state.last_body.lock().unwrap() = Some(body);
    Json(admin_item_json(id, &status)).into_response()
}

async fn admin_moderate_item(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path((id, action)): Path<(i64, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut item = match action.as_str() {
        "block" | "unblock" => admin_item_json(id, "active"),
        "delete" => admin_item_json(id, "deleted"),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    if action == "block" {
        item["blocked_at"] = json!("2025-02-01T10:00:00Z");
        item["block_reason"] = body["reason"].clone();
    }
    *state.last_body.lock().unwrap() = Some(body);
    Json(item).into_response()
}

async fn admin_bookings(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let (limit, offset) = page(&q);
    Json(json!({
        "bookings": [booking_json(5, 1, "rent", "requested")],
        "limit": limit,
        "offset": offset
    }))
    .into_response()
}

async fn admin_events(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let (limit, offset) = page(&q);
    Json(json!({
        "events": [{
            "id": 1,
            "actor_user_id": 1,
            "entity_type": "item",
            "entity_id": 3,
            "action": "block",
            "created_at": "2025-02-01T10:00:00Z"
        }],
        "limit": limit,
        "offset": offset
    }))
    .into_response()
}
