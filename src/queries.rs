//! 数据获取层
//!
//! 读操作走 [`QueryCache`]；写操作只在成功后失效相关查询（不做乐观更新），
//! 失败时缓存保持原样。

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::availability::{booking_request_for, lookahead_window};
use crate::cache::{QueryCache, QueryKey};
use crate::client::ApiClient;
use crate::endpoints::admin::ModerationAction;
use crate::endpoints::bookings::BookingAction;
use crate::error::{ApiError, ApiResult};
use crate::models::admin::{
    AdminBooking, AdminBookingEvent, AdminEvent, AdminItem, AdminList, AdminListBookingsParams,
    AdminListEventsParams, AdminListItemsParams, AdminListUsersParams, AdminPatchItemPayload,
    AdminPatchUserPayload, AdminUser, ModerationPayload,
};
use crate::models::auth::{Me, RegisterRequest, RegisterResponse, Tokens};
use crate::models::booking::{
    Availability, Booking, BookingEvent, BookingList, BookingListParams, CreateBookingRequest,
    UpcomingByItem,
};
use crate::models::favorite::FavoriteItem;
use crate::models::item::{CreateItemRequest, DealMode, Item, ItemImage, ItemListParams, PageParams};

fn key<const N: usize>(segments: [&str; N]) -> QueryKey {
    QueryKey::new(segments)
}

/// 参数结构体序列化为一段键
fn params_segment<P: Serialize>(params: &P) -> String {
    serde_json::to_string(params).unwrap_or_default()
}

/// 非正数 id 不发请求
fn ensure_id(id: i64) -> ApiResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("invalid id: {}", id)))
    }
}

pub struct Queries {
    client: ApiClient,
    cache: Arc<QueryCache>,
}

impl Queries {
    pub fn new(client: ApiClient) -> Self {
        Self::with_cache(client, Arc::new(QueryCache::default()))
    }

    pub fn with_cache(client: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn invalidate(&self, prefixes: &[QueryKey]) {
        for prefix in prefixes {
            self.cache.invalidate(prefix);
        }
    }

    // ==================== 会话 ====================

    /// 当前用户；没有令牌时不发请求，返回 `None`
    pub async fn me(&self) -> ApiResult<Option<Me>> {
        if !self.client.session().is_authenticated() {
            debug!("No access token, skipping me query");
            return Ok(None);
        }
        let me = self
            .cache
            .get_or_fetch(key(["me"]), || async move { self.client.auth().me().await })
            .await?;
        Ok(Some(me))
    }

    pub async fn is_admin(&self) -> ApiResult<bool> {
        Ok(self.me().await?.map(|me| me.role.is_admin()).unwrap_or(false))
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Tokens> {
        let tokens = self.client.auth().login(email, password).await?;
        self.invalidate(&[key(["me"])]);
        Ok(tokens)
    }

    pub async fn sign_up(&self, req: &RegisterRequest) -> ApiResult<(RegisterResponse, Tokens)> {
        let result = self.client.auth().sign_up(req).await?;
        self.invalidate(&[key(["me"])]);
        Ok(result)
    }

    /// 登出后清空所有缓存的查询
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self.client.auth().logout().await;
        self.cache.clear();
        result
    }

    pub async fn logout_all(&self) -> ApiResult<()> {
        self.client.auth().logout_all().await?;
        self.cache.clear();
        Ok(())
    }

    // ==================== 物品 ====================

    pub async fn items(&self, mode: Option<DealMode>) -> ApiResult<Vec<Item>> {
        let k = key(["items", "list"]).with(mode.map(|m| m.as_str()).unwrap_or("all"));
        let params = ItemListParams {
            mode,
            ..Default::default()
        };
        self.cache
            .get_or_fetch(k, || async move { self.client.items().list(&params).await })
            .await
    }

    pub async fn item(&self, id: i64) -> ApiResult<Item> {
        ensure_id(id)?;
        self.cache
            .get_or_fetch(key(["items", "byId"]).with(id), || async move {
                self.client.items().get(id).await
            })
            .await
    }

    pub async fn item_images(&self, item_id: i64) -> ApiResult<Vec<ItemImage>> {
        ensure_id(item_id)?;
        self.cache
            .get_or_fetch(key(["items"]).with(item_id).with("images"), || async move {
                self.client.items().list_images(item_id).await
            })
            .await
    }

    pub async fn create_item(&self, req: &CreateItemRequest) -> ApiResult<Item> {
        let item = self.client.items().create(req).await?;
        self.invalidate(&[key(["items", "list"])]);
        Ok(item)
    }

    pub async fn add_image(&self, item_id: i64, url: &str) -> ApiResult<ItemImage> {
        let image = self.client.items().add_image(item_id, url).await?;
        self.invalidate(&[key(["items"]).with(item_id).with("images")]);
        Ok(image)
    }

    pub async fn delete_image(&self, item_id: i64, image_id: i64) -> ApiResult<()> {
        self.client.items().delete_image(item_id, image_id).await?;
        self.invalidate(&[key(["items"]).with(item_id).with("images")]);
        Ok(())
    }

    // ==================== 预订 ====================

    pub async fn availability(&self, item_id: i64, from: &str, to: &str) -> ApiResult<Availability> {
        ensure_id(item_id)?;
        self.cache
            .get_or_fetch(key(["availability"]).with(item_id).with(from).with(to), || async move {
                self.client.availability().get(item_id, from, to).await
            })
            .await
    }

    /// 预订表单的完整流程：拉取窗口内占用区间、本地校验、提交
    pub async fn book_item(
        &self,
        item_id: i64,
        mode: DealMode,
        start: &str,
        end: &str,
        today: NaiveDate,
    ) -> ApiResult<Booking> {
        let busy = if mode.is_rental() {
            let (from, to) = lookahead_window(today);
            self.availability(item_id, &from, &to).await?.busy
        } else {
            Vec::new()
        };

        let req = booking_request_for(mode, start, end, &busy)
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        self.create_booking(item_id, &req).await
    }

    pub async fn create_booking(&self, item_id: i64, req: &CreateBookingRequest) -> ApiResult<Booking> {
        let booking = self.client.bookings().create(item_id, req).await?;
        self.invalidate(&[
            key(["availability"]).with(item_id),
            key(["item"]).with(item_id).with("upcoming"),
            key(["booking", "my"]),
        ]);
        Ok(booking)
    }

    pub async fn my_bookings(&self) -> ApiResult<BookingList> {
        self.cache
            .get_or_fetch(key(["booking", "my"]), || async move {
                self.client.bookings().list_my(&BookingListParams::default()).await
            })
            .await
    }

    pub async fn my_items_bookings(&self) -> ApiResult<BookingList> {
        self.cache
            .get_or_fetch(key(["booking", "myItems"]), || async move {
                self.client.bookings().list_my_items(&BookingListParams::default()).await
            })
            .await
    }

    pub async fn booking_events(&self, id: i64) -> ApiResult<Vec<BookingEvent>> {
        ensure_id(id)?;
        self.cache
            .get_or_fetch(key(["booking"]).with(id).with("events"), || async move {
                self.client.bookings().events(id).await
            })
            .await
    }

    pub async fn upcoming_by_item(&self, item_id: i64) -> ApiResult<UpcomingByItem> {
        ensure_id(item_id)?;
        self.cache
            .get_or_fetch(key(["item"]).with(item_id).with("upcoming"), || async move {
                self.client.bookings().upcoming_by_item(item_id).await
            })
            .await
    }

    pub async fn booking_action(&self, id: i64, action: BookingAction) -> ApiResult<Booking> {
        let booking = self.client.bookings().transition(id, action).await?;
        self.invalidate(&[key(["booking", "my"]), key(["booking", "myItems"])]);
        Ok(booking)
    }

    // ==================== 收藏 ====================

    pub async fn is_favorite(&self, item_id: i64) -> ApiResult<bool> {
        ensure_id(item_id)?;
        self.cache
            .get_or_fetch(key(["favorite", "is"]).with(item_id), || async move {
                self.client.favorites().is_favorite(item_id).await
            })
            .await
    }

    pub async fn my_favorites(&self) -> ApiResult<Vec<FavoriteItem>> {
        self.cache
            .get_or_fetch(key(["favorite", "my"]), || async move {
                self.client.favorites().my(PageParams::default()).await
            })
            .await
    }

    pub async fn add_favorite(&self, item_id: i64) -> ApiResult<()> {
        self.client.favorites().add(item_id).await?;
        self.invalidate_favorite(item_id);
        Ok(())
    }

    pub async fn remove_favorite(&self, item_id: i64) -> ApiResult<()> {
        self.client.favorites().remove(item_id).await?;
        self.invalidate_favorite(item_id);
        Ok(())
    }

    fn invalidate_favorite(&self, item_id: i64) {
        self.invalidate(&[key(["favorite", "is"]).with(item_id), key(["favorite", "my"])]);
    }

    // ==================== 后台 ====================

    pub async fn admin_users(&self, params: &AdminListUsersParams) -> ApiResult<AdminList<AdminUser>> {
        self.cache
            .get_or_fetch(key(["admin", "users"]).with(params_segment(params)), || async move {
                self.client.admin().list_users(params).await
            })
            .await
    }

    pub async fn admin_user(&self, id: i64) -> ApiResult<AdminUser> {
        ensure_id(id)?;
        self.cache
            .get_or_fetch(key(["admin", "users"]).with(id), || async move {
                self.client.admin().get_user(id).await
            })
            .await
    }

    pub async fn admin_bookings(
        &self,
        params: &AdminListBookingsParams,
    ) -> ApiResult<AdminList<AdminBooking>> {
        self.cache
            .get_or_fetch(key(["admin", "bookings"]).with(params_segment(params)), || async move {
                self.client.admin().list_bookings(params).await
            })
            .await
    }

    pub async fn admin_booking(&self, id: i64) -> ApiResult<AdminBooking> {
        ensure_id(id)?;
        self.cache
            .get_or_fetch(key(["admin", "bookings"]).with(id), || async move {
                self.client.admin().get_booking(id).await
            })
            .await
    }

    pub async fn admin_booking_events(
        &self,
        id: i64,
        page: PageParams,
    ) -> ApiResult<AdminList<AdminBookingEvent>> {
        ensure_id(id)?;
        let k = key(["admin", "bookings"])
            .with(id)
            .with("events")
            .with(params_segment(&page));
        self.cache
            .get_or_fetch(k, || async move { self.client.admin().booking_events(id, page).await })
            .await
    }

    pub async fn admin_items(&self, params: &AdminListItemsParams) -> ApiResult<AdminList<AdminItem>> {
        self.cache
            .get_or_fetch(key(["admin", "items"]).with(params_segment(params)), || async move {
                self.client.admin().list_items(params).await
            })
            .await
    }

    pub async fn admin_events(&self, params: &AdminListEventsParams) -> ApiResult<AdminList<AdminEvent>> {
        self.cache
            .get_or_fetch(key(["admin", "events"]).with(params_segment(params)), || async move {
                self.client.admin().list_events(params).await
            })
            .await
    }

    pub async fn admin_patch_user(&self, id: i64, payload: &AdminPatchUserPayload) -> ApiResult<AdminUser> {
        let user = self.client.admin().patch_user(id, payload).await?;
        self.invalidate(&[key(["admin", "users"]), key(["admin", "events"])]);
        Ok(user)
    }

    pub async fn admin_patch_item(&self, id: i64, payload: &AdminPatchItemPayload) -> ApiResult<AdminItem> {
        let item = self.client.admin().patch_item(id, payload).await?;
        self.invalidate_admin_items();
        Ok(item)
    }

    pub async fn admin_moderate_item(
        &self,
        id: i64,
        action: ModerationAction,
        payload: &ModerationPayload,
    ) -> ApiResult<AdminItem> {
        let item = self.client.admin().moderate_item(id, action, payload).await?;
        self.invalidate_admin_items();
        Ok(item)
    }

    fn invalidate_admin_items(&self) {
        self.invalidate(&[key(["admin", "items"]), key(["admin", "events"])]);
    }
}
