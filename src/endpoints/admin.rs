//! 后台管理接口：用户、物品审核、预订、审计事件

use reqwest::Method;
use tracing::info;

use super::Query;
use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiResult;
use crate::models::admin::{
    AdminBooking, AdminBookingEvent, AdminEvent, AdminItem, AdminList, AdminListBookingsParams,
    AdminListEventsParams, AdminListItemsParams, AdminListUsersParams, AdminPatchItemPayload,
    AdminPatchUserPayload, AdminUser, ModerationPayload,
};
use crate::models::item::PageParams;

/// 物品审核动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Block,
    Unblock,
    Delete,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Block => "block",
            ModerationAction::Unblock => "unblock",
            ModerationAction::Delete => "delete",
        }
    }
}

pub struct AdminApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AdminApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // ==================== 用户 ====================

    pub async fn list_users(&self, params: &AdminListUsersParams) -> ApiResult<AdminList<AdminUser>> {
        let mut q = Query::new();
        q.push_opt("q", params.q.as_deref())
            .push_opt("limit", params.limit)
            .push_opt("offset", params.offset);
        self.client
            .get(&q.apply("/api/admin/users"), RequestOptions::default())
            .await
    }

    pub async fn get_user(&self, id: i64) -> ApiResult<AdminUser> {
        self.client
            .get(&format!("/api/admin/users/{}", id), RequestOptions::default())
            .await
    }

    /// 修改角色或封禁状态
    pub async fn patch_user(&self, id: i64, payload: &AdminPatchUserPayload) -> ApiResult<AdminUser> {
        let user: AdminUser = self
            .client
            .send_json(
                Method::PATCH,
                &format!("/api/admin/users/{}", id),
                payload,
                RequestOptions::default(),
            )
            .await?;
        info!(user_id = id, role = user.role.as_str(), "User updated");
        Ok(user)
    }

    // ==================== 预订 ====================

    pub async fn list_bookings(
        &self,
        params: &AdminListBookingsParams,
    ) -> ApiResult<AdminList<AdminBooking>> {
        let mut q = Query::new();
        q.push_opt("status", params.status.as_deref())
            .push_opt("type", params.booking_type.as_deref())
            .push_opt("item_id", params.item_id)
            .push_opt("user_id", params.user_id)
            .push_opt("limit", params.limit)
            .push_opt("offset", params.offset);
        self.client
            .get(&q.apply("/api/admin/bookings"), RequestOptions::default())
            .await
    }

    pub async fn get_booking(&self, id: i64) -> ApiResult<AdminBooking> {
        self.client
            .get(&format!("/api/admin/bookings/{}", id), RequestOptions::default())
            .await
    }

    pub async fn booking_events(
        &self,
        id: i64,
        page: PageParams,
    ) -> ApiResult<AdminList<AdminBookingEvent>> {
        let mut q = Query::new();
        q.push_opt("limit", page.limit).push_opt("offset", page.offset);
        self.client
            .get(
                &q.apply(&format!("/api/admin/bookings/{}/events", id)),
                RequestOptions::default(),
            )
            .await
    }

    // ==================== 物品 ====================

    pub async fn list_items(&self, params: &AdminListItemsParams) -> ApiResult<AdminList<AdminItem>> {
        let mut q = Query::new();
        q.push_opt("q", params.q.as_deref())
            .push_opt("status", params.status.as_deref())
            .push_opt("mode", params.mode.as_deref())
            .push_flag("include_deleted", params.include_deleted)
            .push_flag("include_archived", params.include_archived)
            .push_flag("include_transferred", params.include_transferred)
            .push_opt("limit", params.limit)
            .push_opt("offset", params.offset);
        self.client
            .get(&q.apply("/api/admin/items"), RequestOptions::default())
            .await
    }

    pub async fn patch_item(&self, id: i64, payload: &AdminPatchItemPayload) -> ApiResult<AdminItem> {
        self.client
            .send_json(
                Method::PATCH,
                &format!("/api/admin/items/{}", id),
                payload,
                RequestOptions::default(),
            )
            .await
    }

    /// 封禁/解封/删除物品
    pub async fn moderate_item(
        &self,
        id: i64,
        action: ModerationAction,
        payload: &ModerationPayload,
    ) -> ApiResult<AdminItem> {
        let item: AdminItem = self
            .client
            .send_json(
                Method::POST,
                &format!("/api/admin/items/{}/{}", id, action.as_str()),
                payload,
                RequestOptions::default(),
            )
            .await?;
        info!(
            item_id = id,
            action = action.as_str(),
            status = item.status.as_str(),
            "Item moderated"
        );
        Ok(item)
    }

    // ==================== 审计 ====================

    pub async fn list_events(&self, params: &AdminListEventsParams) -> ApiResult<AdminList<AdminEvent>> {
        let mut q = Query::new();
        q.push_opt("entity_type", params.entity_type.as_deref())
            .push_opt("entity_id", params.entity_id)
            .push_opt("actor_user_id", params.actor_user_id)
            .push_opt("limit", params.limit)
            .push_opt("offset", params.offset);
        self.client
            .get(&q.apply("/api/admin/events"), RequestOptions::default())
            .await
    }
}
