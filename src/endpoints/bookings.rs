//! 预订接口：创建、列表、生命周期流转、事件

use reqwest::Method;
use tracing::info;

use super::Query;
use crate::client::{ApiClient, ApiRequest, RequestOptions};
use crate::error::ApiResult;
use crate::models::booking::{
    Booking, BookingEvent, BookingList, BookingListParams, BookingRequestsParams,
    CreateBookingRequest, UpcomingByItem,
};

/// 预订流转动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Approve,
    Handover,
    Return,
    Cancel,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Approve => "approve",
            BookingAction::Handover => "handover",
            BookingAction::Return => "return",
            BookingAction::Cancel => "cancel",
        }
    }
}

pub struct BookingsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> BookingsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, item_id: i64, req: &CreateBookingRequest) -> ApiResult<Booking> {
        let booking: Booking = self
            .client
            .send_json(
                Method::POST,
                &format!("/api/items/{}/bookings", item_id),
                req,
                RequestOptions::default(),
            )
            .await?;
        info!(
            booking_id = booking.id,
            item_id,
            booking_type = booking.booking_type.as_str(),
            "Booking requested"
        );
        Ok(booking)
    }

    /// 物品已占用的预订（公开）
    pub async fn list_busy_for_item(&self, item_id: i64) -> ApiResult<Vec<Booking>> {
        self.client
            .get(
                &format!("/api/items/{}/bookings", item_id),
                RequestOptions::public(),
            )
            .await
    }

    /// 我发起的预订
    pub async fn list_my(&self, params: &BookingListParams) -> ApiResult<BookingList> {
        self.client
            .get(&list_query(params).apply("/api/my/bookings"), RequestOptions::default())
            .await
    }

    /// 别人对我的物品发起的预订
    pub async fn list_my_items(&self, params: &BookingListParams) -> ApiResult<BookingList> {
        self.client
            .get(
                &list_query(params).apply("/api/my/items/bookings"),
                RequestOptions::default(),
            )
            .await
    }

    /// 待我处理的预订请求
    pub async fn list_my_items_booking_requests(
        &self,
        params: &BookingRequestsParams,
    ) -> ApiResult<BookingList> {
        let mut q = Query::new();
        for t in &params.types {
            q.push("type", t.as_str());
        }
        q.push_opt("limit", params.limit).push_opt("offset", params.offset);
        self.client
            .get(
                &q.apply("/api/my/items/booking-requests"),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn transition(&self, id: i64, action: BookingAction) -> ApiResult<Booking> {
        let booking: Booking = self
            .client
            .fetch(
                &format!("/api/bookings/{}/{}", id, action.as_str()),
                ApiRequest::post(),
                RequestOptions::default(),
            )
            .await?;
        info!(
            booking_id = id,
            action = action.as_str(),
            status = booking.status.as_str(),
            "Booking transitioned"
        );
        Ok(booking)
    }

    pub async fn approve(&self, id: i64) -> ApiResult<Booking> {
        self.transition(id, BookingAction::Approve).await
    }

    pub async fn handover(&self, id: i64) -> ApiResult<Booking> {
        self.transition(id, BookingAction::Handover).await
    }

    pub async fn return_item(&self, id: i64) -> ApiResult<Booking> {
        self.transition(id, BookingAction::Return).await
    }

    pub async fn cancel(&self, id: i64) -> ApiResult<Booking> {
        self.transition(id, BookingAction::Cancel).await
    }

    /// 预订审计轨迹
    pub async fn events(&self, id: i64) -> ApiResult<Vec<BookingEvent>> {
        self.client
            .get(
                &format!("/api/bookings/{}/events", id),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn upcoming_by_item(&self, item_id: i64) -> ApiResult<UpcomingByItem> {
        self.client
            .get(
                &format!("/api/items/{}/bookings/upcoming", item_id),
                RequestOptions::public(),
            )
            .await
    }
}

fn list_query(params: &BookingListParams) -> Query {
    let mut q = Query::new();
    for s in &params.statuses {
        q.push("status", s.as_str());
    }
    q.push_opt("limit", params.limit).push_opt("offset", params.offset);
    q
}
