//! 物品可用性接口

use super::Query;
use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiResult;
use crate::models::booking::Availability;

pub struct AvailabilityApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AvailabilityApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `[from, to]` 窗口内的占用区间，日期格式 YYYY-MM-DD
    pub async fn get(&self, item_id: i64, from: &str, to: &str) -> ApiResult<Availability> {
        let mut q = Query::new();
        q.push("from", from).push("to", to);
        self.client
            .get(
                &q.apply(&format!("/api/items/{}/availability", item_id)),
                RequestOptions::public(),
            )
            .await
    }
}
