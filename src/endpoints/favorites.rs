//! 收藏接口

use super::Query;
use crate::client::{ApiClient, ApiRequest, RequestOptions};
use crate::error::ApiResult;
use crate::models::favorite::{FavoriteItem, FavoriteStatus};
use crate::models::item::PageParams;

pub struct FavoritesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> FavoritesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn add(&self, item_id: i64) -> ApiResult<()> {
        self.client
            .execute(
                &format!("/api/items/{}/favorite", item_id),
                ApiRequest::post(),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn remove(&self, item_id: i64) -> ApiResult<()> {
        self.client
            .execute(
                &format!("/api/items/{}/favorite", item_id),
                ApiRequest::delete(),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn is_favorite(&self, item_id: i64) -> ApiResult<bool> {
        let status: FavoriteStatus = self
            .client
            .get(
                &format!("/api/items/{}/favorite", item_id),
                RequestOptions::default(),
            )
            .await?;
        Ok(status.is_favorite)
    }

    pub async fn my(&self, page: PageParams) -> ApiResult<Vec<FavoriteItem>> {
        let mut q = Query::new();
        q.push_opt("limit", page.limit).push_opt("offset", page.offset);
        self.client
            .get(&q.apply("/api/my/favorites"), RequestOptions::default())
            .await
    }
}
