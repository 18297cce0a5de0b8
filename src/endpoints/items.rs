//! 物品目录与图片接口

use reqwest::Method;
use validator::Validate;

use super::Query;
use crate::client::{ApiClient, ApiRequest, RequestOptions};
use crate::error::ApiResult;
use crate::models::item::{
    AddImageRequest, CreateItemRequest, Item, ItemImage, ItemListParams, PageParams,
};

pub struct ItemsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ItemsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &ItemListParams) -> ApiResult<Vec<Item>> {
        let mut q = Query::new();
        q.push_opt("mode", params.mode.map(|m| m.as_str()))
            .push_opt("limit", params.limit)
            .push_opt("offset", params.offset);
        self.client
            .get(&q.apply("/api/items"), RequestOptions::public())
            .await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Item> {
        self.client
            .get(&format!("/api/items/{}", id), RequestOptions::public())
            .await
    }

    pub async fn create(&self, req: &CreateItemRequest) -> ApiResult<Item> {
        req.validate()?;
        self.client
            .send_json(Method::POST, "/api/items", req, RequestOptions::default())
            .await
    }

    /// 某个用户公开的物品
    pub async fn by_owner(&self, owner_id: i64, page: PageParams) -> ApiResult<Vec<Item>> {
        let mut q = Query::new();
        q.push_opt("limit", page.limit).push_opt("offset", page.offset);
        self.client
            .get(
                &q.apply(&format!("/api/users/{}/items", owner_id)),
                RequestOptions::public(),
            )
            .await
    }

    pub async fn my_items(&self, page: PageParams) -> ApiResult<Vec<Item>> {
        let mut q = Query::new();
        q.push_opt("limit", page.limit).push_opt("offset", page.offset);
        self.client
            .get(&q.apply("/api/my/items"), RequestOptions::default())
            .await
    }

    pub async fn list_images(&self, item_id: i64) -> ApiResult<Vec<ItemImage>> {
        self.client
            .get(
                &format!("/api/items/{}/images", item_id),
                RequestOptions::public(),
            )
            .await
    }

    pub async fn add_image(&self, item_id: i64, url: &str) -> ApiResult<ItemImage> {
        let req = AddImageRequest {
            url: url.trim().to_string(),
        };
        req.validate()?;
        self.client
            .send_json(
                Method::POST,
                &format!("/api/items/{}/images", item_id),
                &req,
                RequestOptions::default(),
            )
            .await
    }

    pub async fn delete_image(&self, item_id: i64, image_id: i64) -> ApiResult<()> {
        self.client
            .execute(
                &format!("/api/items/{}/images/{}", item_id, image_id),
                ApiRequest::delete(),
                RequestOptions::default(),
            )
            .await
    }
}
