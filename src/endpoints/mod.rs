//! 后端接口的类型化封装
//!
//! 每个领域一个借用 [`ApiClient`] 的轻量视图，例如 `client.items().get(7)`。

pub mod admin;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod favorites;
pub mod items;

use url::form_urlencoded;

use crate::client::ApiClient;

pub use admin::{AdminApi, ModerationAction};
pub use auth::AuthApi;
pub use availability::AvailabilityApi;
pub use bookings::{BookingAction, BookingsApi};
pub use favorites::FavoritesApi;
pub use items::ItemsApi;

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn items(&self) -> ItemsApi<'_> {
        ItemsApi::new(self)
    }

    pub fn bookings(&self) -> BookingsApi<'_> {
        BookingsApi::new(self)
    }

    pub fn favorites(&self) -> FavoritesApi<'_> {
        FavoritesApi::new(self)
    }

    pub fn availability(&self) -> AvailabilityApi<'_> {
        AvailabilityApi::new(self)
    }

    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }
}

/// 查询串构造器
///
/// 跳过缺省值和空字符串；布尔值只在为 `true` 时写出。
pub(crate) struct Query {
    serializer: form_urlencoded::Serializer<'static, String>,
    empty: bool,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self {
            serializer: form_urlencoded::Serializer::new(String::new()),
            empty: true,
        }
    }

    pub(crate) fn push(&mut self, key: &str, value: impl ToString) -> &mut Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.serializer.append_pair(key, &value);
            self.empty = false;
        }
        self
    }

    pub(crate) fn push_opt<T: ToString>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.push(key, v);
        }
        self
    }

    pub(crate) fn push_flag(&mut self, key: &str, value: bool) -> &mut Self {
        if value {
            self.push(key, "true");
        }
        self
    }

    /// 拼到路径后面；没有参数时原样返回路径
    pub(crate) fn apply(mut self, path: &str) -> String {
        if self.empty {
            path.to_string()
        } else {
            format!("{}?{}", path, self.serializer.finish())
        }
    }
}
