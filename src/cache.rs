//! 查询结果缓存
//!
//! 以分段的 [`QueryKey`] 为键，按前缀失效。只缓存成功结果，失败不会写入缓存。

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::ApiResult;

/// 默认新鲜期
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// 查询键，例如 `["items", "byId", "7"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// 追加一段
    pub fn with(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

struct CacheEntry {
    value: Value,
    fetched_at: Instant,
}

pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
    stale_after: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            stale_after,
        }
    }

    /// 读取新鲜的缓存项；过期或类型不匹配视为未命中
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let value = {
            let entry = self.entries.get(key)?;
            if entry.fetched_at.elapsed() >= self.stale_after {
                return None;
            }
            entry.value.clone()
        };
        serde_json::from_value(value).ok()
    }

    pub fn insert<T: Serialize>(&self, key: QueryKey, value: &T) -> ApiResult<()> {
        let value = serde_json::to_value(value)?;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// 命中则直接返回，否则执行 `fetch` 并缓存成功结果
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if let Some(hit) = self.get(&key) {
            debug!(key = %key, "Query cache hit");
            return Ok(hit);
        }

        let value = fetch().await?;
        self.insert(key, &value)?;
        Ok(value)
    }

    /// 失效所有以 `prefix` 开头的键，返回失效数量
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let keys: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        for key in &keys {
            self.entries.remove(key);
        }
        if !keys.is_empty() {
            debug!(prefix = %prefix, count = keys.len(), "Query cache invalidated");
        }
        keys.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
