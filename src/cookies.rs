//! 可持久化的 cookie jar
//!
//! 刷新令牌由后端以 httponly cookie 下发。命令行每条命令都是新进程，
//! 所以 jar 在每次收到 `Set-Cookie` 后写回磁盘，启动时再读回。

use cookie_store::{CookieStore, RawCookie};
use reqwest::header::HeaderValue;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::session::write_private_file;

pub struct CookieJar {
    store: RwLock<CookieStore>,
    path: Option<PathBuf>,
}

impl CookieJar {
    /// 不落盘的 jar
    pub fn in_memory() -> Self {
        Self {
            store: RwLock::new(CookieStore::default()),
            path: None,
        }
    }

    /// 从文件读回；文件不存在或损坏时从空 jar 开始
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = match std::fs::File::open(&path) {
            Ok(file) => match cookie_store::serde::json::load(BufReader::new(file)) {
                Ok(store) => {
                    debug!(path = %path.display(), "Cookie jar loaded");
                    store
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cookie jar is corrupted, starting empty");
                    CookieStore::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => CookieStore::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cookie jar");
                CookieStore::default()
            }
        };

        Self {
            store: RwLock::new(store),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 清空所有 cookie（同时清空磁盘上的副本）
    pub fn clear(&self) {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.clear();
        self.persist(&store);
    }

    /// 写盘失败只记日志
    fn persist(&self, store: &CookieStore) {
        let Some(path) = &self.path else {
            return;
        };

        let mut buf = Vec::new();
        if let Err(e) = cookie_store::serde::json::save(store, &mut buf) {
            warn!(error = %e, "Failed to serialize cookie jar");
            return;
        }
        if let Err(e) = write_private_file(path, &buf) {
            warn!(path = %path.display(), error = %e, "Failed to persist cookie jar");
        }
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| RawCookie::parse(raw.to_string()).ok())
            .collect();
        if cookies.is_empty() {
            return;
        }

        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.store_response_cookies(cookies.into_iter(), url);
        self.persist(&store);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        let header = store
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}
