//! 会话存储
//!
//! 内存中最多持有一个访问令牌，并持久化到固定键 [`STORAGE_KEY`] 下。
//! 进程启动时通过 [`SessionStore::hydrate`] 读回。持久化失败只记日志，不影响内存状态。

use secrecy::{ExposeSecret, Secret};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// 访问令牌的持久化键
pub const STORAGE_KEY: &str = "yardly.access.v1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage file is corrupted: {0}")]
    Format(#[from] serde_json::Error),
}

/// 持久化后端（键值存储）
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// 基于 JSON 文件的键值存储
pub struct FileTokenStorage {
    path: PathBuf,
    // 同一进程内串行化读-改-写
    lock: Mutex<()>,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        write_private_file(&self.path, &serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}

/// 原子写入仅属主可读写的文件
///
/// 先写同目录下的临时文件（创建时即为 0600），再 rename 覆盖目标。
pub(crate) fn write_private_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let result = options.open(&tmp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = result.and_then(|_| std::fs::rename(&tmp_path, path)) {
        std::fs::remove_file(&tmp_path).ok();
        return Err(e);
    }
    Ok(())
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// 进程内存储，用于测试和临时会话
#[derive(Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// 会话上下文
///
/// 显式注入给 [`crate::client::ApiClient`]，测试中可以同时存在多个互不影响的会话。
pub struct SessionStore {
    access_token: RwLock<Option<Secret<String>>>,
    storage: Arc<dyn TokenStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            access_token: RwLock::new(None),
            storage,
        }
    }

    /// 仅存在于内存中的会话
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    /// 当前访问令牌
    pub fn access_token(&self) -> Option<Secret<String>> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// 替换访问令牌并持久化
    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = token.into();
        if let Err(e) = self.storage.set(STORAGE_KEY, &token) {
            warn!(error = %e, "Failed to persist access token");
        }
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = Some(Secret::new(token));
        debug!("Access token updated");
    }

    /// 清空会话（内存和持久化存储）
    pub fn clear(&self) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = None;
        if let Err(e) = self.storage.remove(STORAGE_KEY) {
            warn!(error = %e, "Failed to remove persisted access token");
        }
        debug!("Session cleared");
    }

    /// 从持久化存储读回令牌，返回是否读到
    ///
    /// 存储中没有令牌时保持内存状态不变。
    pub fn hydrate(&self) -> bool {
        match self.storage.get(STORAGE_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                *self.access_token.write().unwrap_or_else(|e| e.into_inner()) =
                    Some(Secret::new(token));
                debug!("Session hydrated from storage");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted access token");
                false
            }
        }
    }

    /// `Authorization` 头的值
    pub(crate) fn bearer(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
