//! 资源缓存模块
//!
//! 提供以请求标识（方法 + 完整URL）为键的持久化响应缓存。
//! 底层使用 redb 单文件数据库，按缓存名称隔离存储范围，
//! 单键写入具备原子性，不提供跨键事务。
//!
//! 缓存由本系统只增不减：条目在合格的网络响应到达时写入，
//! 之后一直保留，直到外部操作者调用 [`AssetCache::clear`]。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const RESPONSES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("responses");

// ============================================================================
// 核心类型
// ============================================================================

/// 缓存错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    /// 打开或创建缓存库失败
    #[error("缓存打开失败: {0}")]
    Open(String),

    /// 读取缓存条目失败
    #[error("缓存读取失败: {0}")]
    Read(String),

    /// 写入缓存条目失败
    #[error("缓存写入失败: {0}")]
    Write(String),

    /// 条目编解码失败
    #[error("缓存条目编码失败: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// 缓存中的一条完整响应
///
/// 只有完整的、状态码200的同源响应才会被写入，
/// 因此条目可以原样回放给调用方。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// 响应的最终地址（重定向后）
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// 写入时间（Unix秒）
    pub stored_at: i64,
}

impl CachedResponse {
    pub fn new(url: String, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            stored_at: Utc::now().timestamp(),
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub write_failures: u64,
}

/// 持久化响应缓存
///
/// 可廉价克隆，克隆体共享同一个底层数据库和统计计数。
#[derive(Clone)]
pub struct AssetCache {
    db: Arc<Database>,
    name: String,
    path: PathBuf,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    write_failures: Arc<AtomicU64>,
}

// ============================================================================
// 实现
// ============================================================================

/// 生成请求标识键：方法 + 完整URL（含查询串）
pub fn request_key(method: &str, url: &str) -> String {
    format!("{} {}", method.to_uppercase(), url)
}

impl AssetCache {
    /// 打开（不存在则创建）指定名称的缓存库
    ///
    /// 每个名称对应 `root` 目录下的一个独立数据库文件，
    /// 测试可以注入不同的名称或根目录来隔离作用域。
    pub fn open(root: &Path, name: &str) -> CacheResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| CacheError::Open(e.to_string()))?;
        let path = root.join(format!("{}.redb", name));
        let db = Database::create(&path).map_err(|e| CacheError::Open(e.to_string()))?;

        // 建表，保证后续只读事务可以直接打开
        let txn = db
            .begin_write()
            .map_err(|e| CacheError::Open(e.to_string()))?;
        txn.open_table(RESPONSES_TABLE)
            .map_err(|e| CacheError::Open(e.to_string()))?;
        txn.commit().map_err(|e| CacheError::Open(e.to_string()))?;

        debug!("已打开缓存 '{}': {}", name, path.display());
        Ok(Self {
            db: Arc::new(db),
            name: name.to_string(),
            path,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            write_failures: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 按请求标识查找缓存响应
    ///
    /// 损坏的条目视为未命中并被删除，不影响调用方。
    pub fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>> {
        let raw = self.read_raw(key)?;
        let Some(raw) = raw else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        match serde_json::from_slice::<CachedResponse>(&raw) {
            Ok(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry))
            }
            Err(e) => {
                warn!("缓存条目损坏，已删除: {} ({})", key, e);
                let _ = self.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// 写入一条响应，单键写入是原子的
    pub fn put(&self, key: &str, entry: &CachedResponse) -> CacheResult<()> {
        let encoded = serde_json::to_vec(entry)?;
        let result = self.write_raw(key, &encoded);
        if result.is_err() {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// 删除单个条目，返回是否存在
    pub fn remove(&self, key: &str) -> CacheResult<bool> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| CacheError::Write(e.to_string()))?;
        let existed;
        {
            let mut table = txn
                .open_table(RESPONSES_TABLE)
                .map_err(|e| CacheError::Write(e.to_string()))?;
            existed = table
                .remove(key)
                .map_err(|e| CacheError::Write(e.to_string()))?
                .is_some();
        }
        txn.commit().map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(existed)
    }

    /// 清空整个缓存作用域
    ///
    /// 本系统自身从不淘汰条目，清理由外部操作者（管理端、测试）触发。
    pub fn clear(&self) -> CacheResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| CacheError::Write(e.to_string()))?;
        txn.delete_table(RESPONSES_TABLE)
            .map_err(|e| CacheError::Write(e.to_string()))?;
        txn.open_table(RESPONSES_TABLE)
            .map_err(|e| CacheError::Write(e.to_string()))?;
        txn.commit().map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }

    /// 当前条目数
    pub fn len(&self) -> CacheResult<u64> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| CacheError::Read(e.to_string()))?;
        let table = txn
            .open_table(RESPONSES_TABLE)
            .map_err(|e| CacheError::Read(e.to_string()))?;
        table.len().map_err(|e| CacheError::Read(e.to_string()))
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// 获取统计信息快照
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().unwrap_or(0),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    fn read_raw(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| CacheError::Read(e.to_string()))?;
        let table = txn
            .open_table(RESPONSES_TABLE)
            .map_err(|e| CacheError::Read(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| CacheError::Read(e.to_string()))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn write_raw(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| CacheError::Write(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RESPONSES_TABLE)
                .map_err(|e| CacheError::Write(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| CacheError::Write(e.to_string()))?;
        }
        txn.commit().map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(url: &str) -> CachedResponse {
        CachedResponse::new(
            url.to_string(),
            200,
            vec![("content-type".to_string(), "text/plain".to_string())],
            b"hello".to_vec(),
        )
    }

    #[test]
    fn request_key_includes_method_and_query() {
        let key = request_key("get", "http://a.example/x?page=2");
        assert_eq!(key, "GET http://a.example/x?page=2");
    }

    #[test]
    fn put_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::open(dir.path(), "image-cache").unwrap();
        let key = request_key("GET", "http://a.example/x");

        assert!(cache.get(&key).unwrap().is_none());
        cache.put(&key, &sample("http://a.example/x")).unwrap();

        let found = cache.get(&key).unwrap().expect("entry should exist");
        assert_eq!(found.status, 200);
        assert_eq!(found.body, b"hello");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn distinct_names_are_isolated_scopes() {
        let dir = TempDir::new().unwrap();
        let a = AssetCache::open(dir.path(), "image-cache").unwrap();
        let b = AssetCache::open(dir.path(), "other-cache").unwrap();
        let key = request_key("GET", "http://a.example/x");

        a.put(&key, &sample("http://a.example/x")).unwrap();
        assert!(a.get(&key).unwrap().is_some());
        assert!(b.get(&key).unwrap().is_none());
    }

    #[test]
    fn corrupt_entry_is_treated_as_miss_and_dropped() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::open(dir.path(), "image-cache").unwrap();
        let key = request_key("GET", "http://a.example/x");

        cache.write_raw(&key, b"not json at all").unwrap();
        assert_eq!(cache.len().unwrap(), 1);

        assert!(cache.get(&key).unwrap().is_none());
        assert_eq!(cache.len().unwrap(), 0, "corrupt entry should be removed");
    }

    #[test]
    fn clear_empties_the_scope() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::open(dir.path(), "image-cache").unwrap();
        for i in 0..3 {
            let url = format!("http://a.example/{}", i);
            cache.put(&request_key("GET", &url), &sample(&url)).unwrap();
        }
        assert_eq!(cache.len().unwrap(), 3);

        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::open(dir.path(), "image-cache").unwrap();
        let key = request_key("GET", "http://a.example/x");

        let _ = cache.get(&key).unwrap();
        cache.put(&key, &sample("http://a.example/x")).unwrap();
        let _ = cache.get(&key).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn survives_reopen() {
        let dir = TempDir::new().unwrap();
        let key = request_key("GET", "http://a.example/x");
        {
            let cache = AssetCache::open(dir.path(), "image-cache").unwrap();
            cache.put(&key, &sample("http://a.example/x")).unwrap();
        }
        let cache = AssetCache::open(dir.path(), "image-cache").unwrap();
        assert!(cache.get(&key).unwrap().is_some());
    }
}
