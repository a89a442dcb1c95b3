//! 语言偏好存储
//!
//! 维护当前界面语言与本地化字符串表，并保持两者与远端内容同步：
//!
//! - 初始化时按"持久化偏好 > 环境locale信号 > 回退语言"解析语言；
//! - 解析完成后向语言端点拉取键值文案并整体合并；
//! - 显式切换语言是幂等操作，变化时才持久化并重新拉取；
//! - 远端失败一律记日志并沿用现有文案（最后已知良好值）。
//!
//! 存储可克隆共享，内部状态线程安全；并发切换语言时，
//! 迟到的过期响应按代数整体丢弃，不会覆盖更新的内容。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::network::{Method, Session};
use crate::store::config::{constants, StoreConfig};
use crate::store::error::{StoreError, StoreResult};
use crate::store::storage::PreferenceStorage;

// ============================================================================
// 核心类型
// ============================================================================

/// 支持的界面语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
    Ja,
    Ko,
}

impl Language {
    /// 自动检测不命中时的回退语言
    pub const FALLBACK: Language = Language::En;

    pub const ALL: [Language; 4] = [Language::En, Language::Zh, Language::Ja, Language::Ko];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::Ko => "ko",
        }
    }

    /// 精确匹配语言代码
    pub fn from_code(code: &str) -> Option<Language> {
        match code {
            "en" => Some(Language::En),
            "zh" => Some(Language::Zh),
            "ja" => Some(Language::Ja),
            "ko" => Some(Language::Ko),
            _ => None,
        }
    }

    /// 按locale标签前缀映射语言
    ///
    /// `zh-CN`/`zh_TW` 这类标签取前缀匹配，不认识的前缀一律回退英文。
    pub fn from_locale_tag(tag: &str) -> Language {
        let tag = tag.trim().to_lowercase();
        if tag.starts_with("zh") {
            Language::Zh
        } else if tag.starts_with("ja") {
            Language::Ja
        } else if tag.starts_with("ko") {
            Language::Ko
        } else {
            Language::FALLBACK
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 语言解析的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    /// 初始默认值，解析逻辑尚未运行
    Unresolved,
    /// 正在从持久化偏好或环境信号确定语言
    Resolving,
    /// 语言已确定（解析或显式切换）
    Resolved,
}

/// 存储统计快照
#[derive(Debug, Default, Clone)]
pub struct StoreStats {
    pub fetches_issued: u64,
    pub fetches_merged: u64,
    pub fetches_failed: u64,
    pub stale_discarded: u64,
}

struct StoreInner {
    language: RwLock<Language>,
    state: RwLock<ResolveState>,
    strings: RwLock<HashMap<String, String>>,
    /// 单调递增的拉取代数，迟到的过期响应据此丢弃
    generation: AtomicU64,
    fetches_issued: AtomicU64,
    fetches_merged: AtomicU64,
    fetches_failed: AtomicU64,
    stale_discarded: AtomicU64,
}

/// 语言偏好存储
#[derive(Clone)]
pub struct LanguageStore {
    inner: Arc<StoreInner>,
    storage: PreferenceStorage,
    session: Arc<Session>,
    config: StoreConfig,
}

// ============================================================================
// 实现
// ============================================================================

impl LanguageStore {
    /// 创建存储，初始为回退语言与内置默认文案
    ///
    /// 语言内容经由传入的会话拉取，会话激活了缓存时
    /// 这些请求自动享受缓存优先策略。
    pub fn new(config: StoreConfig, session: Arc<Session>) -> Self {
        let strings: HashMap<String, String> = constants::DEFAULT_STRINGS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let storage = PreferenceStorage::new(config.data_dir.clone());

        Self {
            inner: Arc::new(StoreInner {
                language: RwLock::new(Language::FALLBACK),
                state: RwLock::new(ResolveState::Unresolved),
                strings: RwLock::new(strings),
                generation: AtomicU64::new(0),
                fetches_issued: AtomicU64::new(0),
                fetches_merged: AtomicU64::new(0),
                fetches_failed: AtomicU64::new(0),
                stale_discarded: AtomicU64::new(0),
            }),
            storage,
            session,
            config,
        }
    }

    pub fn language(&self) -> Language {
        *self.inner.language.read().unwrap()
    }

    pub fn state(&self) -> ResolveState {
        *self.inner.state.read().unwrap()
    }

    /// 查找文案，缺失的键原样返回键名
    pub fn text(&self, key: &str) -> String {
        self.inner
            .strings
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// 字符串表快照
    pub fn strings(&self) -> HashMap<String, String> {
        self.inner.strings.read().unwrap().clone()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            fetches_issued: self.inner.fetches_issued.load(Ordering::Relaxed),
            fetches_merged: self.inner.fetches_merged.load(Ordering::Relaxed),
            fetches_failed: self.inner.fetches_failed.load(Ordering::Relaxed),
            stale_discarded: self.inner.stale_discarded.load(Ordering::Relaxed),
        }
    }

    /// 初始化：解析语言并拉取内容
    ///
    /// 持久化偏好存在时直接采用并跳过自动检测，否则按环境locale
    /// 信号的前缀映射。随后的内容拉取失败只记日志，初始文案仍然可用。
    pub async fn initialize(&self) {
        *self.inner.state.write().unwrap() = ResolveState::Resolving;

        let resolved = match self.storage.load() {
            Some(saved) => {
                debug!("采用持久化语言偏好: {}", saved);
                saved
            }
            None => {
                let detected = self.detect_language();
                debug!("自动检测语言: {}", detected);
                detected
            }
        };

        *self.inner.language.write().unwrap() = resolved;
        *self.inner.state.write().unwrap() = ResolveState::Resolved;

        if let Err(e) = self.refresh().await {
            warn!("语言内容加载失败，沿用现有文案: {}", e);
        }
    }

    /// 切换界面语言
    ///
    /// 与当前语言相同时是无操作：不写存储、不发请求。
    /// 否则更新语言、持久化偏好并重新拉取内容；持久化失败
    /// 只记日志，不阻止切换。
    pub async fn change_language(&self, new: Language) {
        if new == self.language() {
            debug!("语言未变化，忽略: {}", new);
            return;
        }

        *self.inner.language.write().unwrap() = new;
        *self.inner.state.write().unwrap() = ResolveState::Resolved;

        if let Err(e) = self.storage.save(new) {
            warn!("语言偏好持久化失败: {}", e);
        }
        if let Err(e) = self.refresh().await {
            warn!("语言内容加载失败，沿用现有文案: {}", e);
        }
    }

    /// 拉取当前语言的远端文案并整体合并
    ///
    /// 负载必须整体解析成功才会合并，不存在部分合并；
    /// 负载中缺失的键保留原值。被更新请求取代的迟到响应
    /// 按代数整体丢弃。
    pub async fn refresh(&self) -> StoreResult<()> {
        let lang = self.language();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.fetches_issued.fetch_add(1, Ordering::Relaxed);
        debug!("拉取语言内容: {} (第{}代)", lang, generation);

        let table = match self.fetch_table(lang).await {
            Ok(table) => table,
            Err(e) => {
                self.inner.fetches_failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        if self.inner.generation.load(Ordering::SeqCst) != generation {
            self.inner.stale_discarded.fetch_add(1, Ordering::Relaxed);
            debug!("丢弃过期的语言响应: {}", lang);
            return Ok(());
        }

        let mut strings = self.inner.strings.write().unwrap();
        for (key, value) in table {
            strings.insert(key, value);
        }
        self.inner.fetches_merged.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn detect_language(&self) -> Language {
        let tag = self
            .config
            .locale_tag
            .clone()
            .or_else(crate::env::ambient_locale_tag);
        match tag {
            Some(tag) => Language::from_locale_tag(&tag),
            None => Language::FALLBACK,
        }
    }

    async fn fetch_table(&self, lang: Language) -> StoreResult<HashMap<String, String>> {
        let mut url = self
            .session
            .config()
            .origin
            .join(constants::LANGUAGE_ENDPOINT_PATH)
            .map_err(|e| StoreError::Endpoint(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair(constants::LANGUAGE_QUERY_PARAM, lang.code());

        let retrieved = self
            .session
            .retrieve(Method::GET, url.as_str())
            .await
            .map_err(|e| StoreError::Fetch(e.to_string()))?;
        let response = retrieved
            .into_response()
            .ok_or_else(|| StoreError::Endpoint(format!("语言端点不是HTTP地址: {}", url)))?;

        if response.status != 200 {
            return Err(StoreError::BadStatus(response.status));
        }

        let table: HashMap<String, String> = serde_json::from_slice(&response.body)?;
        Ok(table)
    }
}

// ============================================================================
// 测试
// ============================================================================
