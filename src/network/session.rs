//! HTTP会话与缓存优先检索
//!
//! `Session` 是所有出站请求的统一入口，实现缓存优先策略：
//!
//! 1. 非HTTP(S)地址原样放行，不做任何处理；
//! 2. 命中缓存直接回放，不发起网络请求；
//! 3. 未命中走网络，网络错误原样传播给调用方；
//! 4. 合格的响应（完整、状态200、同源）复制一份在后台写入缓存，
//!    写入失败只记日志，绝不影响本次请求的交付。
//!
//! 未激活缓存的会话退化为纯粹的网络透传，语言存储等上层组件
//! 共用同一个会话时自动获得拦截能力。

use std::path::PathBuf;
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use reqwest::Method;

use crate::network::cache::{
    request_key, AssetCache, CacheResult, CacheStats, CachedResponse,
};
use crate::utils::url::{is_http_url, resolve_against, same_origin, Url};

/// 默认缓存作用域名称
pub const DEFAULT_CACHE_NAME: &str = "image-cache";

/// 激活时预热的地址列表（相对于应用源）
pub const DEFAULT_WARMUP_URLS: &[&str] = &["/api/v1/media/"];

/// 默认应用源
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000/";

// ============================================================================
// 核心类型
// ============================================================================

/// 检索错误类型
///
/// 只有真正的网络失败会到达调用方，缓存层的一切故障都被隔离。
#[derive(Error, Debug)]
pub enum FetchError {
    /// 无法解析的请求地址
    #[error("无效的请求地址 '{0}': {1}")]
    InvalidUrl(String, String),

    /// 网络请求失败（连接、超时、响应体读取）
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    Client(String),
}

/// 响应来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
}

/// 一次完成的检索结果
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// 最终地址（重定向后）
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub served_from: ServedFrom,
}

impl FetchedResponse {
    fn from_cache(entry: CachedResponse) -> Self {
        Self {
            url: entry.url,
            status: entry.status,
            headers: entry.headers,
            body: entry.body,
            served_from: ServedFrom::Cache,
        }
    }

    fn to_cached(&self) -> CachedResponse {
        CachedResponse::new(
            self.url.clone(),
            self.status,
            self.headers.clone(),
            self.body.clone(),
        )
    }

    /// 按名称查找响应头（不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// 检索结果
///
/// `Bypass` 表示请求不属于本系统理解的网络传输，
/// 调用方应按默认方式自行处理，会话未做任何干预。
#[derive(Debug, Clone)]
pub enum Retrieved {
    Bypass,
    Response(FetchedResponse),
}

impl Retrieved {
    pub fn into_response(self) -> Option<FetchedResponse> {
        match self {
            Retrieved::Response(r) => Some(r),
            Retrieved::Bypass => None,
        }
    }
}

/// 会话配置
///
/// 缓存名称、预热列表等全部显式传入，不依赖任何隐藏的全局状态，
/// 测试可以为每次运行注入独立的作用域。
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 应用源，决定"同源"判定
    pub origin: Url,
    /// 缓存作用域名称
    pub cache_name: String,
    /// 缓存数据库根目录
    pub cache_root: PathBuf,
    /// 激活时预热的地址（相对路径按 `origin` 解析）
    pub warmup_urls: Vec<String>,
    /// 网络请求超时（秒，0表示不限制）
    pub timeout: u64,
    pub user_agent: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).unwrap(),
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            cache_root: crate::env::cache_dir(),
            warmup_urls: DEFAULT_WARMUP_URLS.iter().map(|s| s.to_string()).collect(),
            timeout: 60,
            user_agent: None,
        }
    }
}

impl SessionConfig {
    pub fn with_origin(origin: Url) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }
}

/// HTTP会话
///
/// 持有可选的已激活缓存，所有检索共享同一个缓存作用域。
pub struct Session {
    client: reqwest::Client,
    config: SessionConfig,
    cache: RwLock<Option<AssetCache>>,
}

// ============================================================================
// 实现
// ============================================================================

impl Session {
    /// 创建未激活缓存的会话（纯网络透传）
    pub fn new(config: SessionConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if config.timeout > 0 {
            builder = builder.timeout(std::time::Duration::from_secs(config.timeout));
        }
        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config,
            cache: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 激活缓存并预热
    ///
    /// 打开（不存在则创建）配置的缓存作用域，随后逐个预取预热列表。
    /// 任何一项预热失败只记日志，不会中止激活，部分预热是可接受的。
    /// 返回成功预热的条目数。
    pub async fn activate(&self) -> CacheResult<usize> {
        let cache = AssetCache::open(&self.config.cache_root, &self.config.cache_name)?;
        info!("缓存已激活: {} ({})", cache.name(), cache.path().display());
        *self.cache.write().unwrap() = Some(cache);

        let mut seeded = 0;
        for path in &self.config.warmup_urls {
            let Some(url) = resolve_against(&self.config.origin, path) else {
                warn!("预热地址无效，跳过: {}", path);
                continue;
            };
            // 预热写入同步落盘，激活返回时种子条目即可命中
            match self.run(Method::GET, url.as_str(), false).await {
                Ok(Retrieved::Response(resp)) if resp.status == 200 => seeded += 1,
                Ok(Retrieved::Response(resp)) => {
                    warn!("预热请求返回 {}: {}", resp.status, url)
                }
                Ok(Retrieved::Bypass) => {}
                Err(e) => warn!("预热请求失败: {} ({})", url, e),
            }
        }
        info!(
            "缓存预热完成，成功 {}/{} 项",
            seeded,
            self.config.warmup_urls.len()
        );
        Ok(seeded)
    }

    /// 缓存是否已激活
    pub fn is_active(&self) -> bool {
        self.cache.read().unwrap().is_some()
    }

    /// 当前缓存统计（未激活时为 `None`）
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache_handle().map(|c| c.stats())
    }

    /// 清空缓存作用域（外部操作者入口）
    pub fn clear_cache(&self) -> CacheResult<()> {
        match self.cache_handle() {
            Some(cache) => cache.clear(),
            None => Ok(()),
        }
    }

    /// 以GET方式检索
    pub async fn get(&self, target: &str) -> Result<Retrieved, FetchError> {
        self.retrieve(Method::GET, target).await
    }

    /// 检索一个请求：缓存优先，未命中走网络
    pub async fn retrieve(&self, method: Method, target: &str) -> Result<Retrieved, FetchError> {
        self.run(method, target, true).await
    }

    fn cache_handle(&self) -> Option<AssetCache> {
        self.cache.read().unwrap().clone()
    }

    async fn run(
        &self,
        method: Method,
        target: &str,
        background_write: bool,
    ) -> Result<Retrieved, FetchError> {
        if !is_http_url(target) {
            debug!("非HTTP(S)请求，放行: {}", target);
            return Ok(Retrieved::Bypass);
        }
        let url = Url::parse(target)
            .map_err(|e| FetchError::InvalidUrl(target.to_string(), e.to_string()))?;
        let key = request_key(method.as_str(), url.as_str());

        if let Some(cache) = self.cache_handle() {
            match cache.get(&key) {
                Ok(Some(entry)) => {
                    debug!("缓存命中: {}", key);
                    return Ok(Retrieved::Response(FetchedResponse::from_cache(entry)));
                }
                Ok(None) => {}
                // 缓存故障按未命中处理，绝不让本次交换失败
                Err(e) => warn!("缓存读取失败，按未命中处理: {} ({})", key, e),
            }
        }

        // 未命中：走网络，网络错误原样传播，不合成回退内容
        let response = self.client.request(method, url.clone()).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        let fetched = FetchedResponse {
            url: final_url.to_string(),
            status,
            headers,
            body,
            served_from: ServedFrom::Network,
        };

        if self.eligible_for_cache(status, &url, &final_url) {
            if let Some(cache) = self.cache_handle() {
                // 复制一份响应记录写缓存，原件交还调用方
                let entry = fetched.to_cached();
                if background_write {
                    let key = key.clone();
                    tokio::spawn(async move {
                        if let Err(e) = cache.put(&key, &entry) {
                            warn!("后台缓存写入失败: {} ({})", key, e);
                        }
                    });
                } else if let Err(e) = cache.put(&key, &entry) {
                    warn!("缓存写入失败: {} ({})", key, e);
                }
            }
        }

        Ok(Retrieved::Response(fetched))
    }

    /// 写入资格判定
    ///
    /// 只缓存完整的状态200同源响应。206（媒体Range请求的局部响应）
    /// 与其余非200状态一律落空；跨源地址和发生跨源重定向的响应
    /// 也不进入缓存。
    fn eligible_for_cache(&self, status: u16, requested: &Url, final_url: &Url) -> bool {
        if status != 200 {
            return false;
        }
        same_origin(requested, &self.config.origin) && same_origin(final_url, requested)
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_session() -> (Session, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = SessionConfig {
            cache_root: dir.path().to_path_buf(),
            warmup_urls: vec![],
            ..SessionConfig::default()
        };
        (Session::new(config).unwrap(), dir)
    }

    #[tokio::test]
    async fn non_http_targets_bypass_untouched() {
        let (session, _dir) = test_session();
        session.activate().await.unwrap();

        for target in [
            "data:image/png;base64,AAAA",
            "ftp://example.com/file",
            "about:blank",
        ] {
            match session.get(target).await.unwrap() {
                Retrieved::Bypass => {}
                other => panic!("expected bypass for {}, got {:?}", target, other),
            }
        }
        // 放行的请求不接触缓存
        assert_eq!(session.cache_stats().unwrap().misses, 0);
    }

    #[test]
    fn eligibility_requires_full_200_same_origin() {
        let (session, _dir) = test_session();
        let origin = session.config().origin.clone();
        let same = origin.join("/api/v1/media/x").unwrap();
        let cross = Url::parse("http://elsewhere.example/x").unwrap();

        assert!(session.eligible_for_cache(200, &same, &same));
        // 局部响应与错误状态
        assert!(!session.eligible_for_cache(206, &same, &same));
        assert!(!session.eligible_for_cache(404, &same, &same));
        assert!(!session.eligible_for_cache(500, &same, &same));
        // 跨源请求与跨源重定向
        assert!(!session.eligible_for_cache(200, &cross, &cross));
        assert!(!session.eligible_for_cache(200, &same, &cross));
    }

    #[tokio::test]
    async fn inactive_session_has_no_cache() {
        let (session, _dir) = test_session();
        assert!(!session.is_active());
        assert!(session.cache_stats().is_none());
        assert!(session.clear_cache().is_ok());
    }
}
