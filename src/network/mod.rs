//! # 网络模块
//!
//! 这个模块包含所有与网络通信和缓存相关的功能：
//!
//! - HTTP会话管理和缓存优先检索
//! - 持久化响应缓存
//!
//! # 模块组织
//!
//! - `session` - HTTP会话管理、请求拦截、缓存优先策略
//! - `cache` - 以请求标识为键的持久化响应缓存

pub mod cache;
pub mod session;

// Re-export commonly used items for convenience
pub use cache::{request_key, AssetCache, CacheError, CacheResult, CacheStats, CachedResponse};
pub use session::{
    FetchError, FetchedResponse, Method, Retrieved, ServedFrom, Session, SessionConfig,
    DEFAULT_CACHE_NAME, DEFAULT_ORIGIN, DEFAULT_WARMUP_URLS,
};
