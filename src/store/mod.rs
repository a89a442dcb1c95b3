//! # 语言存储模块
//!
//! 维护界面语言偏好与本地化字符串表，采用清晰的模块化架构：
//!
//! - **language**: 语言存储本体（解析状态机、切换、内容合并）
//! - **storage**: 偏好持久化（`userLanguage` 键文件）
//! - **config**: 显式配置与常量
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use luma::network::{Session, SessionConfig};
//! use luma::store::{Language, LanguageStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(Session::new(SessionConfig::default())?);
//! let store = LanguageStore::new(StoreConfig::default(), session);
//!
//! store.initialize().await;
//! store.change_language(Language::Ko).await;
//! println!("{}", store.text("title"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod language;
pub mod storage;

// Re-export commonly used items for convenience
pub use config::{constants, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use language::{Language, LanguageStore, ResolveState, StoreStats};
pub use storage::PreferenceStorage;
