//! 语言存储配置
//!
//! 提供存储目录、locale注入等显式配置，以及端点与默认文案常量。

use std::path::PathBuf;

use crate::store::error::{StoreError, StoreResult};

/// 配置常量
pub mod constants {
    /// 语言内容端点（相对于应用源）
    pub const LANGUAGE_ENDPOINT_PATH: &str = "api/v1/languages/";

    /// 语言代码的查询参数名
    pub const LANGUAGE_QUERY_PARAM: &str = "language";

    /// 持久化语言偏好的键名
    pub const STORAGE_KEY: &str = "userLanguage";

    /// 内置英文默认文案
    ///
    /// 远端内容到达前的初始字符串表，远端缺失的键保留这些值。
    pub const DEFAULT_STRINGS: &[(&str, &str)] = &[
        ("title", "Luma"),
        ("joseonSpace", "Joseon Space Luma"),
        ("themeTooltip", "Toggle light/dark theme"),
        ("searchPlaceholder", "Search all notices"),
        ("scrollForRecent", "Scroll down browse recent news"),
        ("indexCount", "article indexed & translated"),
    ];
}

/// 语言存储配置
///
/// 数据目录与locale标签全部显式传入，测试可以为每次运行注入
/// 独立的目录和检测信号。
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 持久化偏好所在目录
    pub data_dir: PathBuf,
    /// 注入的locale标签；`None` 时读取环境信号
    pub locale_tag: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::env::data_dir(),
            locale_tag: None,
        }
    }
}

impl StoreConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locale_tag: None,
        }
    }

    /// 验证配置
    pub fn validate(&self) -> StoreResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StoreError::Config("数据目录不能为空".to_string()));
        }
        Ok(())
    }
}
