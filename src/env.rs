//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，集中声明本应用识别的
//! 全部变量及其默认值。

use std::env;
use std::fmt;
use std::path::PathBuf;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Environment variable '{}': {}",
            self.variable, self.message
        )
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 应用运行模式
    pub struct Mode;
    impl EnvVar<String> for Mode {
        const NAME: &'static str = "LUMA_MODE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Application mode: development, staging, production";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("production".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "development" | "dev" => Ok("development".to_string()),
                "staging" | "stage" => Ok("staging".to_string()),
                "production" | "prod" => Ok("production".to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid mode '{}'. Use: development, staging, production",
                        value
                    ),
                }),
            }
        }
    }

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "LUMA_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 后端API源
    pub struct ApiOrigin;
    impl EnvVar<String> for ApiOrigin {
        const NAME: &'static str = "LUMA_API_ORIGIN";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Origin of the Luma backend API";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::network::DEFAULT_ORIGIN.to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            if crate::utils::is_http_url(value) {
                Ok(value.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("'{}' is not an http(s) origin", value),
                })
            }
        }
    }

    /// 响应缓存根目录
    pub struct CacheDir;
    impl EnvVar<PathBuf> for CacheDir {
        const NAME: &'static str = "LUMA_CACHE_DIR";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str = "Directory holding response cache databases";

        fn get() -> EnvResult<PathBuf> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(PathBuf::from(".luma/cache")),
            }
        }

        fn parse(value: &str) -> EnvResult<PathBuf> {
            if value.trim().is_empty() {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                })
            } else {
                Ok(PathBuf::from(value))
            }
        }
    }

    /// 偏好数据目录
    pub struct DataDir;
    impl EnvVar<PathBuf> for DataDir {
        const NAME: &'static str = "LUMA_DATA_DIR";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str = "Directory holding durable user preferences";

        fn get() -> EnvResult<PathBuf> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(PathBuf::from(".luma/data")),
            }
        }

        fn parse(value: &str) -> EnvResult<PathBuf> {
            if value.trim().is_empty() {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                })
            } else {
                Ok(PathBuf::from(value))
            }
        }
    }

    /// 显式指定的界面语言标签（覆盖系统locale）
    pub struct Locale;
    impl EnvVar<String> for Locale {
        const NAME: &'static str = "LUMA_LOCALE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Locale tag override, e.g. zh-CN, ja-JP";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }
}

/// 缓存根目录（环境覆盖，带默认值）
pub fn cache_dir() -> PathBuf {
    core::CacheDir::get().unwrap_or_else(|_| PathBuf::from(".luma/cache"))
}

/// 偏好数据目录（环境覆盖，带默认值）
pub fn data_dir() -> PathBuf {
    core::DataDir::get().unwrap_or_else(|_| PathBuf::from(".luma/data"))
}

/// 读取环境报告的locale标签
///
/// 优先级：`LUMA_LOCALE` > `LC_ALL` > `LANG`。
/// 自动检测只在没有持久化语言偏好时使用一次。
pub fn ambient_locale_tag() -> Option<String> {
    if let Ok(tag) = core::Locale::get() {
        return Some(tag);
    }
    for name in ["LC_ALL", "LANG"] {
        if let Ok(tag) = env::var(name) {
            if !tag.trim().is_empty() {
                return Some(tag);
            }
        }
    }
    None
}
