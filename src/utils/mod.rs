//! # 工具模块
//!
//! 这个模块包含各种工具函数和实用程序：
//!
//! - URL协议判断与规范化
//! - 同源判断
//! - 相对路径到绝对地址的解析
//!
//! # 模块组织
//!
//! - `url` - URL处理、同源检查等工具函数

pub mod url;

// Re-export commonly used items for convenience
pub use url::{is_http_url, resolve_against, same_origin, Url};
