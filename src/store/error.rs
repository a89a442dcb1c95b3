//! 语言存储统一错误处理

use thiserror::Error;

/// 语言存储错误类型
///
/// 远端内容的所有失败路径都是"记日志并沿用现有文案"，
/// 这些错误类型主要用于日志与调用方的可观测性。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 偏好持久化读写失败
    #[error("偏好存储读写失败: {0}")]
    Storage(#[from] std::io::Error),

    /// 语言端点地址无效
    #[error("语言端点地址无效: {0}")]
    Endpoint(String),

    /// 语言内容请求失败（网络层）
    #[error("语言内容请求失败: {0}")]
    Fetch(String),

    /// 语言端点返回异常状态
    #[error("语言端点返回异常状态: {0}")]
    BadStatus(u16),

    /// 语言内容负载解析失败
    #[error("语言内容解析失败: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
