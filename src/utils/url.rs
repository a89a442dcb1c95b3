//! URL工具函数
//!
//! 提供抓取层和语言存储共用的URL处理能力。

pub use url::Url;

/// 判断目标地址是否走HTTP(S)网络传输
///
/// 非HTTP(S)地址（如 `data:`、`ftp:`、`chrome-extension:`）不属于
/// 本系统理解的网络请求，调用方应原样放行。
pub fn is_http_url(value: &str) -> bool {
    let value = value.trim_start().to_lowercase();
    value.starts_with("http:") || value.starts_with("https:")
}

/// 判断两个URL是否同源（scheme + host + port）
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// 将相对路径解析为基于给定源的绝对地址
///
/// 已经是绝对地址的输入原样解析返回。
pub fn resolve_against(origin: &Url, target: &str) -> Option<Url> {
    if is_http_url(target) {
        Url::parse(target).ok()
    } else {
        origin.join(target).ok()
    }
}
