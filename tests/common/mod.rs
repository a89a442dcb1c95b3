// 集成测试公共模块
//
// 提供临时目录环境与本地语言端点fixture

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tempfile::TempDir;

use luma::network::{Session, SessionConfig};
use luma::utils::url::Url;

/// 测试环境：每个测试独立的缓存与数据目录
pub struct TestEnvironment {
    temp: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("temp dir"),
        }
    }

    pub fn cache_root(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }
}

/// 计数与故障注入共享状态
#[derive(Default)]
pub struct ServerState {
    hits: Mutex<HashMap<String, u64>>,
    fail_languages: AtomicBool,
    malformed_languages: AtomicBool,
    language_delays: Mutex<HashMap<String, u64>>,
}

impl ServerState {
    fn incr(&self, key: &str) {
        let mut hits = self.hits.lock().unwrap();
        *hits.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// 本地后端fixture：语言端点、媒体索引与各类故障端点
pub struct TestServer {
    pub origin: String,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/api/v1/languages/", get(languages))
            .route("/api/v1/media/", get(media))
            .route("/asset", get(asset))
            .route("/missing", get(missing))
            .route("/server-error", get(server_error))
            .route("/partial", get(partial))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            origin: format!("http://{}/", addr),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path.trim_start_matches('/'))
    }

    /// 某端点被真实命中的次数
    pub fn hit_count(&self, key: &str) -> u64 {
        *self.state.hits.lock().unwrap().get(key).unwrap_or(&0)
    }

    /// 某语言代码被请求的次数
    pub fn language_requests(&self, code: &str) -> u64 {
        self.hit_count(&format!("lang:{}", code))
    }

    pub fn set_fail_languages(&self, on: bool) {
        self.state.fail_languages.store(on, Ordering::SeqCst);
    }

    pub fn set_malformed_languages(&self, on: bool) {
        self.state.malformed_languages.store(on, Ordering::SeqCst);
    }

    /// 延迟指定语言的响应，用于构造迟到的过期响应
    pub fn set_language_delay(&self, code: &str, ms: u64) {
        self.state
            .language_delays
            .lock()
            .unwrap()
            .insert(code.to_string(), ms);
    }
}

/// 各语言的测试文案，故意只覆盖部分键以便验证合并语义
fn language_table(code: &str) -> serde_json::Value {
    match code {
        "en" => serde_json::json!({
            "title": "Luma",
            "searchPlaceholder": "Search all notices",
        }),
        "zh" => serde_json::json!({
            "title": "卢玛",
            "searchPlaceholder": "搜索全部公告",
        }),
        "ja" => serde_json::json!({
            "title": "ルマ",
        }),
        "ko" => serde_json::json!({
            "title": "루마",
            "scrollForRecent": "아래로 스크롤하여 최근 소식 보기",
        }),
        _ => serde_json::json!({}),
    }
}

async fn languages(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let code = params.get("language").cloned().unwrap_or_default();
    state.incr(&format!("lang:{}", code));

    let delay = state
        .language_delays
        .lock()
        .unwrap()
        .get(&code)
        .copied();
    if let Some(ms) = delay {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    if state.fail_languages.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "language backend down").into_response();
    }
    if state.malformed_languages.load(Ordering::SeqCst) {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            "{not valid json",
        )
            .into_response();
    }
    Json(language_table(&code)).into_response()
}

async fn media(State(state): State<Arc<ServerState>>) -> Response {
    state.incr("media");
    (StatusCode::OK, "media index").into_response()
}

async fn asset(State(state): State<Arc<ServerState>>) -> Response {
    state.incr("asset");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "asset-body",
    )
        .into_response()
}

async fn missing(State(state): State<Arc<ServerState>>) -> Response {
    state.incr("missing");
    (StatusCode::NOT_FOUND, "not found").into_response()
}

async fn server_error(State(state): State<Arc<ServerState>>) -> Response {
    state.incr("server-error");
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn partial(State(state): State<Arc<ServerState>>) -> Response {
    state.incr("partial");
    (
        StatusCode::PARTIAL_CONTENT,
        [(header::CONTENT_RANGE, "bytes 0-4/100")],
        "chunk",
    )
        .into_response()
}

/// 指向测试服务器的会话配置，预热列表默认为空
pub fn session_config(origin: &str, env: &TestEnvironment) -> SessionConfig {
    SessionConfig {
        origin: Url::parse(origin).expect("origin"),
        cache_name: "image-cache".to_string(),
        cache_root: env.cache_root(),
        warmup_urls: vec![],
        timeout: 10,
        user_agent: None,
    }
}

pub fn new_session(origin: &str, env: &TestEnvironment) -> Session {
    Session::new(session_config(origin, env)).expect("session")
}

/// 轮询等待条件成立（用于等待后台缓存写入落盘）
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_millis(timeout_ms);
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
