use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::network::{CacheError, FetchError, Session, SessionConfig};
use crate::store::{LanguageStore, StoreConfig, StoreError};
use crate::utils::url::Url;

/// Represents errors that can occur while assembling the client shell
///
/// This error type encapsulates all possible errors that can occur
/// when mounting the Luma client core.
#[derive(Debug)]
pub struct LumaError {
    details: String,
}

impl LumaError {
    /// Creates a new LumaError with the given message
    pub fn new(msg: &str) -> LumaError {
        LumaError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for LumaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for LumaError {
    fn description(&self) -> &str {
        &self.details
    }
}

impl From<FetchError> for LumaError {
    fn from(e: FetchError) -> Self {
        LumaError::new(&e.to_string())
    }
}

impl From<CacheError> for LumaError {
    fn from(e: CacheError) -> Self {
        LumaError::new(&e.to_string())
    }
}

impl From<StoreError> for LumaError {
    fn from(e: StoreError) -> Self {
        LumaError::new(&e.to_string())
    }
}

/// Configuration options for mounting the client shell
///
/// Unset fields fall back to environment variables and built-in
/// defaults (see `env`).
#[derive(Clone, Debug)]
pub struct ShellOptions {
    pub api_origin: Option<String>,
    pub cache_name: Option<String>,
    pub cache_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub locale_tag: Option<String>,
    /// Activate the response cache (cache-first interception)
    pub offline_cache: bool,
    pub timeout: u64,
    pub user_agent: Option<String>,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            api_origin: None,
            cache_name: None,
            cache_root: None,
            data_dir: None,
            locale_tag: None,
            offline_cache: true,
            timeout: 60,
            user_agent: None,
        }
    }
}

/// The assembled client core: one shared session plus the language store
pub struct LumaShell {
    pub session: Arc<Session>,
    pub store: LanguageStore,
}

/// Mounts the client core
///
/// Builds the HTTP session, optionally activates the response cache
/// (activation failures are logged and degrade to plain network mode),
/// then creates the language store and runs its resolution sequence.
pub async fn mount(options: ShellOptions) -> Result<LumaShell, LumaError> {
    use crate::env::{core::ApiOrigin, EnvVar};

    let origin_str = match options.api_origin {
        Some(origin) => origin,
        None => ApiOrigin::get().map_err(|e| LumaError::new(&e.to_string()))?,
    };
    let origin = Url::parse(&origin_str)
        .map_err(|e| LumaError::new(&format!("invalid API origin '{}': {}", origin_str, e)))?;

    let mut session_config = SessionConfig::with_origin(origin);
    if let Some(name) = options.cache_name {
        session_config.cache_name = name;
    }
    if let Some(root) = options.cache_root {
        session_config.cache_root = root;
    }
    session_config.timeout = options.timeout;
    session_config.user_agent = options.user_agent;

    let session = Arc::new(Session::new(session_config)?);

    if options.offline_cache {
        // Cache infrastructure failures never take the client down
        if let Err(e) = session.activate().await {
            warn!("缓存激活失败，继续以纯网络模式运行: {}", e);
        }
    }

    let mut store_config = StoreConfig::default();
    if let Some(dir) = options.data_dir {
        store_config.data_dir = dir;
    }
    store_config.locale_tag = options.locale_tag;
    store_config.validate()?;

    let store = LanguageStore::new(store_config, Arc::clone(&session));
    store.initialize().await;

    Ok(LumaShell { session, store })
}
