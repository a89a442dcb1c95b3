//! Luma客户端外壳（CLI）
//!
//! 对应浏览器端的应用挂载流程：初始化日志、激活响应缓存、
//! 解析语言并加载文案，随后按参数执行抓取或维护操作。

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use luma::core::{mount, ShellOptions};
use luma::env::EnvVar;
use luma::network::{Retrieved, ServedFrom};
use luma::store::Language;

#[derive(Parser)]
#[command(name = "luma", version, about = "Luma reading interface client shell")]
struct Cli {
    /// Origin of the backend API (defaults to LUMA_API_ORIGIN)
    #[arg(long)]
    origin: Option<String>,

    /// Switch to this language after startup (en, zh, ja, ko)
    #[arg(long)]
    language: Option<String>,

    /// Disable the local response cache (plain network mode)
    #[arg(long)]
    no_cache: bool,

    /// Clear the response cache scope and exit
    #[arg(long)]
    clear_cache: bool,

    /// Fetch these URLs through the cache-first channel (repeatable)
    #[arg(long = "fetch")]
    fetch: Vec<String>,

    /// Override the cache database directory (defaults to LUMA_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the preference data directory (defaults to LUMA_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let level = luma::env::core::LogLevel::get().unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .init();

    let cli = Cli::parse();

    // 参数先行校验，挂载之前就拒绝无效语言代码
    let target_language = match cli.language.as_deref() {
        Some(code) => match Language::from_code(code) {
            Some(lang) => Some(lang),
            None => {
                eprintln!("不支持的语言代码: {} (可用: en, zh, ja, ko)", code);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let options = ShellOptions {
        api_origin: cli.origin,
        cache_root: cli.cache_dir,
        data_dir: cli.data_dir,
        offline_cache: !cli.no_cache,
        ..ShellOptions::default()
    };

    let shell = match mount(options).await {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("启动失败: {}", e);
            std::process::exit(1);
        }
    };

    if cli.clear_cache {
        if let Err(e) = shell.session.clear_cache() {
            eprintln!("清空缓存失败: {}", e);
            std::process::exit(1);
        }
        println!("缓存已清空");
        return;
    }

    if let Some(lang) = target_language {
        shell.store.change_language(lang).await;
    }

    println!(
        "{} — {}",
        shell.store.text("title"),
        shell.store.text("joseonSpace")
    );
    println!("language: {}", shell.store.language());

    let mut failures = 0;
    for target in &cli.fetch {
        match shell.session.get(target).await {
            Ok(Retrieved::Response(resp)) => {
                let source = match resp.served_from {
                    ServedFrom::Cache => "cache",
                    ServedFrom::Network => "network",
                };
                println!(
                    "{} {} [{}] {} bytes",
                    resp.status,
                    resp.url,
                    source,
                    resp.body.len()
                );
            }
            Ok(Retrieved::Bypass) => {
                println!("跳过非HTTP(S)地址: {}", target);
            }
            Err(e) => {
                eprintln!("抓取失败: {} ({})", target, e);
                failures += 1;
            }
        }
    }

    if let Some(stats) = shell.session.cache_stats() {
        println!(
            "cache: {} entries, {} hits, {} misses",
            stats.entries, stats.hits, stats.misses
        );
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
