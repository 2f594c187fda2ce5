mod cache;
mod config;
mod leetcode;
mod logging;
mod proxy;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use cache::{CacheLayer, CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
use config::{CacheBackend, Config};
use leetcode::HttpFetcher;
use proxy::CacheProxy;

#[derive(Parser, Debug)]
#[command(name = "leetproxy")]
#[command(about = "Read-through cache proxy for coding-profile statistics and analysis")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./leetproxy.yaml or $XDG_CONFIG_HOME/leetproxy/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to listen on, overrides the config file and PORT
  #[arg(short, long)]
  bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  let _log_guard = logging::init(&config.logging)?;

  let proxy = build_proxy(&config)?;
  server::serve(config.server.bind, server::AppState { proxy }).await
}

fn build_proxy(config: &Config) -> Result<CacheProxy> {
  let storage: Arc<dyn CacheStorage> = match config.cache.backend {
    CacheBackend::Sqlite => Arc::new(SqliteStorage::open(config.cache.path.as_deref())?),
    CacheBackend::Memory => Arc::new(MemoryStorage::new()),
    CacheBackend::None => Arc::new(NoopStorage),
  };
  let cache = CacheLayer::new(storage).with_ttl(config.cache.ttl());
  tracing::info!(
    backend = ?config.cache.backend,
    ttl_secs = cache.ttl().as_secs(),
    "cache store ready"
  );

  let timeout = config.upstream.timeout();
  let profile = HttpFetcher::new(&config.upstream.profile_url, timeout)?;
  let analysis = HttpFetcher::new(&config.upstream.analysis_url, timeout)?;

  Ok(CacheProxy::new(cache, Arc::new(profile), Arc::new(analysis)).with_fetch_timeout(timeout))
}
