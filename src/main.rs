use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crawl_ls::config::{ServerConfig, ServerContext, DEFAULT_CACHE_DIR, DEFAULT_FETCH_TIMEOUT_SECS};
use crawl_ls::server::LspServer;

/// Language server that resolves web links to cached markdown copies.
#[derive(Parser, Debug)]
#[command(name = "crawl-ls")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding cached pages.
    #[arg(long, env = "CRAWL_LS_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Upper bound in seconds for fetching one page.
    #[arg(long, env = "CRAWL_LS_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn parse_log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => anyhow::bail!("invalid log level: {}", other),
        }
    }
}

/// Logs go to stderr; stdout carries protocol frames only.
fn init_tracing(level: Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crawl_ls={level},warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.parse_log_level()?)?;

    // Locations are reported as file:// URIs, which need an absolute path.
    let cache_dir = std::path::absolute(&args.cache_dir).with_context(|| {
        format!("failed to resolve cache directory: {}", args.cache_dir.display())
    })?;

    let config = ServerConfig::new(cache_dir)
        .with_fetch_timeout(Duration::from_secs(args.fetch_timeout_secs));
    info!(
        cache_dir = %config.cache_dir.display(),
        fetch_timeout_secs = args.fetch_timeout_secs,
        "starting crawl-ls"
    );

    let ctx = ServerContext::with_http(config).context("failed to build HTTP client")?;
    LspServer::new(ctx)
        .run()
        .await
        .context("server transport failed")?;

    info!("crawl-ls stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let args = Args::try_parse_from(["crawl-ls"]).unwrap();
        assert_eq!(args.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(args.parse_log_level().unwrap(), Level::INFO);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let args = Args::try_parse_from(["crawl-ls", "--log-level", "loud"]).unwrap();
        assert!(args.parse_log_level().is_err());
    }
}
