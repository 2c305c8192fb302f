//! langtool — standalone entry point.
//!
//! Starts a supervised local LanguageTool server and idles until Ctrl-C,
//! then terminates it and drains the process-wide registry. Anything
//! beyond that is the library's job; this binary exists so a server can
//! be kept running for other processes to query.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use langtool_client::{LanguageTool, Settings};

/// Debug-logging flag: lowers the default filter to `debug`.
const DEBUG_ENV: &str = "LANGTOOL_DEBUG";

/// Server-mode flag: pick the server config file path up from
/// [`CONFIG_ENV`] instead of running with defaults.
const SERVER_MODE_ENV: &str = "LANGTOOL_SERVER_MODE";

/// Path of a server config file to pass through as `--config`.
const CONFIG_ENV: &str = "LANGTOOL_CONFIG";

fn init_tracing() {
    let default = if env_flag(DEBUG_ENV) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn settings_from_env() -> Settings {
    let mut settings = Settings::default();
    if env_flag(SERVER_MODE_ENV) {
        tracing::info!("running in server mode");
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            settings = settings.with_config_file(path);
        }
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut tool = LanguageTool::connect(settings_from_env()).await?;
    tracing::info!(url = %tool.url(), "LanguageTool server ready");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    tool.close().await;
    langtool_server::registry::terminate_all();
    Ok(())
}
