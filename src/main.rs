use clipsync_lib::bootstrap::{self, tracing::init_tracing_subscriber, wiring};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = bootstrap::config_path();
    let config = bootstrap::load_config_or_default(config_path.as_deref())?;

    let logs_dir = if config.log_to_file {
        Some(wiring::resolve_app_dirs(&config)?.logs_dir)
    } else {
        None
    };
    init_tracing_subscriber(logs_dir.as_deref())?;

    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "config path");
    }
    bootstrap::run_app(config).await
}
