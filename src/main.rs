//! Payroll engine HTTP server.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use payroll_engine::api::{create_router, AppState};
use payroll_engine::config::{ConfigLoader, LogFormat, LoggingSettings};

const CONFIG_DIR_ENV: &str = "PAYROLL_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "./config/payroll";

fn init_tracing(settings: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    match settings.format {
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir =
        std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let config = ConfigLoader::load(&config_dir)?;
    init_tracing(&config.settings().logging);

    let bind_addr = config.settings().server.bind_addr.clone();
    let state = AppState::new(config);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(config_dir = %config_dir, bind_addr = %bind_addr, "Payroll engine listening");
    axum::serve(listener, router).await?;
    Ok(())
}
