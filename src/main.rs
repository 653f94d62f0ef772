//! PathScope - Main Entry Point

use anyhow::Context;
use std::sync::Arc;

use pathscope_core::api::{self, ServerConfig};
use pathscope_core::constants;
use pathscope_core::logic::probe::{HttpProbe, HttpProbeConfig};
use pathscope_core::logic::{Engine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let config = EngineConfig::from_env().context("Failed to load configuration")?;

    let probe = HttpProbe::new(HttpProbeConfig {
        resolvers: config.dns.resolvers.clone(),
        ..HttpProbeConfig::default()
    })
    .context("Failed to build HTTP probe")?;

    let engine = Arc::new(Engine::new());
    engine.start(config, Arc::new(probe))?;

    let server_config = ServerConfig::from_env();
    let server = if server_config.enabled {
        let engine = Arc::clone(&engine);
        Some(tokio::spawn(async move {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            if let Err(e) = api::serve(&server_config, engine, shutdown).await {
                log::error!("[API] Exporter failed: {}", e);
            }
        }))
    } else {
        log::info!("HTTP exporter disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    log::info!("Shutting down...");

    if let Some(server) = server {
        let _ = server.await;
    }
    engine.stop().await;

    if constants::is_export_on_exit() {
        match engine.export_to_file(None) {
            Ok(path) => log::info!("Final snapshot written to {}", path.display()),
            Err(e) => log::warn!("Could not write final snapshot: {}", e),
        }
    }

    Ok(())
}
