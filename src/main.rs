use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use resumegen_server::{routes, AppState, Settings};
use std::net::TcpListener;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new().context("Failed to load configuration")?;
    info!("Configuration loaded for {} environment", config.environment);

    let state = AppState::new(config.clone())
        .await
        .context("Failed to initialize application state")?;
    let state = web::Data::new(state);

    // Expired limiter windows and revocations are only dropped here
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_state.purge_expired().await;
        }
    });

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Starting server at http://{}", address);

    let workers = config.server.workers as usize;
    let cors_config = config.cors;
    HttpServer::new(move || {
        App::new()
            .wrap(routes::error_handlers())
            .wrap(routes::security_headers())
            .wrap(routes::cors(&cors_config))
            .wrap(Logger::default())
            .configure(|cfg| routes::configure(cfg, state.clone()))
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .context("Server terminated with an error")?;

    info!("Server stopped");
    Ok(())
}
