mod auth;
mod config;
mod data_url;
mod error;
mod gemini;
mod gemini_client;
mod logging;
mod models;
mod normalizer;
mod request_id;
mod router;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use config::Config;
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tower_http::cors::CorsLayer;
use tracing::{Level, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "image-edit-gateway")]
#[command(about = "Forwards image edit requests to a generative model and normalizes the reply")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: String,

    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Path to config file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Optional bearer token guarding the API
    #[arg(short, long)]
    token: Option<String>,

    /// trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log file (size-capped)
    #[arg(long)]
    log_file: Option<String>,

    /// socks and http proxy, example: socks5://192.168.0.2:10080
    #[arg(long)]
    proxy: Option<String>,
}

async fn watch_config_file(
    config_path: &str,
    config: &Arc<RwLock<Config>>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher = notify::recommended_watcher(move |res| {
        if let Ok(event) = res {
            if let Err(e) = tx.blocking_send(event) {
                eprintln!("Failed to send event: {}", e);
            }
        }
    })?;

    watcher.watch(Path::new(config_path), RecursiveMode::NonRecursive)?;

    while let Some(event) = rx.recv().await {
        if let EventKind::Modify(_) = event.kind {
            info!("Config file modified, attempting to reload");
            match Config::from_file(config_path) {
                Ok(new_config) => {
                    *config.write().await = new_config;
                    info!("Configuration reloaded successfully");
                }
                Err(e) => {
                    error!("Failed to reload configuration: {}", e);
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = Level::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using INFO level.", args.log_level);
        Level::INFO
    });
    logging::init_logging(log_level, args.log_file.as_deref());

    let config_path = args.config.clone();
    let config = Arc::new(RwLock::new(Config::from_file(&config_path)?));
    info!("Configuration loaded successfully from: {}", config_path);

    // Hot-reload the config on file changes
    let config_path_for_watcher = config_path.clone();
    let config_for_watcher = config.clone();
    tokio::spawn(async move {
        if let Err(e) = watch_config_file(&config_path_for_watcher, &config_for_watcher).await {
            warn!("Config file watcher error: {}", e);
        }
    });

    // One shared reqwest client; the provider timeout is applied per request
    let client_builder = reqwest::Client::builder();
    let client_builder = if let Some(proxy) = &args.proxy {
        client_builder.proxy(reqwest::Proxy::all(proxy)?)
    } else {
        client_builder
    };
    let http_client = Arc::new(client_builder.build()?);

    let gemini_client = Arc::new(gemini_client::GeminiClient::new(http_client));

    let app_state = auth::AppState {
        config,
        token: args.token,
        gemini_client,
    };

    let app = Router::new()
        .route("/api/edit-image", post(router::edit_image))
        .route("/health", get(|| async { "OK" }))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_authorization,
        ))
        .layer(axum::middleware::from_fn(request_id::inject_request_id))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_address = format!("{}:{}", args.ip, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server started on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
