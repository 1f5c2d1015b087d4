//! resurface-server - REST API server binary.

use std::net::SocketAddr;

use resurface_server::{create_server, create_server_with_auth, factory, AppState};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("resurface_server=debug".parse()?);
    let json_logs = std::env::var("RESURFACE_LOG_FORMAT").is_ok_and(|f| f == "json");
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    // Get configuration from environment
    let host = std::env::var("RESURFACE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("RESURFACE_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("RESURFACE_PORT must be a valid port number: {}", e))?;
    let require_auth = std::env::var("RESURFACE_REQUIRE_AUTH").is_ok();

    let config = factory::load_config()?;
    let state = AppState::new(factory::create_service(&config)?);

    // Create server with or without auth
    let app = if require_auth {
        let api_key = std::env::var("RESURFACE_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            warn!("RESURFACE_REQUIRE_AUTH is set but RESURFACE_API_KEY is empty");
        }
        info!("Authentication enabled");
        create_server_with_auth(state, api_key)
    } else {
        info!("Authentication disabled");
        create_server(state)
    };

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting resurface-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped cleanly");
    Ok(())
}
