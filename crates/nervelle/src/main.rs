//! Nervelle - username/password login with role-routed dashboards

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use nervelle_api::{AppState, create_router};
use nervelle_auth::{JwtManager, SessionAuthenticator};
use nervelle_core::{UserService, spawn_session_cleanup_task};
use nervelle_db::Database;

/// Nervelle - username/password login with role-routed dashboards
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "NERVELLE_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "NERVELLE_PORT")]
    port: Option<u16>,

    /// Database URL
    #[arg(long, env = "NERVELLE_DATABASE_URL")]
    database_url: Option<String>,

    /// Session signing secret (at least 32 bytes)
    #[arg(long, env = "NERVELLE_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// Username of the bootstrap admin account
    #[arg(long, env = "NERVELLE_ADMIN_USERNAME")]
    admin_username: Option<String>,

    /// Password of the bootstrap admin account
    #[arg(long, env = "NERVELLE_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

impl Args {
    /// Command line and environment values win over the config file
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(secret) = self.session_secret {
            config.auth.session_secret = Some(secret);
        }
        if let Some(username) = self.admin_username {
            config.bootstrap.admin_username = username;
        }
        if let Some(password) = self.admin_password {
            config.bootstrap.admin_password = Some(password);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);

    // Initialize logging
    init_logging(&config.logging.level, &config.logging.format);

    info!("Starting Nervelle v{}", env!("CARGO_PKG_VERSION"));

    let session_secret = config.session_secret()?;

    // Create data directory
    if let Some(dir) = config.database_dir() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
    }

    // Initialize database
    let db = Database::new(&config.database.url).await?;

    // Initialize session authenticator
    let auth = SessionAuthenticator::new(
        db.clone(),
        JwtManager::new(session_secret),
        config.session_ttl(),
    )?;
    let users = UserService::new(db.clone(), auth.clone());

    users
        .ensure_bootstrap_admin(
            &config.bootstrap.admin_username,
            config.bootstrap.admin_password.as_deref(),
        )
        .await?;

    // Initialize metrics
    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    if !config.auth.secure_cookies {
        warn!("Session cookies are not marked Secure; serve behind HTTPS in production");
    }

    // Background expired-session cleanup
    let cleanup = spawn_session_cleanup_task(auth.clone(), config.auth.cleanup_interval_minutes);

    // Create application state
    let state = AppState::new(db.clone(), auth, users, config.auth.secure_cookies);

    // Create router
    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    db.close().await;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
