use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use todolist::cli::{Cli, Commands};
use todolist::config::{self, Config};
use todolist::errors;
use todolist::middleware::panic;
use todolist::store::PgStore;
use todolist::{app, AppState};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    // Environment changes must happen before worker threads exist.
    errors::enable_backtraces();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let cfg = config::load();
    let args = Cli::parse();

    init_tracing(args.development);
    panic::install_hook();

    let mut cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            return Err(e);
        }
    };
    if let Some(service) = args.service {
        cfg.service_name = service;
    }

    let result = match args.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => run_server(cfg, port).await,
        Commands::Migrate => run_migrations(&cfg).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = ?e, "exiting with error");
    }
    result
}

/// JSON logs by default, human-readable ones with `--development`.
fn init_tracing(development: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("todolist=debug,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    if development {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init();
    }
}

async fn run_migrations(cfg: &Config) -> anyhow::Result<()> {
    let db = PgStore::connect(&cfg.database).await?;
    db.migrate().await.context("failed to apply migrations")?;
    tracing::info!("migrations applied");
    Ok(())
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database).await?;

    tracing::info!("Running migrations...");
    db.migrate().await.context("failed to apply migrations")?;

    let ip = cfg
        .api_host
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid API_HOST '{}'", cfg.api_host))?;
    let addr = SocketAddr::new(ip, port.unwrap_or(cfg.api_port));

    let state = Arc::new(AppState::new(cfg, db)?);
    let router = app(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(service = %state.config.service_name, "todolist listening on {}", addr);

    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                signal_rx.await.ok();
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined.context("server task failed")??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }
    tracing::info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "shutdown signal received, draining requests");
    signal_tx.send(()).ok();

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(joined) => joined.context("server task failed")??,
        Err(_) => tracing::warn!("grace period elapsed with requests still in flight"),
    }

    state.db.pool().close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
