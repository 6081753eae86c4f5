//! Kairos Scheduler - Main Entry Point
//!
//! Serves the jobs REST surface and drives due jobs through the callback
//! invoker until Ctrl+C.

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kairos_api_http::scheduler::{self, SchedulerState};
use kairos_core::application::{
    shutdown_channel, CallbackInvoker, JobRepositoryRouter, JobService, RepositoryRegistry,
    RetryPolicy, TimerScheduler,
};
use kairos_core::port::time_provider::SystemTimeProvider;
use kairos_core::port::{JobRepository, TimeProvider};
use kairos_infra_http::HttpCallbackSender;

use crate::settings::{LogConfig, LogFormat, Settings};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "kairos-scheduler")]
#[command(about = "Kairos job scheduler daemon", long_about = None)]
#[command(version)]
struct Args {
    /// Settings file (TOML)
    #[arg(long, env = "KAIROS_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Configuration, then logging
    let settings =
        Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = init_logging(&settings.log)?;

    info!("Kairos scheduler v{} starting...", VERSION);

    // 2. Repository (selected once; everything below shares it)
    let mut registry = RepositoryRegistry::with_defaults();
    kairos_infra_sqlite::register(&mut registry);
    let router = JobRepositoryRouter::select(&registry, &settings.repository)
        .await
        .context("Failed to initialize job repository")?;
    let repo: Arc<dyn JobRepository> = Arc::new(router);

    // 3. Callback delivery
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let sender = Arc::new(
        HttpCallbackSender::new(settings.callback.timeout())
            .context("Failed to build callback client")?,
    );
    let retry_policy = Arc::new(RetryPolicy::new(settings.callback.clone()));
    let invoker = Arc::new(CallbackInvoker::new(
        repo.clone(),
        sender,
        retry_policy,
        time_provider.clone(),
    ));

    // 4. Scheduler loop
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let timer_scheduler = TimerScheduler::new(
        repo.clone(),
        invoker,
        time_provider.clone(),
        settings.scheduler.clone(),
        settings.callback.max_concurrent,
    );
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = timer_scheduler.run(shutdown_rx).await {
            error!(error = ?e, "Timer scheduler failed");
        }
    });

    // 5. REST surface
    let jobs = Arc::new(JobService::new(repo, time_provider));
    let app = scheduler::router(SchedulerState::new(jobs));

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Scheduler listening. Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // 6. Graceful shutdown
    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, scheduler_handle)
        .await
        .is_err()
    {
        warn!("Timer scheduler did not stop within the grace period");
    }
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}

/// Console output per `log.format`, plus a rolling JSON file when
/// `log.directory` is set. The returned guard must live until exit.
fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("kairos=info"))
        .context("Failed to create env filter")?;

    let otel_layer = telemetry::layer().unwrap_or_else(|e| {
        eprintln!("Failed to initialize OpenTelemetry (continuing without it): {}", e);
        None
    });

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let directory = shellexpand::tilde(directory).into_owned();
            let appender = tracing_appender::rolling::daily(directory, "kairos-scheduler.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter)
        .with(file_layer);

    match config.format {
        // Production: JSON structured logging
        LogFormat::Json => subscriber.with(fmt::layer().json()).init(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => subscriber.with(fmt::layer().pretty()).init(),
    }

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = ?e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received. Exiting gracefully...");
}
