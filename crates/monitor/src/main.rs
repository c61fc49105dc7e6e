//! `linewatch-monitor` -- headless production-line monitor.
//!
//! Polls the production backend, keeps the derived dashboard state in a
//! `ProductionStore`, and logs a summary every time the state changes.
//! Configuration is read from the environment (see
//! [`linewatch_monitor::config::MonitorConfig::from_env`]).

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linewatch_client::api::ProductionApi;
use linewatch_client::backend::ProductionBackend;
use linewatch_core::catalog::LineCatalog;
use linewatch_monitor::config::{LineSource, LogFormat, MonitorConfig};
use linewatch_monitor::report;
use linewatch_sync::events::StoreEvent;
use linewatch_sync::poller::Poller;
use linewatch_sync::store::{discover_catalog, ProductionStore};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str =
    "linewatch_monitor=info,linewatch_sync=info,linewatch_client=info";

/// How long to wait for the reporter task on shutdown.
const REPORTER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    });

    init_tracing(config.log_format);

    let api = ProductionApi::from_config(&config.client_config()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Cannot build API client");
        std::process::exit(1);
    });
    let backend: Arc<dyn ProductionBackend> = Arc::new(api);

    let catalog = match &config.lines {
        LineSource::Fixed(catalog) => catalog.clone(),
        LineSource::Discover => match discover_catalog(backend.as_ref()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(error = %e, "Line discovery failed, using the default floor");
                LineCatalog::default()
            }
        },
    };

    tracing::info!(
        api_url = %config.api_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        request_timeout_secs = config.request_timeout.map(|t| t.as_secs()),
        lines = ?catalog.ids().collect::<Vec<_>>(),
        "Starting linewatch-monitor",
    );

    let store = Arc::new(ProductionStore::new(backend, catalog));
    let cancel = CancellationToken::new();

    let reporter = tokio::spawn(report_changes(
        store.clone(),
        config.display_offset,
        cancel.clone(),
    ));
    let poller = Poller::spawn(store, config.poll_interval, cancel.clone());

    shutdown_signal().await;
    cancel.cancel();
    poller.shutdown().await;
    let _ = tokio::time::timeout(REPORTER_SHUTDOWN_TIMEOUT, reporter).await;

    tracing::info!("Shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Log a summary of the store after every committed cycle and mutation.
async fn report_changes(store: Arc<ProductionStore>, offset: FixedOffset, cancel: CancellationToken) {
    let mut events = store.subscribe();
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(StoreEvent::SyncFailed { error }) => {
                tracing::warn!(error = %error, "Dashboard data is stale");
            }
            Ok(event) => {
                tracing::debug!(?event, "Store changed");
                let state = store.state().await;
                let now = Utc::now();
                for line in report::line_summaries(&state, now) {
                    tracing::info!("{line}");
                }
                for failure in report::open_failure_summaries(&state, now, &offset) {
                    tracing::info!("open failure {failure}");
                }
                tracing::info!(
                    produced = state.metrics.total_produced,
                    target = state.metrics.total_target,
                    efficiency = state.metrics.overall_efficiency,
                    active_lines = state.metrics.active_lines,
                    open_issues = state.metrics.total_issues,
                    avg_cycle_min = state.metrics.average_cycle_time_min,
                    "Production totals"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Reporter lagged behind store events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
