use crate::cli::ServeArgs;
use crate::infra::{AppState, Platform, TokenDirectory};
use crate::routes::platform_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use volunteer_hub::config::AppConfig;
use volunteer_hub::error::AppError;
use volunteer_hub::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let identity = TokenDirectory::from_sessions(std::mem::take(&mut args.sessions));
    if identity.is_empty() {
        warn!("no sessions registered; authenticated routes will answer 401");
    }

    let acceptance_mode = config.intake.acceptance_mode;
    let platform = Platform::in_memory(acceptance_mode, identity);

    let app = platform_router(&platform)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        acceptance_mode = acceptance_mode.label(),
        "volunteer hub ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
