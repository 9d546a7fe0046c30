use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ats_flow::config::AppConfig;
use ats_flow::error::AppError;
use ats_flow::workflows::jobs::FileJobStore;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, ProfileData};
use crate::routes::router;

/// Blocks on the HTTP service. The runtime only exists for `serve`; every
/// other command runs without one.
pub(crate) fn start(config: AppConfig, args: ServeArgs) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, args))
}

async fn run(mut config: AppConfig, mut args: ServeArgs) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(FileJobStore::open(config.paths.store_dir())?);
    let profile_data = ProfileData::new(&config.paths, store);

    let app = router()
        .layer(Extension(profile_data))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, profile = %config.paths.profile, "ats flow status service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
