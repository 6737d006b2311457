use crate::cli::ServeArgs;
use crate::infra::{
    build_marketplace, AppState, LoggingNotificationSink, SimulatedPaymentGateway,
    StaticIdentityDirectory,
};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use tutorhub::config::AppConfig;
use tutorhub::error::AppError;
use tutorhub::telemetry;

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

    let (marketplace, notification_worker) = build_marketplace(
        &config.marketplace,
        Arc::new(SimulatedPaymentGateway::default()),
        Arc::new(StaticIdentityDirectory::default()),
        Arc::new(LoggingNotificationSink),
    );
    tokio::spawn(notification_worker.run());

    let app = with_marketplace_routes(&marketplace, config.marketplace.callback_secret.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        currency = %config.marketplace.currency,
        callback_secret = config.marketplace.callback_secret.is_some(),
        "tutorhub marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
