use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryProfileRepository, InMemorySessionStore, LoggingNotificationSink};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use portal::config::AppConfig;
use portal::error::AppError;
use portal::telemetry;
use portal::workflows::onboarding::{OnboardingService, PortalState, SectionRegistry};

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

    let repository = Arc::new(InMemoryProfileRepository::default());
    let notifications = Arc::new(LoggingNotificationSink::default());
    let service = Arc::new(OnboardingService::new(
        SectionRegistry::standard(),
        repository,
        notifications,
        config.registration.intake_policy(),
    ));

    if let Some(seed) = config.admin.as_ref() {
        service.seed_admin(&seed.username, &seed.password)?;
        info!(username = %seed.username, "administrative account ready");
    }

    let portal_state = PortalState {
        service,
        sessions: Arc::new(InMemorySessionStore::default()),
    };

    let app = with_portal_routes(portal_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "application portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
