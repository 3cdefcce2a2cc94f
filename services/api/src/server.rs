use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAccessLedger, InMemoryApplicantRepository, InMemorySessionStore,
    LoggingMailer,
};
use crate::routes::operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use formgate::config::AppConfig;
use formgate::error::AppError;
use formgate::telemetry;
use formgate::workflows::intake::{intake_router, IntakePortalState, IntakeService};
use formgate::workflows::payments::{
    payment_router, AccessDecisionEngine, PaymentPortalState, PaymentService, PaystackGateway,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let gateway = Arc::new(PaystackGateway::new(&config.payments)?);
    let ledger = Arc::new(InMemoryAccessLedger::default());
    let sessions = Arc::new(InMemorySessionStore::default());

    let payment_service = Arc::new(PaymentService::new(
        gateway,
        ledger.clone(),
        &config.payments,
    ));
    let intake_service = Arc::new(IntakeService::new(
        Arc::new(InMemoryApplicantRepository::default()),
        Arc::new(LoggingMailer),
        AccessDecisionEngine::new(ledger),
    ));

    let app = payment_router(PaymentPortalState {
        service: payment_service,
        sessions: sessions.clone(),
    })
    .merge(intake_router(IntakePortalState {
        service: intake_service,
        sessions,
    }))
    .merge(operational_routes())
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "application intake portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
