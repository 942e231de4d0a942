use crate::cli::ServeArgs;
use crate::infra::{seed_portfolio, AppState, PortalServices};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tenant_portal::config::{AppConfig, AppEnvironment};
use tenant_portal::error::AppError;
use tenant_portal::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    if config.portal.identity_service_key.is_none() {
        warn!("APP_IDENTITY_SERVICE_KEY unset; invitations will fall back to self-service signup");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = PortalServices::in_memory(&config.portal);
    if config.environment == AppEnvironment::Development && !args.no_seed {
        let seeded = seed_portfolio(&services.directory)?;
        info!(
            building = %seeded.building.id,
            apartments = seeded.apartments.len(),
            "seeded sample portfolio"
        );
    }

    let app = with_portal_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tenant portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
