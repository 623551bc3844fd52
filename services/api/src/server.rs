use crate::cli::ServeArgs;
use crate::infra::{email_templates, AppState, ConfiguredNotifier, InMemoryAuditStore};
use crate::routes::with_audit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_audit::audits::{AuditService, PdfReportRenderer};
use lead_audit::config::AppConfig;
use lead_audit::error::AppError;
use lead_audit::telemetry;
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

    let renderer = PdfReportRenderer::from_config(&config.reports);
    tokio::fs::create_dir_all(renderer.output_dir()).await?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        report_dir: Arc::new(renderer.output_dir().to_path_buf()),
    };

    let notifier = ConfiguredNotifier::from_config(&config.notifications);
    let templates = email_templates(&config);
    info!(
        delivery = notifier.describe(),
        admin = templates.admin_email(),
        "notification backend selected"
    );

    let audit_service = Arc::new(AuditService::new(
        Arc::new(InMemoryAuditStore::default()),
        Arc::new(notifier),
        Arc::new(renderer),
        config.reports.clone(),
        templates,
    ));

    let app = with_audit_routes(audit_service, config.admin.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        reports = %config.reports.output_dir.display(),
        "lead audit service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
