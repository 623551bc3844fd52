use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use lead_audit::audits::{audit_router, AuditService, AuditStore, Notifier, ReportRenderer};
use lead_audit::config::AdminConfig;
use serde_json::json;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::error;

pub(crate) fn with_audit_routes<S, N, R>(
    service: Arc<AuditService<S, N, R>>,
    admin: AdminConfig,
) -> axum::Router
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    audit_router(service, admin)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/pdfs/:file_name", axum::routing::get(report_download))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Serves a rendered report from the output directory. Only bare `.pdf` file names resolve.
pub(crate) async fn report_download(
    Extension(state): Extension<AppState>,
    Path(file_name): Path<String>,
) -> Response {
    if !is_report_file_name(&file_name) {
        return not_found(&file_name);
    }

    let path = state.report_dir.join(&file_name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{file_name}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) if err.kind() == ErrorKind::NotFound => not_found(&file_name),
        Err(err) => {
            error!(error = %err, path = %path.display(), "failed to read report");
            let payload = json!({ "error": "unable to read report" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn is_report_file_name(file_name: &str) -> bool {
    !file_name.is_empty()
        && !file_name.starts_with('.')
        && !file_name.contains(['/', '\\'])
        && !file_name.contains("..")
        && file_name.ends_with(".pdf")
}

fn not_found(file_name: &str) -> Response {
    let payload = json!({ "error": format!("report {file_name} not found") });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
