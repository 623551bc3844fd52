use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{AuditId, AuditRecord, AuditSubmission};
use super::notifications::Notifier;
use super::report::ReportRenderer;
use super::repository::{AuditStore, Pagination};
use super::service::{AuditService, AuditServiceError};
use crate::config::AdminConfig;

/// Shared router state: the service plus the admin bearer token.
pub struct AuditApi<S, N, R> {
    service: Arc<AuditService<S, N, R>>,
    admin: Arc<AdminConfig>,
}

impl<S, N, R> Clone for AuditApi<S, N, R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            admin: Arc::clone(&self.admin),
        }
    }
}

#[cfg(test)]
impl<S, N, R> AuditApi<S, N, R> {
    pub(crate) fn for_tests(service: Arc<AuditService<S, N, R>>) -> Self {
        Self {
            service,
            admin: Arc::new(AdminConfig::default()),
        }
    }
}

/// Router builder exposing the public audit endpoints and the token-guarded admin surface.
pub fn audit_router<S, N, R>(service: Arc<AuditService<S, N, R>>, admin: AdminConfig) -> Router
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    let state = AuditApi {
        service,
        admin: Arc::new(admin),
    };

    Router::new()
        .route("/api/audits", post(submit_handler::<S, N, R>))
        .route("/api/audits/verify-code", post(verify_code_handler::<S, N, R>))
        .route("/api/audits/update", put(revise_handler::<S, N, R>))
        .route("/api/audits/email/:email", get(by_email_handler::<S, N, R>))
        .route("/api/audits/:audit_id", get(audit_handler::<S, N, R>))
        .route(
            "/api/audits/:audit_id/report",
            post(generate_report_handler::<S, N, R>),
        )
        .route("/api/admin/audits", get(dashboard_handler::<S, N, R>))
        .route("/api/admin/audits/export", get(export_handler::<S, N, R>))
        .route("/api/admin/stats", get(stats_handler::<S, N, R>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub update_code: String,
    pub email: String,
}

/// Revised answers plus the update code that unlocks them; `email` doubles as the credential.
#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub update_code: String,
    #[serde(flatten)]
    pub submission: AuditSubmission,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageQuery {
    fn window(&self) -> (usize, usize) {
        (
            self.limit.unwrap_or(Pagination::DEFAULT_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

pub(crate) async fn submit_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    axum::Json(submission): axum::Json<AuditSubmission>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    match api.service.submit(submission) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn audit_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    Path(audit_id): Path<u64>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    match api.service.get(AuditId(audit_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn by_email_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    Path(email): Path<String>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    match api.service.by_email(&email) {
        Ok(records) => {
            let audits: Vec<_> = records.iter().map(AuditRecord::view).collect();
            (StatusCode::OK, axum::Json(audits)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn generate_report_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    Path(audit_id): Path<u64>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    match api.service.generate_report(AuditId(audit_id)).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn verify_code_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    axum::Json(request): axum::Json<VerifyCodeRequest>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    match api
        .service
        .verify_update_code(&request.update_code, &request.email)
    {
        Ok(record) => {
            let payload = json!({ "audit": record.view() });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn revise_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    axum::Json(request): axum::Json<RevisionRequest>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    let email = request.submission.email.clone();
    match api
        .service
        .revise(&request.update_code, &email, request.submission)
        .await
    {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    if let Err(rejection) = authorize(&api.admin, &headers) {
        return rejection;
    }
    let (limit, offset) = page.window();
    match api.service.dashboard(limit, offset) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    headers: HeaderMap,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    if let Err(rejection) = authorize(&api.admin, &headers) {
        return rejection;
    }
    match api.service.stats() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<S, N, R>(
    State(api): State<AuditApi<S, N, R>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Response
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    if let Err(rejection) = authorize(&api.admin, &headers) {
        return rejection;
    }
    let (limit, offset) = page.window();
    let records = match api.service.recent(limit, offset) {
        Ok(records) => records,
        Err(err) => return error_response(err),
    };

    let report_config = api.service.report_config();
    let rows = records.iter().map(|record| ExportRow {
        audit_id: record.id.0,
        business_name: &record.submission.business_name,
        contact_name: &record.submission.contact_name,
        email: &record.submission.email,
        industry: record
            .submission
            .industry
            .map(|industry| industry.label())
            .unwrap_or(""),
        website_score: record.scores.website_score,
        social_score: record.scores.social_score,
        marketing_score: record.scores.marketing_score,
        automation_score: record.scores.automation_score,
        overall_score: record.scores.overall_score,
        report_url: record
            .report
            .as_ref()
            .map(|report| report_config.report_url(&report.file_name))
            .unwrap_or_default(),
        created_at: record.created_at.to_rfc3339(),
    });

    match write_csv(rows) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"audits.csv\"".to_string(),
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode audit export");
            let payload = json!({ "error": "unable to export audits" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    audit_id: u64,
    business_name: &'a str,
    contact_name: &'a str,
    email: &'a str,
    industry: &'static str,
    website_score: u8,
    social_score: u8,
    marketing_score: u8,
    automation_score: u8,
    overall_score: u8,
    report_url: String,
    created_at: String,
}

fn write_csv<'a>(rows: impl Iterator<Item = ExportRow<'a>>) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// `Authorization: Bearer <ADMIN_API_TOKEN>`; the admin surface is closed when no token is set.
fn authorize(admin: &AdminConfig, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = admin.api_token.as_deref() else {
        let payload = json!({ "error": "admin access is not configured" });
        return Err((StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => {
            let payload = json!({ "error": "unauthorized" });
            Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response())
        }
    }
}

fn error_response(err: AuditServiceError) -> Response {
    let status = match &err {
        AuditServiceError::Submission(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuditServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        AuditServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuditServiceError::Store(_)
        | AuditServiceError::UpdateCodeExhausted
        | AuditServiceError::Report(_)
        | AuditServiceError::Join(_) => {
            error!(error = %err, "audit request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
