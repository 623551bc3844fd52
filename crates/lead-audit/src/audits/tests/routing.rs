use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::audits::router::{audit_handler, AuditApi};
use crate::audits::AuditService;

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn admin_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

async fn create_audit(router: &axum::Router) -> Value {
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/audits", &submission_json()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json_body(response).await
}

#[tokio::test]
async fn submit_route_returns_id_and_update_code() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);

    let body = create_audit(&router).await;
    assert_eq!(body["audit_id"], json!(1));
    let code = body["update_code"].as_str().expect("code is a string");
    assert_eq!(code.len(), 4);
}

#[tokio::test]
async fn submit_route_rejects_missing_business_name() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);
    let mut payload = submission_json();
    payload["business_name"] = json!("   ");

    let response = router
        .oneshot(json_request("POST", "/api/audits", &payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("business_name is required"));
}

#[tokio::test]
async fn submit_route_accepts_unselected_dropdowns() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);
    let mut payload = submission_json();
    payload["business_size"] = json!("small");
    payload["monthly_budget"] = json!("");

    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/audits", &payload))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;

    let mut revision = payload.clone();
    revision["update_code"] = created["update_code"].clone();
    revision["industry"] = json!("");
    let response = router
        .oneshot(json_request("PUT", "/api/audits/update", &revision))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn submit_route_reports_store_outage() {
    let service = AuditService::new(
        Arc::new(UnavailableStore),
        Arc::new(RecordingNotifier::default()),
        Arc::new(StubRenderer::default()),
        report_config(),
        templates(),
    );
    let router = router_with_service(service, None);

    let response = router
        .oneshot(json_request("POST", "/api/audits", &submission_json()))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn audit_handler_hides_the_update_code() {
    let (service, _, _, _) = build_service();
    let receipt = service.submit(submission()).expect("accepted");
    let api = AuditApi::for_tests(Arc::new(service));

    let response = audit_handler(State(api), Path(receipt.audit_id.0)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["business_name"], json!("Harbor Bakery"));
    assert_eq!(body["report_generated"], json!(false));
    assert!(body.get("update_code").is_none());
}

#[tokio::test]
async fn unknown_audit_is_not_found() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);

    let response = router
        .oneshot(
            Request::get("/api/audits/999")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_route_returns_scores_and_public_url() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);
    let created = create_audit(&router).await;

    let response = router
        .oneshot(
            Request::post(format!("/api/audits/{}/report", created["audit_id"]))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["scores"]["overall_score"], json!(50));
    assert_eq!(body["scores"]["automation_score"], json!(25));
    let url = body["report_url"].as_str().expect("url string");
    assert!(url.starts_with("https://audit.test/pdfs/audit-1-"));
    assert!(url.ends_with(".pdf"));
}

#[tokio::test]
async fn verify_code_route_uses_generic_rejection() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);
    let created = create_audit(&router).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/audits/verify-code",
            &json!({ "update_code": created["update_code"], "email": "other@example.com" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("invalid update code or email"));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/audits/verify-code",
            &json!({ "update_code": created["update_code"], "email": "sam@harborbakery.com" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["audit"]["id"], created["audit_id"]);
}

#[tokio::test]
async fn update_route_applies_revision() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);
    let created = create_audit(&router).await;

    let mut payload = submission_json();
    payload["update_code"] = created["update_code"].clone();
    payload["has_crm"] = json!(true);
    payload["has_automation"] = json!(true);

    let response = router
        .oneshot(json_request("PUT", "/api/audits/update", &payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["audit_id"], created["audit_id"]);
    assert_eq!(body["scores"]["automation_score"], json!(100));
    assert!(body.get("report_url").is_none());
}

#[tokio::test]
async fn email_route_lists_matching_audits() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);
    create_audit(&router).await;
    create_audit(&router).await;

    let response = router
        .oneshot(
            Request::get("/api/audits/email/sam@harborbakery.com")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn admin_routes_are_closed_without_configured_token() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, None);

    let response = router
        .oneshot(admin_request("/api/admin/stats", Some("anything")))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn admin_routes_reject_missing_or_wrong_tokens() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, Some(ADMIN_TOKEN));

    for token in [None, Some("guess")] {
        let response = router
            .clone()
            .oneshot(admin_request("/api/admin/audits", token))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn admin_dashboard_applies_default_paging() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, Some(ADMIN_TOKEN));
    create_audit(&router).await;
    create_audit(&router).await;

    let response = router
        .clone()
        .oneshot(admin_request("/api/admin/audits", Some(ADMIN_TOKEN)))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pagination"], json!({ "limit": 100, "offset": 0, "total": 2 }));
    assert_eq!(body["audits"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["stats"]["total"], json!(2));

    let response = router
        .oneshot(admin_request(
            "/api/admin/audits?limit=1&offset=1",
            Some(ADMIN_TOKEN),
        ))
        .await
        .expect("router responds");
    let body = read_json_body(response).await;
    assert_eq!(body["audits"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["audits"][0]["id"], json!(1));
}

#[tokio::test]
async fn admin_export_streams_csv() {
    let (service, _, _, _) = build_service();
    let router = router_with_service(service, Some(ADMIN_TOKEN));
    create_audit(&router).await;

    let response = router
        .oneshot(admin_request("/api/admin/audits/export", Some(ADMIN_TOKEN)))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/csv; charset=utf-8")
    );
    let body = read_text_body(response).await;
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some(
            "audit_id,business_name,contact_name,email,industry,website_score,social_score,\
             marketing_score,automation_score,overall_score,report_url,created_at"
        )
    );
    let row = lines.next().expect("one data row");
    assert!(row.starts_with("1,Harbor Bakery,Sam Ortiz,sam@harborbakery.com,Retail & E-commerce,"));
}
