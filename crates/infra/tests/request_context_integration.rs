//! Integration tests for request decoration and response classification
//!
//! **Coverage:**
//! - Session headers on every request, explicit caller headers winning
//! - Impersonation overlay, its bypass and its lazy lapse
//! - Envelope unwrapping, business errors and list normalization

#[path = "support.rs"]
mod support;

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde_json::{json, Value};
use steward_core::{ApiRequest, Notice, PageDefaults};
use steward_domain::{DomainContext, DomainSource, ErrorCategory, StewardError};
use support::Harness;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, Request, ResponseTemplate};

fn header_absent(name: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| !request.headers.contains_key(name)
}

#[tokio::test]
async fn test_base_session_headers_are_attached() {
    let harness = Harness::signed_in().await;
    harness.store.set_selected_project_id(Some("p-7".into()));

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(header("Authorization", "Bearer t0"))
        .and(header("X-Domain-Type", "tenant"))
        .and(header("X-Domain-Key", "acme"))
        .and(header("X-Project-ID", "p-7"))
        .and(header("X-Client-Type", "web"))
        .and(header_exists("X-Trace-ID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"count": 2}})))
        .expect(1)
        .mount(&harness.server)
        .await;

    let body: Value = harness.client.get("/members").await.unwrap();
    assert_eq!(body, json!({"count": 2}));
}

#[tokio::test]
async fn test_explicit_domain_headers_win() {
    let harness = Harness::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/platform/tenants"))
        .and(header("X-Domain-Type", "platform"))
        .and(header("X-Domain-Key", "platform"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&harness.server)
        .await;

    let request = ApiRequest::get("/platform/tenants")
        .in_domain(&DomainContext::platform(DomainSource::Explicit))
        .unwrap();
    harness.client.send(request).await.unwrap();
}

#[tokio::test]
async fn test_public_endpoints_carry_no_credential_or_domain() {
    let harness = Harness::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/captcha"))
        .and(header_absent("authorization"))
        .and(header_absent("x-domain-key"))
        .and(header("X-Client-Type", "web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"image": "..."}})))
        .expect(1)
        .mount(&harness.server)
        .await;

    harness.client.get::<Value>("/auth/captcha").await.unwrap();
}

#[tokio::test]
async fn test_impersonation_overlays_token_and_domain() {
    let harness = Harness::signed_in().await;
    harness.store.set_selected_project_id(Some("p-7".into()));
    harness.impersonate("globex", ChronoDuration::minutes(30));

    Mock::given(method("GET"))
        .and(path("/tenant/settings"))
        .and(header("Authorization", "Bearer imp-globex"))
        .and(header("X-Domain-Type", "tenant"))
        .and(header("X-Domain-Key", "globex"))
        .and(header_absent("x-project-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer t0"))
        .and(header("X-Domain-Key", "acme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "u1", "username": "root"}})),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    harness.client.get::<Value>("/tenant/settings").await.unwrap();
    harness.client.send(ApiRequest::get("/auth/me").skip_impersonation()).await.unwrap();
}

#[tokio::test]
async fn test_lapsed_impersonation_falls_back_and_notifies_once() {
    let mut harness = Harness::signed_in().await;
    harness.impersonate("globex", ChronoDuration::milliseconds(50));
    tokio::time::sleep(Duration::from_millis(120)).await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer t0"))
        .and(header("X-Domain-Key", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .expect(2)
        .mount(&harness.server)
        .await;

    harness.client.get::<Value>("/users").await.unwrap();
    harness.client.get::<Value>("/roles").await.unwrap();

    assert!(harness.store.get_impersonation_session().is_none());
    assert_eq!(
        harness.drain_notices(),
        vec![Notice::ImpersonationExpired { target_tenant_id: "globex".into() }]
    );
}

#[tokio::test]
async fn test_business_error_in_success_response_is_surfaced() {
    let mut harness = Harness::signed_in().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "error": {"code": "CONFLICT", "message": "username already taken"}
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let err = harness
        .client
        .post::<_, Value>("/users", &json!({"username": "root"}))
        .await
        .unwrap_err();

    assert!(matches!(err, StewardError::Business { status: 409, ref code, .. } if code == "CONFLICT"));
    // Business errors never end the session
    assert!(harness.store.is_authenticated());
    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        Notice::RequestFailed { category: ErrorCategory::Business, .. }
    ));
}

#[tokio::test]
async fn test_skip_error_handling_stays_quiet() {
    let mut harness = Harness::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&harness.server)
        .await;

    let err = harness
        .client
        .send(ApiRequest::get("/reports").skip_error_handling())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(harness.drain_notices().is_empty());
}

#[tokio::test]
async fn test_skip_unwrap_returns_full_body() {
    let harness = Harness::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [1, 2], "error": null})),
        )
        .mount(&harness.server)
        .await;

    let response = harness.client.send(ApiRequest::get("/export").skip_unwrap()).await.unwrap();
    assert_eq!(response.data, json!({"data": [1, 2], "error": null}));
}

#[tokio::test]
async fn test_list_endpoint_is_normalized() {
    let harness = Harness::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"users": [{"id": "10"}], "page": 3, "pageSize": 5, "total": 12}
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let list = harness
        .client
        .get_list(ApiRequest::get("/users").query("page", "3"), &["users"], PageDefaults::default())
        .await
        .unwrap();

    assert_eq!(list.list, vec![json!({"id": "10"})]);
    assert_eq!((list.page, list.page_size, list.total), (3, 5, 12));
}
