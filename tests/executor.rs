mod common;

use apiwatch::db::MemoryStore;
use apiwatch::db::enums::{AssertionType, BodyType, HttpMethod};
use apiwatch::db::models::{KeyValue, STATUS_NO_RESPONSE};
use apiwatch::probe::ProbeExecutor;
use common::{chained, details};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(store: &Arc<MemoryStore>) -> ProbeExecutor {
    ProbeExecutor::new(store.clone(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn successful_probe_records_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store
        .upsert_monitor(details(1, "health", format!("{}/health", server.uri())))
        .await;

    let result = executor(&store).execute(1).await;
    assert!(result.success);
    assert_eq!(result.status_code, 200);
    assert_eq!(result.log_response, "ok");
    assert!(result.log_error.is_empty());
}

#[tokio::test]
async fn non_success_status_fails_but_keeps_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.upsert_monitor(details(1, "api", server.uri())).await;

    let result = executor(&store).execute(1).await;
    assert!(!result.success);
    assert_eq!(result.status_code, 503);
    assert_eq!(result.log_response, "maintenance");
}

#[tokio::test]
async fn transport_errors_leave_status_unset() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_monitor(details(1, "closed port", "http://127.0.0.1:9/".to_string()))
        .await;

    let result = executor(&store).execute(1).await;
    assert!(!result.success);
    assert_eq!(result.status_code, STATUS_NO_RESPONSE);
    assert!(result.log_response.is_empty());
    assert!(!result.log_error.is_empty());
}

#[tokio::test]
async fn unknown_monitor_is_reported_in_the_result() {
    let store = Arc::new(MemoryStore::new());
    let result = executor(&store).execute(42).await;
    assert!(!result.success);
    assert_eq!(result.log_error, "Monitor not found: 42");
}

#[tokio::test]
async fn invalid_utf8_in_the_body_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok\xff!".to_vec()))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.upsert_monitor(details(1, "bytes", server.uri())).await;

    let result = executor(&store).execute(1).await;
    assert!(result.success);
    assert_eq!(result.log_response, "ok!");
}

#[tokio::test]
async fn sends_query_params_headers_and_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(query_param("page", "2"))
        .and(header("x-team", "core"))
        .and(body_string("name=alice&role=admin"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let mut monitor = details(1, "create user", format!("{}/users", server.uri()));
    monitor.monitor.method = HttpMethod::Post;
    monitor.monitor.body_type = BodyType::Form;
    monitor.query_params.push(KeyValue::new("page", "2"));
    monitor.headers.push(KeyValue::new("X-Team", "core"));
    monitor.body_form.push(KeyValue::new("name", "alice"));
    monitor.body_form.push(KeyValue::new("role", "admin"));
    store.upsert_monitor(monitor).await;

    let result = executor(&store).execute(1).await;
    assert!(result.success, "{}", result.log_error);
    assert_eq!(result.status_code, 201);
}

#[tokio::test]
async fn previous_step_response_feeds_templates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"auth": {"token": "abc"}, "ids": [7, 8]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer abc"))
        .and(query_param("id", "8"))
        .and(body_string(r#"{"owner":"abc"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"saved": true})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let mut login = details(1, "login", format!("{}/login", server.uri()));
    login.monitor.method = HttpMethod::Post;
    store.upsert_monitor(login).await;

    let mut profile = chained(2, "profile", format!("{}/profile", server.uri()), 1);
    profile.monitor.method = HttpMethod::Put;
    profile.monitor.body_type = BodyType::Raw;
    profile.raw_body = Some(r#"{"owner":"{{auth.token}}"}"#.to_string());
    profile
        .headers
        .push(KeyValue::new("Authorization", "Bearer {{ auth.token }}"));
    profile.query_params.push(KeyValue::new("id", "{{ids[1]}}"));
    store.upsert_monitor(profile).await;

    let result = executor(&store).execute(2).await;
    assert!(result.success, "{}", result.log_error);
    assert_eq!(result.log_response, r#"{"saved":true}"#);
}

#[tokio::test]
async fn failed_previous_step_is_inherited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("login down"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store
        .upsert_monitor(details(1, "login", format!("{}/login", server.uri())))
        .await;
    store
        .upsert_monitor(chained(2, "dashboard", format!("{}/dashboard", server.uri()), 1))
        .await;

    let result = executor(&store).execute(2).await;
    assert!(!result.success);
    assert_eq!(result.status_code, 500);
    assert_eq!(result.log_response, "login down");
    assert_eq!(result.log_error, "error on previous step: `login`\n``");
}

#[tokio::test]
async fn missing_template_path_keeps_the_previous_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session": "s1"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store
        .upsert_monitor(details(1, "login", format!("{}/login", server.uri())))
        .await;
    let mut next = chained(2, "next", format!("{}/next", server.uri()), 1);
    next.headers.push(KeyValue::new("Authorization", "{{token}}"));
    store.upsert_monitor(next).await;

    let result = executor(&store).execute(2).await;
    assert!(!result.success);
    assert_eq!(result.status_code, 200);
    assert_eq!(result.log_response, r#"{"session":"s1"}"#);
    assert_eq!(
        result.log_error,
        "error while preparing monitor params: `path token not found in previous step response`"
    );
}

#[tokio::test]
async fn non_json_previous_step_leaves_placeholders_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .and(header("x-literal", "{{token}}"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store
        .upsert_monitor(details(1, "first", format!("{}/first", server.uri())))
        .await;
    let mut second = chained(2, "second", format!("{}/second", server.uri()), 1);
    second.headers.push(KeyValue::new("X-Literal", "{{token}}"));
    store.upsert_monitor(second).await;

    let result = executor(&store).execute(2).await;
    assert!(result.success, "{}", result.log_error);
}

#[tokio::test]
async fn chain_deeper_than_the_limit_fails_the_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.upsert_monitor(details(1, "step-1", server.uri())).await;
    for id in 2..=11 {
        store
            .upsert_monitor(chained(id, &format!("step-{id}"), server.uri(), id - 1))
            .await;
    }

    let result = executor(&store).execute(11).await;
    assert!(!result.success);
    assert_eq!(result.monitor_id, 11);
    assert!(
        result
            .log_error
            .contains("depth limit of previous step reached (maximum: 10)"),
        "{}",
        result.log_error
    );
}

#[tokio::test]
async fn chain_of_exactly_ten_is_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(10)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.upsert_monitor(details(1, "step-1", server.uri())).await;
    for id in 2..=10 {
        store
            .upsert_monitor(chained(id, &format!("step-{id}"), server.uri(), id - 1))
            .await;
    }

    let result = executor(&store).execute(10).await;
    assert!(result.success, "{}", result.log_error);
}

#[tokio::test]
async fn cyclic_steps_are_aborted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.upsert_monitor(chained(1, "A", server.uri(), 2)).await;
    store.upsert_monitor(chained(2, "B", server.uri(), 1)).await;

    let result = executor(&store).execute(1).await;
    assert!(!result.success);
    assert_eq!(result.status_code, STATUS_NO_RESPONSE);
    assert_eq!(
        result.log_error,
        "error on previous step: `B`\n`request aborted due to recursion of monitor steps`"
    );
}

#[tokio::test]
async fn assertions_apply_only_to_the_root_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/step"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": 1})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "value"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let mut step = details(1, "step", format!("{}/step", server.uri()));
    step.monitor.assertion_type = AssertionType::Json;
    step.monitor.assertion_value = r#"{"a": 2}"#.to_string();
    store.upsert_monitor(step).await;

    let mut root = chained(2, "root", format!("{}/root", server.uri()), 1);
    root.monitor.assertion_type = AssertionType::Json;
    root.monitor.assertion_value = r#"{"key": "value"}"#.to_string();
    store.upsert_monitor(root.clone()).await;

    let passing = executor(&store).execute(2).await;
    assert!(passing.success, "{}", passing.log_error);

    root.monitor.assertion_value = r#"{"key": "value2"}"#.to_string();
    store.upsert_monitor(root).await;

    let failing = executor(&store).execute(2).await;
    assert!(!failing.success);
    assert_eq!(failing.status_code, 200);
    assert_eq!(failing.log_response, r#"{"key":"value"}"#);
    assert_eq!(
        failing.log_error,
        "different value on `root['key']`, expected `value2` but found `value`"
    );
}
