//! End-to-end tool tests against a mock upstream: gate, pipeline,
//! envelope, and registry behavior.

use config::MemosConfig;
use mm_core::{CallContext, CallerId};
use serde_json::json;
use std::sync::Arc;
use testing::{TEST_TOKEN, archived_memo, memo, memo_at, mount_list_page, page, test_config};
use tools::envelope::ResultEnvelope;
use tools::{ToolRegistry, build_registry};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ctx() -> CallContext {
    CallContext::new(None)
}

fn ctx_for(caller: &str) -> CallContext {
    CallContext::new(CallerId::new(caller.to_string()))
}

fn registry_with(config: MemosConfig) -> ToolRegistry {
    build_registry(Arc::new(config)).expect("registry should build")
}

async fn registry_for(server: &MockServer) -> ToolRegistry {
    registry_with(test_config(server))
}

fn memo_names(envelope: &ResultEnvelope) -> Vec<String> {
    envelope.result["memos"]
        .as_array()
        .expect("memos array")
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_uses_configured_default_visibility() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memos"))
        .and(body_json(json!({ "content": "today done", "visibility": "PROTECTED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(memo("memos/10", "today done")))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server).await;
    let env = registry
        .call("memos_create", &ctx(), json!({ "content": "today done" }))
        .await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert_eq!(env.result["memo"]["name"], "memos/10");
    assert!(env.errors.is_empty());
}

#[tokio::test]
async fn test_search_keyword_window_newest_first() {
    let server = MockServer::start().await;
    let memos = vec![
        memo_at("memos/jan05", "release prep", "2026-01-05T09:00:00Z"),
        memo_at("memos/jan10", "Release notes", "2026-01-10T09:00:00Z"),
        memo_at("memos/jan12", "groceries", "2026-01-12T09:00:00Z"),
        memo_at("memos/jan15", "RELEASE checklist", "2026-01-15T09:00:00Z"),
        memo_at("memos/jan20", "post-release review", "2026-01-20T09:00:00Z"),
        memo_at("memos/jan25", "release branch cut", "2026-01-25T09:00:00Z"),
        memo_at("memos/jan28", "next release planning", "2026-01-28T09:00:00Z"),
    ];
    mount_list_page(&server, None, page(memos, None)).await;

    let mut config = test_config(&server);
    config.search.max_count = 5;
    let registry = registry_with(config);

    let env = registry
        .call(
            "memos_search",
            &ctx(),
            json!({
                "query": "release",
                "start_date": "2026-01-01",
                "end_date": "2026-01-31",
            }),
        )
        .await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert_eq!(env.result["query_mode"], "keyword");
    assert_eq!(env.result["search_max_count"], 5);
    assert_eq!(env.result["matched_count"], 5);
    assert_eq!(
        memo_names(&env),
        vec!["memos/jan28", "memos/jan25", "memos/jan20", "memos/jan15", "memos/jan10"]
    );
}

#[tokio::test]
async fn test_search_stops_paging_at_max_count() {
    let server = MockServer::start().await;
    mount_list_page(
        &server,
        None,
        page(
            vec![
                memo_at("memos/1", "alpha", "2026-01-10T09:00:00Z"),
                memo_at("memos/2", "beta", "2026-01-11T09:00:00Z"),
            ],
            Some("t2"),
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/memos"))
        .and(query_param("pageToken", "t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.search.max_count = 1;
    let registry = registry_with(config);

    let env = registry.call("memos_search", &ctx(), json!({})).await;
    assert!(env.ok);
    assert_eq!(env.result["matched_count"], 1);
    let audit = env.audit.as_deref().unwrap();
    assert!(audit.contains("stop_reason=reach_search_max_count"));
    server.verify().await;
}

#[tokio::test]
async fn test_archive_listing_and_search_are_disjoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/memos"))
        .and(query_param("state", "ARCHIVED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                archived_memo("memos/a1", "old release"),
                archived_memo("memos/a2", "older release"),
            ],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/memos"))
        .and(query_param("state", "NORMAL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![memo("memos/n1", "current release")],
            None,
        )))
        .mount(&server)
        .await;

    let registry = registry_for(&server).await;

    let archived = registry
        .call(
            "memos_archive",
            &ctx(),
            json!({ "action": "list_archived", "query": "release" }),
        )
        .await;
    assert!(archived.ok, "errors: {:?}", archived.errors);
    let archived_names = memo_names(&archived);
    assert_eq!(archived_names, vec!["memos/a1", "memos/a2"]);
    for m in archived.result["memos"].as_array().unwrap() {
        assert_eq!(m["archived"], true);
    }

    let normal = registry
        .call("memos_search", &ctx(), json!({ "query": "release" }))
        .await;
    assert!(normal.ok);
    let normal_names = memo_names(&normal);
    assert_eq!(normal_names, vec!["memos/n1"]);
    assert!(archived_names.iter().all(|n| !normal_names.contains(n)));
}

#[tokio::test]
async fn test_archive_set_defaults_to_true() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/memos/7"))
        .and(query_param("updateMask", "state"))
        .and(body_json(json!({ "state": "ARCHIVED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(archived_memo("memos/7", "x")))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server).await;
    let env = registry
        .call(
            "memos_archive",
            &ctx(),
            json!({ "action": "set", "name": "memos/7" }),
        )
        .await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert_eq!(env.result["memo"]["archived"], true);
}

#[tokio::test]
async fn test_delete_tool_absent_unless_enabled() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    assert!(!registry.contains("memos_delete"));
    let env = registry
        .call("memos_delete", &ctx(), json!({ "name": "memos/7" }))
        .await;
    assert!(!env.ok);
    assert!(env.errors[0].contains("unknown tool"));

    Mock::given(method("DELETE"))
        .and(path("/api/v1/memos/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let mut config = test_config(&server);
    config.tools.enable_delete = true;
    let registry = registry_with(config);
    assert!(registry.contains("memos_delete"));
    let env = registry
        .call("memos_delete", &ctx(), json!({ "name": "memos/7" }))
        .await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert_eq!(env.result["deleted"], "memos/7");
}

#[tokio::test]
async fn test_update_pinned_only_patch() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/memos/999"))
        .and(query_param("updateMask", "pinned"))
        .and(body_json(json!({ "pinned": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(memo("memos/999", "kept")))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server).await;
    let env = registry
        .call(
            "memos_update",
            &ctx(),
            json!({ "name": "memos/999", "pinned": true }),
        )
        .await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert_eq!(env.result["memo"]["name"], "memos/999");
}

#[tokio::test]
async fn test_update_without_fields_fails_before_http() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    let env = registry
        .call("memos_update", &ctx(), json!({ "name": "memos/999" }))
        .await;
    assert!(!env.ok);
    assert_eq!(
        env.errors,
        vec!["at least one of content/visibility/pinned is required"]
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_memo_name_fails_before_http() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    for params in [
        json!({ "name": "42", "pinned": true }),
        json!({ "name": "notes/42", "pinned": true }),
    ] {
        let env = registry.call("memos_update", &ctx(), params).await;
        assert!(!env.ok);
    }
    let env = registry
        .call("memos_delete", &ctx(), json!({ "name": "42" }))
        .await;
    // delete tool is absent by default; either way no request went out
    assert!(!env.ok);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gate_denies_with_generic_message() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.auth.enabled = true;
    config.auth.allowlist = vec!["100".to_string()];
    let registry = registry_with(config);

    for context in [ctx_for("999"), ctx()] {
        let env = registry.call("memos_search", &context, json!({})).await;
        assert!(!env.ok);
        assert_eq!(env.errors, vec!["not authorized"]);
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gate_allows_listed_caller() {
    let server = MockServer::start().await;
    mount_list_page(&server, None, page(vec![memo("memos/1", "a")], None)).await;

    let mut config = test_config(&server);
    config.auth.enabled = true;
    config.auth.allowlist = vec!["100".to_string()];
    let registry = registry_with(config);

    let env = registry.call("memos_search", &ctx_for("100"), json!({})).await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert_eq!(env.result["matched_count"], 1);
}

#[tokio::test]
async fn test_token_never_leaks_into_audit_or_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": format!("token {TEST_TOKEN} rejected")
        })))
        .mount(&server)
        .await;

    let registry = registry_for(&server).await;
    let env = registry
        .call("memos_create", &ctx_for("caller-77"), json!({ "content": "x" }))
        .await;
    assert!(!env.ok);
    let all_text = format!("{:?} {:?}", env.errors, env.audit);
    assert!(!all_text.contains(TEST_TOKEN));
    assert!(!all_text.contains("caller-77"));
    assert!(env.errors[0].contains("***"));
}

#[tokio::test]
async fn test_audit_disabled_is_absent() {
    let server = MockServer::start().await;
    mount_list_page(&server, None, page(vec![], None)).await;

    let mut config = test_config(&server);
    config.audit.enabled = false;
    let registry = registry_with(config);

    let env = registry.call("memos_search", &ctx(), json!({})).await;
    assert!(env.ok);
    assert!(env.audit.is_none());
}

#[tokio::test]
async fn test_audit_truncated_over_limit() {
    let server = MockServer::start().await;
    mount_list_page(&server, None, page(vec![], None)).await;

    let mut config = test_config(&server);
    config.audit.max_chars = 100;
    let registry = registry_with(config);

    let env = registry.call("memos_search", &ctx(), json!({})).await;
    assert!(env.ok);
    let audit = env.audit.unwrap();
    assert!(audit.ends_with("..."));
    assert_eq!(audit.chars().count(), 103);
}

#[tokio::test]
async fn test_date_range_validation_before_http() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    let env = registry
        .call(
            "memos_search",
            &ctx(),
            json!({ "start_date": "2026-02-01", "end_date": "2026-01-01" }),
        )
        .await;
    assert!(!env.ok);
    assert!(env.errors[0].contains("start_date must be earlier than or equal to end_date"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_date_format_is_reported() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    let env = registry
        .call("memos_search", &ctx(), json!({ "start_date": "01/15/2026" }))
        .await;
    assert!(!env.ok);
    assert!(env.errors[0].contains("invalid date format: 01/15/2026"));
}

#[tokio::test]
async fn test_unknown_date_field_falls_back() {
    let server = MockServer::start().await;
    mount_list_page(&server, None, page(vec![memo("memos/1", "a")], None)).await;

    let registry = registry_for(&server).await;
    let env = registry
        .call("memos_search", &ctx(), json!({ "date_field": "whenever" }))
        .await;
    assert!(env.ok, "errors: {:?}", env.errors);
    assert!(env.audit.unwrap().contains("date_field=display_time"));
}

#[tokio::test]
async fn test_unknown_visibility_label_is_rejected() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    let env = registry
        .call(
            "memos_create",
            &ctx(),
            json!({ "content": "x", "visibility": "internal" }),
        )
        .await;
    assert!(!env.ok);
    assert!(env.errors[0].contains("unknown visibility label"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_lists_registered_tools() {
    let server = MockServer::start().await;
    let registry = registry_for(&server).await;
    let mut names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["memos_archive", "memos_create", "memos_search", "memos_update"]
    );
    let definitions = registry.list_tools();
    for def in &definitions {
        assert_eq!(def.input_schema["type"], "object");
        assert!(def.input_schema["properties"].is_object());
    }
}

#[tokio::test]
async fn test_upstream_failure_becomes_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = registry_for(&server).await;
    let env = registry.call("memos_search", &ctx(), json!({})).await;
    assert!(!env.ok);
    assert!(!env.errors.is_empty());
    assert!(!env.trace_id.is_empty());
    assert!(env.result.is_null());
}

#[tokio::test]
async fn test_trace_ids_are_distinct_per_call() {
    let server = MockServer::start().await;
    mount_list_page(&server, None, page(vec![], None)).await;

    let registry = registry_for(&server).await;
    let a = registry.call("memos_search", &ctx(), json!({})).await;
    let b = registry.call("memos_search", &ctx(), json!({})).await;
    assert_eq!(a.trace_id.len(), 10);
    assert_ne!(a.trace_id, b.trace_id);
}
