use config::{MemosConfig, UpstreamConfig};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-token-abc123";

/// A memo body in the upstream wire shape, with sensible defaults for the
/// fields a test does not care about.
pub fn memo(name: &str, content: &str) -> Value {
    json!({
        "name": name,
        "content": content,
        "visibility": "PRIVATE",
        "tags": [],
        "pinned": false,
        "snippet": content,
        "creator": "users/1",
        "state": "NORMAL",
        "createTime": "2026-01-10T08:00:00Z",
        "updateTime": "2026-01-10T08:00:00Z",
        "displayTime": "2026-01-10T08:00:00Z"
    })
}

/// Like [`memo`] but with the display/create/update timestamps all set to
/// `time` (RFC 3339).
pub fn memo_at(name: &str, content: &str, time: &str) -> Value {
    let mut m = memo(name, content);
    m["createTime"] = json!(time);
    m["updateTime"] = json!(time);
    m["displayTime"] = json!(time);
    m
}

pub fn archived_memo(name: &str, content: &str) -> Value {
    let mut m = memo(name, content);
    m["state"] = json!("ARCHIVED");
    m
}

/// A list response body. `next` of `None` ends the walk.
pub fn page(memos: Vec<Value>, next: Option<&str>) -> Value {
    match next {
        Some(token) => json!({ "memos": memos, "nextPageToken": token }),
        None => json!({ "memos": memos }),
    }
}

/// Mounts a `GET /api/v1/memos` responder for the given page cursor
/// (`None` matches the first, cursor-less request).
pub async fn mount_list_page(server: &MockServer, cursor: Option<&str>, body: Value) {
    let mock = Mock::given(method("GET")).and(path("/api/v1/memos"));
    let mock = match cursor {
        Some(token) => mock.and(query_param("pageToken", token)),
        None => mock.and(query_param_is_missing("pageToken")),
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// An upstream configuration pointing at the mock server.
pub fn upstream_config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        base_url: server.uri(),
        token: TEST_TOKEN.to_string(),
        ..UpstreamConfig::default()
    }
}

/// A full configuration pointing at the mock server, with defaults
/// everywhere else.
pub fn test_config(server: &MockServer) -> MemosConfig {
    MemosConfig {
        upstream: upstream_config(server),
        ..MemosConfig::default()
    }
}
