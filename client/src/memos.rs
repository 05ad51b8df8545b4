use crate::pager::MemoPager;
use chrono::{DateTime, Utc};
use config::UpstreamConfig;
use errors::ClientError;
use mm_core::{Memo, MemoState, Visibility};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// One page of a list walk.
#[derive(Debug, Clone)]
pub struct MemoPage {
    pub memos: Vec<Memo>,
    pub next_page_token: Option<String>,
}

/// Parameters of a list walk. The archived state is pinned for the whole
/// walk; there is no combined archived+unarchived mode.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub state: MemoState,
    pub old_filter: Option<String>,
}

impl ListQuery {
    pub fn new(state: MemoState) -> Self {
        Self {
            state,
            old_filter: None,
        }
    }

    pub fn with_filter(state: MemoState, old_filter: Option<String>) -> Self {
        Self { state, old_filter }
    }
}

/// Partial update of a memo. The PATCH body carries exactly the fields set
/// here and the update mask names exactly those fields, never a superset.
#[derive(Debug, Clone, Default)]
pub struct MemoPatch {
    pub content: Option<String>,
    pub visibility: Option<Visibility>,
    pub pinned: Option<bool>,
}

impl MemoPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.visibility.is_none() && self.pinned.is_none()
    }

    pub fn mask(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.content.is_some() {
            fields.push("content");
        }
        if self.visibility.is_some() {
            fields.push("visibility");
        }
        if self.pinned.is_some() {
            fields.push("pinned");
        }
        fields
    }

    fn body(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(content) = &self.content {
            body.insert("content".to_string(), json!(content));
        }
        if let Some(visibility) = self.visibility {
            body.insert("visibility".to_string(), json!(visibility.as_api()));
        }
        if let Some(pinned) = self.pinned {
            body.insert("pinned".to_string(), json!(pinned));
        }
        Value::Object(body)
    }
}

/// Authenticated client for the upstream Memos REST API.
///
/// Holds the normalized base URL and the bearer credential; both are
/// checked at construction so that a missing credential is a
/// configuration error rather than a request-time failure.
pub struct MemosClient {
    client: Client,
    base_url: String,
    token: String,
    page_size: u32,
}

impl MemosClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&config.base_url);
        if base_url.is_empty() {
            return Err(ClientError::Config {
                message: "memos base_url is empty".to_string(),
            });
        }
        let token = config.token.trim().to_string();
        if token.is_empty() {
            return Err(ClientError::Config {
                message: "memos token is empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Unavailable {
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            token,
            page_size: config.page_size,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Starts a lazy, finite, non-restartable walk over list pages.
    /// Dropping the pager issues no further page requests.
    pub fn pager(&self, query: ListQuery) -> MemoPager<'_> {
        MemoPager::new(self, query)
    }

    /// Fetches one list page. The `oldFilter` query parameter name is what
    /// the upstream expects for the legacy filter expression.
    pub async fn list_page(
        &self,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> Result<MemoPage, ClientError> {
        let mut params: Vec<(&str, String)> = vec![
            ("pageSize", self.page_size.max(1).to_string()),
            ("state", query.state.as_api().to_string()),
            ("sort", "display_time".to_string()),
            ("direction", "DESC".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        if let Some(filter) = &query.old_filter {
            params.push(("oldFilter", filter.clone()));
        }

        let data = self.send(Method::GET, "/memos", &params, None).await?;
        let page: WireListResponse =
            serde_json::from_value(data).map_err(|e| ClientError::Unavailable {
                reason: format!("invalid list response: {e}"),
            })?;

        let memos = page
            .memos
            .into_iter()
            .map(WireMemo::into_memo)
            .collect::<Result<Vec<_>, _>>()?;
        let next_page_token = page.next_page_token.filter(|t| !t.is_empty());

        Ok(MemoPage {
            memos,
            next_page_token,
        })
    }

    pub async fn create(
        &self,
        content: &str,
        visibility: Visibility,
    ) -> Result<Memo, ClientError> {
        let body = json!({
            "content": content,
            "visibility": visibility.as_api(),
        });
        let data = self.send(Method::POST, "/memos", &[], Some(body)).await?;
        decode_memo(data)
    }

    /// PATCHes exactly the fields named in the patch; the field mask goes
    /// in the `updateMask` query parameter, not the body.
    pub async fn update(&self, name: &str, patch: &MemoPatch) -> Result<Memo, ClientError> {
        self.patch_fields(name, &patch.mask(), patch.body()).await
    }

    /// Archiving is a boolean-field update through the same PATCH path,
    /// mapped to the upstream `state` field.
    pub async fn set_archived(&self, name: &str, archived: bool) -> Result<Memo, ClientError> {
        let state = MemoState::from_archived(archived);
        self.patch_fields(name, &["state"], json!({ "state": state.as_api() }))
            .await
    }

    pub async fn delete(&self, name: &str) -> Result<(), ClientError> {
        let path = format!("/{name}");
        self.send(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }

    async fn patch_fields(
        &self,
        name: &str,
        mask: &[&str],
        body: Value,
    ) -> Result<Memo, ClientError> {
        let path = format!("/{name}");
        let params = [("updateMask", mask.join(","))];
        let data = self.send(Method::PATCH, &path, &params, Some(body)).await?;
        decode_memo(data)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Making Memos API request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json");
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Unavailable {
                    reason: format!("request timeout: {method} {path}"),
                }
            } else {
                ClientError::Unavailable {
                    reason: format!("network error: {method} {path}: {e}"),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(|e| ClientError::Unavailable {
                reason: format!("failed to read response body: {method} {path}: {e}"),
            })?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| ClientError::Unavailable {
                reason: format!("invalid json response on {method} {path}: {e}"),
            });
        }

        let body_text = response.text().await.unwrap_or_default();
        Err(map_error_status(status, path, &body_text))
    }
}

/// Trims the site root and appends the `/api/v1` segment exactly once.
pub fn normalize_base_url(url: &str) -> String {
    let cleaned = url.trim().trim_end_matches('/');
    if cleaned.is_empty() {
        return String::new();
    }
    if cleaned.ends_with("/api/v1") {
        cleaned.to_string()
    } else {
        format!("{cleaned}/api/v1")
    }
}

fn map_error_status(status: StatusCode, path: &str, body: &str) -> ClientError {
    // Prefer the upstream JSON `message` field when present.
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::UpstreamAuth {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => ClientError::NotFound {
            resource: path.trim_start_matches('/').to_string(),
        },
        s if s.is_client_error() => ClientError::UpstreamValidation {
            status: s.as_u16(),
            message,
        },
        s => ClientError::Unavailable {
            reason: format!("upstream status {} on {}: {}", s.as_u16(), path, message),
        },
    }
}

fn decode_memo(data: Value) -> Result<Memo, ClientError> {
    let wire: WireMemo = serde_json::from_value(data).map_err(|e| ClientError::Unavailable {
        reason: format!("invalid memo in response: {e}"),
    })?;
    wire.into_memo()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireListResponse {
    #[serde(default)]
    memos: Vec<WireMemo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMemo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    visibility: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    creator: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
    #[serde(default)]
    display_time: Option<String>,
}

impl WireMemo {
    fn into_memo(self) -> Result<Memo, ClientError> {
        let visibility = Visibility::from_api(&self.visibility).ok_or_else(|| {
            ClientError::UpstreamValidation {
                status: 200,
                message: format!("unknown visibility '{}' in upstream memo", self.visibility),
            }
        })?;

        Ok(Memo {
            name: self.name,
            content: self.content,
            visibility,
            tags: self.tags,
            pinned: self.pinned,
            archived: self.state == "ARCHIVED",
            snippet: self.snippet,
            creator: self.creator,
            create_time: parse_memo_time(self.create_time.as_deref()),
            update_time: parse_memo_time(self.update_time.as_deref()),
            display_time: parse_memo_time(self.display_time.as_deref()),
        })
    }
}

/// Timestamps the upstream omitted or that fail to parse become `None`;
/// a bad timestamp never fails an operation.
fn parse_memo_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_appends_segment_once() {
        assert_eq!(
            normalize_base_url("https://memos.example.com"),
            "https://memos.example.com/api/v1"
        );
        assert_eq!(
            normalize_base_url("https://memos.example.com/"),
            "https://memos.example.com/api/v1"
        );
        assert_eq!(
            normalize_base_url(" https://memos.example.com/api/v1 "),
            "https://memos.example.com/api/v1"
        );
        assert_eq!(normalize_base_url("   "), "");
    }

    #[test]
    fn test_client_requires_base_url_and_token() {
        let mut config = UpstreamConfig::default();
        config.token = "tok".to_string();
        assert!(matches!(
            MemosClient::new(&config),
            Err(ClientError::Config { .. })
        ));

        config.base_url = "https://memos.example.com".to_string();
        config.token = "  ".to_string();
        assert!(matches!(
            MemosClient::new(&config),
            Err(ClientError::Config { .. })
        ));

        config.token = "tok".to_string();
        assert!(MemosClient::new(&config).is_ok());
    }

    #[test]
    fn test_memo_patch_mask_matches_body() {
        let patch = MemoPatch {
            content: None,
            visibility: Some(Visibility::Public),
            pinned: Some(true),
        };
        assert_eq!(patch.mask(), vec!["visibility", "pinned"]);
        let body = patch.body();
        assert_eq!(body["visibility"], "PUBLIC");
        assert_eq!(body["pinned"], true);
        assert!(body.get("content").is_none());
        assert!(body.get("name").is_none());
    }

    #[test]
    fn test_empty_patch() {
        let patch = MemoPatch::default();
        assert!(patch.is_empty());
        assert!(patch.mask().is_empty());
    }

    #[test]
    fn test_wire_memo_strict_visibility() {
        let wire: WireMemo = serde_json::from_value(serde_json::json!({
            "name": "memos/1",
            "content": "x",
            "visibility": "SECRET",
        }))
        .unwrap();
        assert!(matches!(
            wire.into_memo(),
            Err(ClientError::UpstreamValidation { .. })
        ));
    }

    #[test]
    fn test_wire_memo_lenient_timestamps() {
        let wire: WireMemo = serde_json::from_value(serde_json::json!({
            "name": "memos/1",
            "content": "x",
            "visibility": "PRIVATE",
            "displayTime": "2026-01-15T10:00:00Z",
            "createTime": "not-a-timestamp",
            "state": "ARCHIVED",
        }))
        .unwrap();
        let memo = wire.into_memo().unwrap();
        assert!(memo.display_time.is_some());
        assert!(memo.create_time.is_none());
        assert!(memo.update_time.is_none());
        assert!(memo.archived);
    }

    #[test]
    fn test_map_error_status_taxonomy() {
        let auth = map_error_status(StatusCode::UNAUTHORIZED, "/memos", "");
        assert!(matches!(auth, ClientError::UpstreamAuth { status: 401 }));

        let missing = map_error_status(StatusCode::NOT_FOUND, "/memos/9", "");
        assert!(matches!(missing, ClientError::NotFound { .. }));

        let invalid =
            map_error_status(StatusCode::UNPROCESSABLE_ENTITY, "/memos", r#"{"message":"bad"}"#);
        match invalid {
            ClientError::UpstreamValidation { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "bad");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let down = map_error_status(StatusCode::BAD_GATEWAY, "/memos", "oops");
        assert!(matches!(down, ClientError::Unavailable { .. }));
    }
}
