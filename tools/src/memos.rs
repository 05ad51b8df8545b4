//! The memo tool surface: search, create, update, archive, delete.
//!
//! Every tool runs the same control flow: build the audit trail, check
//! the caller gate, parse and validate parameters, perform the operation,
//! and wrap the outcome in a [`ResultEnvelope`]. No error escapes a tool
//! as an `Err`; the registry only ever sees envelopes.

use crate::envelope::{AuditTrail, Redactor, ResultEnvelope};
use crate::gate::UidGate;
use crate::search;
use crate::tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use client::{MemoPatch, MemosClient};
use config::MemosConfig;
use errors::{ClientError, ToolError};
use mm_core::{CallContext, DateField, SearchQuery, Visibility};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

/// Shared state behind every tool instance. Built once at registry
/// construction and never mutated afterwards.
struct ToolDeps {
    config: Arc<MemosConfig>,
    client: MemosClient,
    gate: UidGate,
}

impl ToolDeps {
    fn new(config: Arc<MemosConfig>) -> Result<Self, ClientError> {
        let client = MemosClient::new(&config.upstream)?;
        let gate = UidGate::new(&config.auth);
        Ok(Self {
            config,
            client,
            gate,
        })
    }

    /// A fresh trail whose redactor masks the access token and the
    /// caller identifier out of audit text and error strings.
    fn trail(&self, ctx: &CallContext) -> AuditTrail {
        let mut redactor = Redactor::new().with_secret(self.config.upstream.token.trim());
        if let Some(caller) = ctx.caller() {
            redactor = redactor.with_secret(caller);
        }
        AuditTrail::new(&self.config.audit, redactor)
    }

    /// The configured default label is validated at load time, so the
    /// fallback arm is unreachable in a validated config.
    fn default_visibility(&self) -> Visibility {
        Visibility::from_label(&self.config.tools.default_visibility)
            .unwrap_or(Visibility::Workspace)
    }
}

/// Builds the tool registry from a loaded configuration. The delete tool
/// is registered only when `tools.enable_delete` is set; callers probing
/// for it otherwise see an absent tool, not a deny.
pub fn build_registry(config: Arc<MemosConfig>) -> Result<ToolRegistry, ClientError> {
    let deps = Arc::new(ToolDeps::new(config)?);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchTool { deps: deps.clone() }));
    registry.register(Box::new(CreateTool { deps: deps.clone() }));
    registry.register(Box::new(UpdateTool { deps: deps.clone() }));
    registry.register(Box::new(ArchiveTool { deps: deps.clone() }));
    if deps.config.tools.enable_delete {
        registry.register(Box::new(DeleteTool { deps }));
    }
    info!(tools = registry.len(), "memo tool registry built");
    Ok(registry)
}

fn parse_params<P>(params: Value) -> Result<P, ToolError>
where
    P: serde::de::DeserializeOwned + Validate,
{
    let parsed: P = serde_json::from_value(params)
        .map_err(|e| ToolError::invalid_input("params", e.to_string()))?;
    parsed
        .validate()
        .map_err(|e| ToolError::invalid_input("params", e.to_string()))?;
    Ok(parsed)
}

/// Rejects malformed memo resource names before any request is issued.
fn ensure_memo_name(name: &str) -> Result<(), ToolError> {
    if name.starts_with("memos/") && name.len() > "memos/".len() {
        Ok(())
    } else {
        Err(ToolError::invalid_input(
            "name",
            format!("memo name must look like memos/<id>, got {name:?}"),
        ))
    }
}

fn fail(mut trail: AuditTrail, err: &ToolError) -> ResultEnvelope {
    trail.step(format!("error message={err}"));
    trail.failure(vec![err.to_string()])
}

/// Runs the search pipeline for a tool invocation and renders the shared
/// listing payload. Used by both the search tool and the archive tool's
/// listing mode; they differ only in the pinned archived state.
async fn run_listing(
    deps: &ToolDeps,
    trail: &mut AuditTrail,
    tool: &str,
    query: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    date_field: Option<&str>,
    archived_only: bool,
) -> Result<Value, ToolError> {
    let date_field = DateField::parse_lenient(date_field);
    let max_count = deps.config.search.max_count;
    let query_present = query.as_deref().is_some_and(|q| !q.trim().is_empty());
    let query_mode = if query_present { "keyword" } else { "recent" };
    let trace = trail.trace_id().to_string();
    trail.step(format!(
        "start {tool} trace={trace} query_present={query_present} \
         include_archived={archived_only} search_max_count={max_count} \
         start_date={start_date:?} end_date={end_date:?} date_field={date_field}"
    ));

    let search_query = SearchQuery {
        query,
        start_date,
        end_date,
        date_field,
        archived_only,
        max_count,
    };
    let (memos, stats) = search::run(&deps.client, &search_query).await?;

    trail.step(format!("stop_reason={}", stats.stop_reason));
    if query_present {
        trail.step(format!(
            "keyword_filter_applied query={:?}",
            search_query.query.as_deref().unwrap_or_default().trim()
        ));
    } else {
        trail.step("keyword_filter_skipped query_empty=true");
    }
    trail.step(format!(
        "pipeline_done pages={} scanned={} date_kept={} keyword_kept={} final={}",
        stats.pages, stats.scanned, stats.date_kept, stats.keyword_kept, stats.final_count
    ));

    info!(tool, trace = %trace, returned = memos.len(), "listing finished");
    Ok(json!({
        "query_mode": query_mode,
        "search_max_count": max_count,
        "matched_count": memos.len(),
        "memos": memos,
    }))
}

// ---------------------------------------------------------------------------
// memos_search

#[derive(Debug, Deserialize, Validate, JsonSchema)]
struct SearchParams {
    query: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    date_field: Option<String>,
    #[serde(default)]
    include_archived: bool,
}

struct SearchTool {
    deps: Arc<ToolDeps>,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "memos_search"
    }

    fn description(&self) -> &str {
        "Search memos with optional date range and keyword. Pipeline is date \
         filtering then keyword matching. Final returned items are capped by \
         the configured search_max_count."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Optional keyword query. Empty means return recent memos.",
                },
                "start_date": {
                    "type": "string",
                    "description": "Optional start date/time. Supports YYYY-MM-DD or ISO8601.",
                },
                "end_date": {
                    "type": "string",
                    "description": "Optional end date/time. Supports YYYY-MM-DD or ISO8601.",
                },
                "date_field": {
                    "type": "string",
                    "description": "Date field for filtering: display_time/create_time/update_time.",
                    "default": "display_time",
                },
                "include_archived": {
                    "type": "boolean",
                    "description": "Whether to search archived memos instead of normal ones.",
                    "default": false,
                },
            },
            "required": [],
        })
    }

    async fn call(&self, ctx: &CallContext, params: Value) -> ResultEnvelope {
        let mut trail = self.deps.trail(ctx);
        if let Err(err) = self.deps.gate.authorize(ctx.caller()) {
            return fail(trail, &err);
        }
        let params: SearchParams = match parse_params(params) {
            Ok(p) => p,
            Err(err) => return fail(trail, &err),
        };
        let outcome = run_listing(
            &self.deps,
            &mut trail,
            "memos_search",
            params.query,
            params.start_date,
            params.end_date,
            params.date_field.as_deref(),
            params.include_archived,
        )
        .await;
        match outcome {
            Ok(payload) => trail.success(payload),
            Err(err) => {
                error!(trace = %trail.trace_id(), %err, "memos_search failed");
                fail(trail, &err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// memos_create

#[derive(Debug, Deserialize, Validate, JsonSchema)]
struct CreateParams {
    #[validate(length(min = 1, message = "content must not be empty"))]
    content: String,
    visibility: Option<String>,
}

struct CreateTool {
    deps: Arc<ToolDeps>,
}

impl CreateTool {
    fn resolve_visibility(&self, label: Option<&str>) -> Result<Visibility, ToolError> {
        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => Visibility::from_label(label).ok_or_else(|| {
                ToolError::invalid_input(
                    "visibility",
                    format!("unknown visibility label: {label}"),
                )
            }),
            None => Ok(self.deps.default_visibility()),
        }
    }
}

#[async_trait]
impl Tool for CreateTool {
    fn name(&self) -> &str {
        "memos_create"
    }

    fn description(&self) -> &str {
        "Create a new memo. Visibility defaults to the configured default_visibility."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Memo content in markdown.",
                },
                "visibility": {
                    "type": "string",
                    "description": "Optional visibility label: workspace/private/public.",
                },
            },
            "required": ["content"],
        })
    }

    async fn call(&self, ctx: &CallContext, params: Value) -> ResultEnvelope {
        let mut trail = self.deps.trail(ctx);
        if let Err(err) = self.deps.gate.authorize(ctx.caller()) {
            return fail(trail, &err);
        }
        let params: CreateParams = match parse_params(params) {
            Ok(p) => p,
            Err(err) => return fail(trail, &err),
        };
        let visibility = match self.resolve_visibility(params.visibility.as_deref()) {
            Ok(v) => v,
            Err(err) => return fail(trail, &err),
        };

        let trace = trail.trace_id().to_string();
        trail.step(format!(
            "start memos_create trace={trace} visibility_label={} visibility_api={}",
            visibility.as_label(),
            visibility.as_api()
        ));
        match self.deps.client.create(&params.content, visibility).await {
            Ok(memo) => {
                trail.step(format!("create_done memo={}", memo.name));
                info!(trace = %trace, memo = %memo.name, "memos_create ok");
                trail.success(json!({ "memo": memo }))
            }
            Err(err) => {
                error!(trace = %trace, %err, "memos_create failed");
                fail(trail, &ToolError::from(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// memos_update

#[derive(Debug, Deserialize, Validate, JsonSchema)]
struct UpdateParams {
    #[validate(length(min = 1))]
    name: String,
    content: Option<String>,
    visibility: Option<String>,
    pinned: Option<bool>,
}

struct UpdateTool {
    deps: Arc<ToolDeps>,
}

#[async_trait]
impl Tool for UpdateTool {
    fn name(&self) -> &str {
        "memos_update"
    }

    fn description(&self) -> &str {
        "Update memo content/visibility/pinned by memo name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Memo resource name, e.g. memos/xxxx.",
                },
                "content": {
                    "type": "string",
                    "description": "Optional updated markdown content.",
                },
                "visibility": {
                    "type": "string",
                    "description": "Optional visibility label: workspace/private/public.",
                },
                "pinned": {
                    "type": "boolean",
                    "description": "Optional pinned flag.",
                },
            },
            "required": ["name"],
        })
    }

    async fn call(&self, ctx: &CallContext, params: Value) -> ResultEnvelope {
        let mut trail = self.deps.trail(ctx);
        if let Err(err) = self.deps.gate.authorize(ctx.caller()) {
            return fail(trail, &err);
        }
        let params: UpdateParams = match parse_params(params) {
            Ok(p) => p,
            Err(err) => return fail(trail, &err),
        };
        if let Err(err) = ensure_memo_name(&params.name) {
            return fail(trail, &err);
        }

        let visibility = match params.visibility.as_deref() {
            Some(label) => match Visibility::from_label(label) {
                Some(v) => Some(v),
                None => {
                    let err = ToolError::invalid_input(
                        "visibility",
                        format!("unknown visibility label: {label}"),
                    );
                    return fail(trail, &err);
                }
            },
            None => None,
        };
        let patch = MemoPatch {
            content: params.content,
            visibility,
            pinned: params.pinned,
        };
        if patch.is_empty() {
            trail.step("no_update_fields_provided");
            return trail
                .failure(vec!["at least one of content/visibility/pinned is required".to_string()]);
        }

        let trace = trail.trace_id().to_string();
        trail.step(format!(
            "start memos_update trace={trace} name={} fields={}",
            params.name,
            patch.mask().join(",")
        ));
        match self.deps.client.update(&params.name, &patch).await {
            Ok(memo) => {
                trail.step("update_done");
                info!(trace = %trace, memo = %params.name, "memos_update ok");
                trail.success(json!({ "memo": memo }))
            }
            Err(err) => {
                error!(trace = %trace, %err, "memos_update failed");
                fail(trail, &ToolError::from(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// memos_archive

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ArchiveAction {
    Set,
    ListArchived,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
struct ArchiveParams {
    action: ArchiveAction,
    name: Option<String>,
    archived: Option<bool>,
    query: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    date_field: Option<String>,
}

struct ArchiveTool {
    deps: Arc<ToolDeps>,
}

#[async_trait]
impl Tool for ArchiveTool {
    fn name(&self) -> &str {
        "memos_archive"
    }

    fn description(&self) -> &str {
        "Archive management: action=set toggles a memo's archived flag \
         (archived defaults to true); action=list_archived lists archived \
         memos with the same optional keyword/date parameters as search."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["set", "list_archived"],
                    "description": "set: toggle one memo. list_archived: list archived memos.",
                },
                "name": {
                    "type": "string",
                    "description": "Memo resource name, required for action=set.",
                },
                "archived": {
                    "type": "boolean",
                    "description": "Target archived flag for action=set.",
                    "default": true,
                },
                "query": {
                    "type": "string",
                    "description": "Optional keyword query for action=list_archived.",
                },
                "start_date": {
                    "type": "string",
                    "description": "Optional start date/time for action=list_archived.",
                },
                "end_date": {
                    "type": "string",
                    "description": "Optional end date/time for action=list_archived.",
                },
                "date_field": {
                    "type": "string",
                    "description": "Date field for filtering: display_time/create_time/update_time.",
                    "default": "display_time",
                },
            },
            "required": ["action"],
        })
    }

    async fn call(&self, ctx: &CallContext, params: Value) -> ResultEnvelope {
        let mut trail = self.deps.trail(ctx);
        if let Err(err) = self.deps.gate.authorize(ctx.caller()) {
            return fail(trail, &err);
        }
        let params: ArchiveParams = match parse_params(params) {
            Ok(p) => p,
            Err(err) => return fail(trail, &err),
        };

        match params.action {
            ArchiveAction::Set => {
                let Some(name) = params.name.as_deref() else {
                    let err =
                        ToolError::invalid_input("name", "name is required for action=set");
                    return fail(trail, &err);
                };
                if let Err(err) = ensure_memo_name(name) {
                    return fail(trail, &err);
                }
                let archived = params.archived.unwrap_or(true);

                let trace = trail.trace_id().to_string();
                trail.step(format!(
                    "start memos_archive trace={trace} action=set name={name} archived={archived}"
                ));
                match self.deps.client.set_archived(name, archived).await {
                    Ok(memo) => {
                        trail.step("archive_done");
                        info!(trace = %trace, memo = %name, archived, "memos_archive ok");
                        trail.success(json!({ "memo": memo }))
                    }
                    Err(err) => {
                        error!(trace = %trace, %err, "memos_archive failed");
                        fail(trail, &ToolError::from(err))
                    }
                }
            }
            ArchiveAction::ListArchived => {
                let outcome = run_listing(
                    &self.deps,
                    &mut trail,
                    "memos_archive",
                    params.query,
                    params.start_date,
                    params.end_date,
                    params.date_field.as_deref(),
                    true,
                )
                .await;
                match outcome {
                    Ok(payload) => trail.success(payload),
                    Err(err) => {
                        error!(trace = %trail.trace_id(), %err, "memos_archive failed");
                        fail(trail, &err)
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// memos_delete

#[derive(Debug, Deserialize, Validate, JsonSchema)]
struct DeleteParams {
    #[validate(length(min = 1))]
    name: String,
}

struct DeleteTool {
    deps: Arc<ToolDeps>,
}

#[async_trait]
impl Tool for DeleteTool {
    fn name(&self) -> &str {
        "memos_delete"
    }

    fn description(&self) -> &str {
        "Delete a memo by resource name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Memo resource name, e.g. memos/xxxx.",
                },
            },
            "required": ["name"],
        })
    }

    async fn call(&self, ctx: &CallContext, params: Value) -> ResultEnvelope {
        let mut trail = self.deps.trail(ctx);
        if let Err(err) = self.deps.gate.authorize(ctx.caller()) {
            return fail(trail, &err);
        }
        let params: DeleteParams = match parse_params(params) {
            Ok(p) => p,
            Err(err) => return fail(trail, &err),
        };
        if let Err(err) = ensure_memo_name(&params.name) {
            return fail(trail, &err);
        }

        let trace = trail.trace_id().to_string();
        trail.step(format!(
            "start memos_delete trace={trace} name={}",
            params.name
        ));
        match self.deps.client.delete(&params.name).await {
            Ok(()) => {
                trail.step("delete_done");
                info!(trace = %trace, memo = %params.name, "memos_delete ok");
                trail.success(json!({ "deleted": params.name }))
            }
            Err(err) => {
                error!(trace = %trace, %err, "memos_delete failed");
                fail(trail, &ToolError::from(err))
            }
        }
    }
}
