use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Tool-facing visibility vocabulary.
///
/// Maps 1:1 onto the upstream `PROTECTED | PRIVATE | PUBLIC` values. The
/// mapping is a closed bijection: anything outside the three values is
/// rejected at the boundary, never coerced to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Workspace,
    Private,
    Public,
}

impl Visibility {
    /// Parses a tool-facing label (`workspace`/`private`/`public`).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "workspace" => Some(Visibility::Workspace),
            "private" => Some(Visibility::Private),
            "public" => Some(Visibility::Public),
            _ => None,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Visibility::Workspace => "workspace",
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }

    /// Parses the upstream API vocabulary (`PROTECTED`/`PRIVATE`/`PUBLIC`).
    pub fn from_api(value: &str) -> Option<Self> {
        match value {
            "PROTECTED" => Some(Visibility::Workspace),
            "PRIVATE" => Some(Visibility::Private),
            "PUBLIC" => Some(Visibility::Public),
            _ => None,
        }
    }

    pub fn as_api(&self) -> &'static str {
        match self {
            Visibility::Workspace => "PROTECTED",
            Visibility::Private => "PRIVATE",
            Visibility::Public => "PUBLIC",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

impl std::str::FromStr for Visibility {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| anyhow::anyhow!("Invalid visibility label: {s}"))
    }
}

/// Upstream memo lifecycle state.
///
/// The tool surface models archiving as a boolean; on the wire it is the
/// `state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoState {
    Normal,
    Archived,
}

impl MemoState {
    pub fn from_archived(archived: bool) -> Self {
        if archived {
            MemoState::Archived
        } else {
            MemoState::Normal
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, MemoState::Archived)
    }

    pub fn as_api(&self) -> &'static str {
        match self {
            MemoState::Normal => "NORMAL",
            MemoState::Archived => "ARCHIVED",
        }
    }
}

/// Memo timestamp used for date filtering and result ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DateField {
    DisplayTime,
    CreateTime,
    UpdateTime,
}

impl DateField {
    /// Interprets a raw tool parameter, falling back to `display_time`
    /// for anything unrecognized.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("create_time") => DateField::CreateTime,
            Some("update_time") => DateField::UpdateTime,
            _ => DateField::DisplayTime,
        }
    }
}

impl Default for DateField {
    fn default() -> Self {
        DateField::DisplayTime
    }
}

/// A single note record in the upstream service.
///
/// Never persisted locally; every instance is the decoded result of a live
/// upstream response. Timestamps the upstream omitted or that failed to
/// parse are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Memo {
    /// Resource name, format `memos/<id>`.
    pub name: String,
    pub content: String,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub pinned: bool,
    /// Derived from the upstream `state` field.
    pub archived: bool,
    pub snippet: String,
    pub creator: String,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub display_time: Option<DateTime<Utc>>,
}

impl Memo {
    pub fn field_time(&self, field: DateField) -> Option<DateTime<Utc>> {
        match field {
            DateField::DisplayTime => self.display_time,
            DateField::CreateTime => self.create_time,
            DateField::UpdateTime => self.update_time,
        }
    }
}

/// Opaque caller identifier handed in by the host per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: String) -> Option<Self> {
        if id.is_empty() || id.len() > 100 {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CallerId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string()).ok_or_else(|| anyhow::anyhow!("Invalid caller ID"))
    }
}

/// Per-invocation context. Constructed by the host for every tool call;
/// never persisted across calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CallContext {
    pub caller_id: Option<CallerId>,
}

impl CallContext {
    pub fn new(caller_id: Option<CallerId>) -> Self {
        Self { caller_id }
    }

    pub fn caller(&self) -> Option<&str> {
        self.caller_id.as_ref().map(|c| c.as_str())
    }
}

/// Parameters of one search/listing run through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Optional keyword; blank degenerates to a pure recency listing.
    pub query: Option<String>,
    /// Raw user input, `YYYY-MM-DD` or ISO-8601.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub date_field: DateField,
    /// Archived-state is pinned per mode: either only archived memos or
    /// only unarchived ones, never both.
    pub archived_only: bool,
    /// Hard cap on the final result count.
    pub max_count: usize,
}
