//! # Configuration Structures
//!
//! This module defines all configuration structures for the Memos manager
//! tool suite.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Are constructed once at startup and never mutated afterwards

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level configuration for the Memos manager tool suite.
///
/// Aggregates the upstream connection, search limits, audit policy,
/// caller authorization policy, and tool toggles. The host hands this in
/// read-only; every component receives it by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct MemosConfig {
    /// Upstream Memos API connection settings
    #[serde(default)]
    #[validate(nested)]
    pub upstream: UpstreamConfig,

    /// Search pipeline limits
    #[serde(default)]
    #[validate(nested)]
    pub search: SearchConfig,

    /// Audit trail policy
    #[serde(default)]
    #[validate(nested)]
    pub audit: AuditConfig,

    /// Caller allow-list policy
    #[serde(default)]
    pub auth: AuthPolicyConfig,

    /// Tool surface toggles
    #[serde(default)]
    #[validate(nested)]
    pub tools: ToolsConfig,
}

/// Upstream Memos API connection configuration.
///
/// ## Fields
/// - `base_url`: site root; the `/api/v1` segment is appended by the client
/// - `token`: bearer credential sent on every request
/// - `timeout_seconds`: per-request timeout (default: 20, range: 1-300)
/// - `page_size`: list page size (default: 100, range: 1-1000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct UpstreamConfig {
    /// Site root of the Memos instance
    #[serde(default)]
    pub base_url: String,

    /// Bearer access token
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_seconds: u64,

    /// Page size for list requests
    #[serde(default = "default_upstream_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,
}

fn default_upstream_timeout() -> u64 {
    20
}

fn default_upstream_page_size() -> u32 {
    100
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_seconds: default_upstream_timeout(),
            page_size: default_upstream_page_size(),
        }
    }
}

/// Search pipeline configuration.
///
/// ## Fields
/// - `max_count`: cap on the final result count (default: 50, range: 1-500)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SearchConfig {
    /// Maximum number of memos returned per search
    #[serde(default = "default_search_max_count")]
    #[validate(range(min = 1, max = 500))]
    pub max_count: usize,
}

fn default_search_max_count() -> usize {
    50
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_count: default_search_max_count(),
        }
    }
}

/// Audit trail configuration.
///
/// ## Fields
/// - `enabled`: include the audit text in result envelopes (default: true)
/// - `max_chars`: truncation limit for the audit text (default: 2000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct AuditConfig {
    /// Enable the audit text in result envelopes
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Maximum audit text length in characters
    #[serde(default = "default_audit_max_chars")]
    #[validate(range(min = 100, max = 100_000))]
    pub max_chars: usize,
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_max_chars() -> usize {
    2000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            max_chars: default_audit_max_chars(),
        }
    }
}

/// Caller allow-list policy.
///
/// With `enabled = false` every caller is allowed. With `enabled = true`
/// only identifiers in `allowlist` pass; an empty allow-list denies
/// everyone. There is no implicit bypass.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthPolicyConfig {
    /// Enable the caller allow-list check
    #[serde(default)]
    pub enabled: bool,

    /// Caller identifiers permitted when the check is enabled
    #[serde(default)]
    pub allowlist: Vec<String>,
}

/// Tool surface configuration.
///
/// ## Fields
/// - `enable_delete`: register the delete tool at all (default: false)
/// - `default_visibility`: visibility applied when create omits one
///   (default: "workspace", one of workspace/private/public)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ToolsConfig {
    /// Register the delete tool. When false the tool is absent from the
    /// registry, not a runtime deny.
    #[serde(default)]
    pub enable_delete: bool,

    /// Visibility label applied when a create omits one
    #[serde(default = "default_tools_visibility")]
    #[validate(custom(function = "validate_visibility_label"))]
    pub default_visibility: String,
}

fn default_tools_visibility() -> String {
    "workspace".to_string()
}

fn validate_visibility_label(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "workspace" | "private" | "public" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid visibility label")),
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enable_delete: false,
            default_visibility: default_tools_visibility(),
        }
    }
}
