//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles. All variables carry the `MEMOS_` prefix.

use crate::config::{
    AuditConfig, AuthPolicyConfig, MemosConfig, SearchConfig, ToolsConfig, UpstreamConfig,
};
use std::env;

/// Load configuration from environment variables.
///
/// Environment variables override default values. Numeric variables that
/// fail to parse or are non-positive fall back to their defaults; boolean
/// variables accept `1`/`true`/`yes`/`on` (case-insensitive) as true.
///
/// ## Environment Variables
/// - `MEMOS_BASE_URL`: site root of the Memos instance
/// - `MEMOS_TOKEN`: bearer access token
/// - `MEMOS_TIMEOUT_SECONDS`: per-request timeout (default: 20)
/// - `MEMOS_PAGE_SIZE`: list page size (default: 100)
/// - `MEMOS_SEARCH_MAX_COUNT`: search result cap (default: 50)
/// - `MEMOS_AUDIT_ENABLED`: include audit text in envelopes (default: true)
/// - `MEMOS_AUDIT_MAX_CHARS`: audit truncation limit (default: 2000)
/// - `MEMOS_AUTH_ENABLED`: enable the caller allow-list (default: false)
/// - `MEMOS_AUTH_ALLOWLIST`: comma-separated caller identifiers
/// - `MEMOS_ENABLE_DELETE_TOOL`: register the delete tool (default: false)
/// - `MEMOS_DEFAULT_VISIBILITY`: create-time default visibility
///   (workspace/private/public, default: workspace)
pub fn load_from_env() -> MemosConfig {
    MemosConfig {
        upstream: load_upstream_from_env(),
        search: load_search_from_env(),
        audit: load_audit_from_env(),
        auth: load_auth_from_env(),
        tools: load_tools_from_env(),
    }
}

fn load_upstream_from_env() -> UpstreamConfig {
    let defaults = UpstreamConfig::default();
    UpstreamConfig {
        base_url: env::var("MEMOS_BASE_URL").unwrap_or_default(),
        token: env::var("MEMOS_TOKEN").unwrap_or_default(),
        timeout_seconds: parse_positive("MEMOS_TIMEOUT_SECONDS")
            .unwrap_or(defaults.timeout_seconds),
        page_size: parse_positive("MEMOS_PAGE_SIZE").unwrap_or(defaults.page_size),
    }
}

fn load_search_from_env() -> SearchConfig {
    SearchConfig {
        max_count: parse_positive("MEMOS_SEARCH_MAX_COUNT")
            .unwrap_or_else(|| SearchConfig::default().max_count),
    }
}

fn load_audit_from_env() -> AuditConfig {
    let defaults = AuditConfig::default();
    AuditConfig {
        enabled: parse_bool("MEMOS_AUDIT_ENABLED").unwrap_or(defaults.enabled),
        max_chars: parse_positive("MEMOS_AUDIT_MAX_CHARS").unwrap_or(defaults.max_chars),
    }
}

fn load_auth_from_env() -> AuthPolicyConfig {
    AuthPolicyConfig {
        enabled: parse_bool("MEMOS_AUTH_ENABLED").unwrap_or(false),
        allowlist: env::var("MEMOS_AUTH_ALLOWLIST")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn load_tools_from_env() -> ToolsConfig {
    ToolsConfig {
        enable_delete: parse_bool("MEMOS_ENABLE_DELETE_TOOL").unwrap_or(false),
        default_visibility: env::var("MEMOS_DEFAULT_VISIBILITY")
            .unwrap_or_else(|_| ToolsConfig::default().default_visibility),
    }
}

/// Parses a numeric variable, treating unset, unparsable, and non-positive
/// values alike as "use the default".
fn parse_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .filter(|v| *v > T::default())
}

fn parse_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
