//! # Memos Manager Errors
//!
//! Error handling for the Memos manager tool suite.
//!
//! Two layers of typed errors:
//! - [`ClientError`] for the upstream HTTP transport
//! - [`ToolError`] for the tool-invocation boundary
//!
//! Every error is caught at the tool boundary and converted into an
//! `ok=false` result envelope; nothing propagates to the host as an
//! unhandled fault, and nothing is retried inside this system.

use thiserror::Error;

/// Upstream transport errors.
///
/// Each HTTP call maps to exactly one of these, at most once per call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid base URL/token. Raised at client construction,
    /// never at request time.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream rejected the bearer credential (401/403).
    #[error("Upstream rejected the access token (status {status})")]
    UpstreamAuth { status: u16 },

    /// Target resource absent upstream (404).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Upstream rejected the request or returned data outside the closed
    /// vocabulary (other 4xx, unknown visibility in a response body).
    #[error("Upstream validation error (status {status}): {message}")]
    UpstreamValidation { status: u16, message: String },

    /// 5xx, transport failure, timeout, or an unusable response body.
    #[error("Upstream unavailable: {reason}")]
    Unavailable { reason: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Tool-boundary errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Policy rejection. The message is fixed and generic regardless of
    /// the deny reason so that neither the caller identifier nor the
    /// allow-list configuration can leak through it.
    #[error("not authorized")]
    AuthDenied,

    /// Malformed date, unknown visibility, missing required field, bad
    /// memo name.
    #[error("Invalid input: {field} reason: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ToolError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
