//! Caller authorization gate.
//!
//! Checks the per-invocation caller identifier against the configured
//! allow-list before any operation proceeds. Every deny surfaces the same
//! fixed message: neither the identifier nor the allow-list contents
//! appear in the error text or in the tracing output.

use config::AuthPolicyConfig;
use errors::ToolError;
use std::collections::HashSet;
use tracing::warn;

pub struct UidGate {
    enabled: bool,
    allowlist: HashSet<String>,
}

impl UidGate {
    pub fn new(policy: &AuthPolicyConfig) -> Self {
        Self {
            enabled: policy.enabled,
            allowlist: policy.allowlist.iter().cloned().collect(),
        }
    }

    /// Policy disabled: always allow. Policy enabled: allow iff the
    /// identifier is an exact member of the allow-list; an empty
    /// allow-list denies everyone — there is no implicit bypass.
    pub fn authorize(&self, caller: Option<&str>) -> Result<(), ToolError> {
        if !self.enabled {
            return Ok(());
        }
        match caller {
            Some(id) if self.allowlist.contains(id) => Ok(()),
            _ => {
                warn!("tool call denied by caller policy");
                Err(ToolError::AuthDenied)
            }
        }
    }
}
