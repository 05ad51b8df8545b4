//! The uniform result/audit envelope returned from every tool call.
//!
//! Redaction and truncation are enforced at construction time: the only
//! way to produce an envelope with audit text is through [`AuditTrail`],
//! which scrubs secrets before it truncates.

use config::AuditConfig;
use serde::Serialize;
use serde_json::Value;

/// Mints a fresh per-invocation correlation token.
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Masks configured secrets (access token, caller identifier) out of any
/// text destined for the envelope.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    pub fn scrub(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            out = out.replace(secret.as_str(), "***");
        }
        out
    }
}

/// The uniform `{ok, trace_id, result, audit, errors}` wrapper.
///
/// Invariants enforced by the constructors:
/// - `ok=false` implies `errors` is non-empty
/// - `trace_id` is always present, success or failure
/// - `audit` and `errors` never contain a configured secret
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope {
    pub ok: bool,
    pub trace_id: String,
    pub result: Value,
    pub audit: Option<String>,
    pub errors: Vec<String>,
}

impl ResultEnvelope {
    /// A failure envelope with no audit trail, for faults raised before a
    /// trail exists (e.g. an unknown tool name).
    pub fn error(errors: Vec<String>) -> Self {
        let mut errors = errors;
        if errors.is_empty() {
            errors.push("operation failed".to_string());
        }
        Self {
            ok: false,
            trace_id: new_trace_id(),
            result: Value::Null,
            audit: None,
            errors,
        }
    }
}

/// Step recorder for one tool invocation.
///
/// Collects audit step lines as the operation progresses and finally
/// builds the envelope. Scrubbing always runs before truncation so a
/// secret can never survive by straddling the cut.
pub struct AuditTrail {
    trace_id: String,
    steps: Vec<String>,
    enabled: bool,
    max_chars: usize,
    redactor: Redactor,
}

impl AuditTrail {
    pub fn new(audit: &AuditConfig, redactor: Redactor) -> Self {
        Self {
            trace_id: new_trace_id(),
            steps: Vec::new(),
            enabled: audit.enabled,
            max_chars: audit.max_chars,
            redactor,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn step(&mut self, line: impl Into<String>) {
        self.steps.push(line.into());
    }

    pub fn success(self, result: Value) -> ResultEnvelope {
        let (trace_id, audit, _) = self.render();
        ResultEnvelope {
            ok: true,
            trace_id,
            result,
            audit,
            errors: Vec::new(),
        }
    }

    pub fn failure(self, errors: Vec<String>) -> ResultEnvelope {
        let (trace_id, audit, redactor) = self.render();
        let mut errors: Vec<String> = errors.iter().map(|e| redactor.scrub(e)).collect();
        if errors.is_empty() {
            errors.push("operation failed".to_string());
        }
        ResultEnvelope {
            ok: false,
            trace_id,
            result: Value::Null,
            audit,
            errors,
        }
    }

    fn render(self) -> (String, Option<String>, Redactor) {
        if !self.enabled {
            return (self.trace_id, None, self.redactor);
        }
        let joined = self.redactor.scrub(&self.steps.join("\n"));
        let audit = truncate_chars(joined, self.max_chars);
        (self.trace_id, Some(audit), self.redactor)
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}
