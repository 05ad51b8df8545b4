use crate::envelope::ResultEnvelope;
use async_trait::async_trait;
use mm_core::CallContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, instrument};

/// A single tool exposed to the host agent runtime.
///
/// `call` never fails upward: every outcome, including parameter and
/// authorization failures, is returned as a [`ResultEnvelope`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn call(&self, ctx: &CallContext, params: Value) -> ResultEnvelope;
}

/// The set of tools the host may invoke. A tool left unregistered (e.g.
/// delete when disabled by configuration) is absent, not a runtime deny.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    #[instrument(skip(self, ctx, params))]
    pub async fn call(&self, name: &str, ctx: &CallContext, params: Value) -> ResultEnvelope {
        match self.tools.get(name) {
            Some(tool) => {
                let envelope = tool.call(ctx, params).await;
                info!(
                    tool = name,
                    trace = %envelope.trace_id,
                    ok = envelope.ok,
                    "tool call finished"
                );
                envelope
            }
            None => ResultEnvelope::error(vec![format!("unknown tool: {name}")]),
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}
