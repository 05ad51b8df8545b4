//! # Memos Manager Tools
//!
//! The tool surface the host agent runtime embeds: search, create,
//! update, archive, and (optionally) delete over the upstream Memos API.
//!
//! Control flow per invocation: authorization gate, then the operation
//! (search pipeline or a direct client call), then the uniform result
//! envelope. Every outcome — success or failure — leaves as an envelope;
//! no error propagates to the host as an unhandled fault.

pub mod envelope;
pub mod gate;
pub mod memos;
pub mod search;
pub mod tools;

pub use memos::build_registry;
pub use tools::{Tool, ToolDefinition, ToolRegistry};
