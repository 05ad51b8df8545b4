//! # Memos Manager Core
//!
//! Shared types for the Memos manager tool suite.
//!
//! This crate provides:
//! - The domain `Memo` record and its timestamp/field selectors
//! - Closed visibility and state enums with explicit upstream mappings
//! - The per-invocation caller context threaded through every tool call
//! - The search query shape consumed by the pipeline

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    CallContext, CallerId, DateField, Memo, MemoState, SearchQuery, Visibility
};
