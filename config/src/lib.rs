//! # Configuration System
//!
//! Centralized configuration for the Memos manager tool suite.
//!
//! This crate provides:
//! - Configuration structures for every component
//! - Environment variable loading (12-factor app principles)
//! - Configuration validation
//!
//! Configuration is loaded once at startup and treated as immutable for
//! the process lifetime; no component mutates it post-load.

pub mod config;
pub mod loader;

pub use config::{
    AuditConfig, AuthPolicyConfig, MemosConfig, SearchConfig, ToolsConfig, UpstreamConfig,
};
pub use loader::load_from_env;
pub use validator::Validate;
