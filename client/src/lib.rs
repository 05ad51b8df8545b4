//! # Memos API Client
//!
//! Transport layer over the upstream Memos REST API.
//!
//! [`MemosClient`] builds authenticated requests, maps transport and HTTP
//! failures to typed errors, and hands out [`MemoPager`]s that walk
//! paginated list results lazily. No call is ever retried inside this
//! crate: each request returns a result or a typed error, at most once.

pub mod memos;
pub mod pager;

pub use memos::{ListQuery, MemoPage, MemoPatch, MemosClient};
pub use pager::MemoPager;
