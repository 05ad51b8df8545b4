//! Shared test fixtures for the Memos manager workspace.
//!
//! Provides a wiremock-backed fake Memos server: memo JSON builders,
//! list-page bodies with cursor chaining, and ready-made configurations
//! pointing at a `MockServer`.

mod fixtures;

pub use fixtures::*;
