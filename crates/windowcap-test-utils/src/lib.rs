//! Test utilities for the windowcap workspace
//!
//! Shared helpers for integration tests in `windowcap-core`,
//! `windowcap-mcp-server` and `windowcap-cli`.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! windowcap-test-utils = { path = "../windowcap-test-utils" }
//! ```
//!
//! # Modules
//!
//! - [`png`]: PNG signature and payload validation
//! - [`timing`]: timing measurement, duration assertions and bounded waits
//!
//! ```
//! use windowcap_test_utils::png::is_valid_png;
//!
//! assert!(!is_valid_png(b"not a png"));
//! ```
//!
//! # MCP Server Testing
//!
//! Protocol-level helpers (an in-process rmcp client and a small HTTP
//! client) live in `windowcap-mcp-server/tests/common/` because they depend
//! on the server crate itself.

pub mod png;
pub mod timing;
