//! shopwire test kit - test infrastructure for the shopwire crates.
//!
//! This crate provides:
//!
//! - [`ScriptedTransport`] - an in-memory [`Transport`](shopwire_core::Transport)
//!   that replays canned responses in order and records every request
//! - [`MockShop`] - a wiremock server that speaks the Shopify Admin API shapes
//!   (`Link` pagination headers, GraphQL envelopes)
//! - [`fixtures`] - sessions and REST/GraphQL page bodies
//! - Tracing configuration for test output
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use shopwire_core::{ApiConfig, RestCall, ShopApi};
//! use shopwire_testkit::{ScriptedTransport, fixtures};
//!
//! #[tokio::test(start_paused = true)]
//! async fn walks_two_pages() {
//!     shopwire_testkit::init_test_tracing();
//!
//!     let transport = Arc::new(ScriptedTransport::new());
//!     transport.push_rest(fixtures::rest_page("products", serde_json::json!([{"id": 1}])));
//!
//!     let mut api = ShopApi::new(fixtures::session(), ApiConfig::default(), transport.clone());
//!     assert!(api.fetch_paged(RestCall::get("products.json").with_result_key("products")).await);
//!     assert_eq!(transport.rest_calls(), 1);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod fixtures;
mod mock_server;
mod scripted;
mod tracing_config;

pub use mock_server::*;
pub use scripted::*;
pub use tracing_config::*;
