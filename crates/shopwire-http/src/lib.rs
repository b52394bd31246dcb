//! shopwire http - `reqwest` transport for the shopwire orchestration core.
//!
//! [`HttpTransport`] implements [`shopwire_core::Transport`]: it authorizes
//! requests with the session credential, follows nothing on its own, and
//! normalizes each HTTP exchange into an [`ApiResponse`](shopwire_core::ApiResponse)
//! with lower-cased headers, a JSON body, error descriptors and the
//! `page_info` tokens advertised by the `Link` header.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use shopwire_core::{ApiConfig, RestCall, Session, ShopApi};
//! use shopwire_http::HttpTransport;
//!
//! let config = ApiConfig::default();
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let mut api = ShopApi::new(Session::new("demo.myshopify.com", "shpat_..."), config, transport);
//! if api.fetch_paged(RestCall::get("products.json").with_result_key("products")).await {
//!     println!("{} products", api.results_array().len());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod link;
mod transport;

pub use link::PageLinks;
pub use transport::{ACCESS_TOKEN_HEADER, HttpTransport};
