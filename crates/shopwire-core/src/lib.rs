//! shopwire core - request orchestration for the Shopify Admin APIs.
//!
//! This crate provides:
//! - A REST page walker that follows `page_info` continuation tokens, narrows
//!   query parameters between pages and retries transient status codes.
//! - A GraphQL cost walker that splices cursors into a query template and waits
//!   out the query-cost throttle budget between pages.
//! - A fixed-delay retry policy shared by both walkers.
//! - The [`ShopApi`] boundary that turns every failure into a success flag plus
//!   a diagnosable last-error string.
//!
//! The HTTP layer is a collaborator behind the [`Transport`] trait; see the
//! `shopwire-http` crate for a `reqwest` implementation.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod aggregate;
mod budget;
mod client;
mod config;
mod error;
mod graphql;
mod metafield;
mod redact;
mod request;
mod resources;
mod response;
mod rest;
mod retry;
mod session;
mod transport;

pub use aggregate::{flatten, merge_pages};
pub use budget::{CALL_LIMIT_HEADER, CallLimit, RateBudget};
pub use client::{ErrorReporter, ShopApi, ShopApiBuilder};
pub use config::{
    ApiConfig, ApiVersion, DEFAULT_API_VERSION, DEFAULT_RETRY_ON_STATUS, MAX_PAGE_LIMIT,
};
pub use error::{ApiError, ApiResult, ErrorKind, TransportError};
pub use graphql::{CURSOR_PLACEHOLDER, GraphCall, GraphqlWalker, splice_cursor};
pub use metafield::{DEFAULT_METAFIELD_NAMESPACE, MetafieldType, meta_packet};
pub use redact::redact_sensitive;
pub use request::{
    CallRequest, FIELDS_PARAM, GraphqlRequest, LIMIT_PARAM, Method, PAGE_INFO_PARAM, QueryParams,
};
pub use resources::FulfillmentLine;
pub use response::{
    ApiResponse, ErrorDescriptor, ErrorLocation, GraphqlEnvelope, GraphqlExtensions, PageInfo,
    PathSegment, QueryCost, ThrottleStatus,
};
pub use rest::{PageReducer, RestCall, RestWalker, normalize_endpoint};
pub use retry::{RetryDecision, RetryOutcome, RetryPolicy};
pub use session::{Credential, Session};
pub use transport::Transport;
