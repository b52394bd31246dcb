//! Transport collaborator boundary.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{CallRequest, GraphqlRequest};
use crate::response::ApiResponse;
use crate::session::Session;

/// Executes a single request against the remote API.
///
/// Implementations perform no retries and no pagination; they report what one
/// round trip returned. HTTP error statuses are responses, not `Err`: only
/// failures that produced no response at all map to [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one REST request.
    async fn rest(
        &self,
        session: &Session,
        request: &CallRequest,
    ) -> Result<ApiResponse, TransportError>;

    /// Execute one GraphQL request.
    async fn graphql(
        &self,
        session: &Session,
        request: &GraphqlRequest,
    ) -> Result<ApiResponse, TransportError>;
}
