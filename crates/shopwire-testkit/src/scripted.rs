//! Scripted in-memory transport.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use shopwire_core::{
    ApiResponse, CallRequest, GraphqlRequest, Session, Transport, TransportError,
};
use tokio::time::Instant;

type Scripted = Result<ApiResponse, TransportError>;

/// A request observed by [`ScriptedTransport`], with the (possibly paused)
/// clock reading at which it was sent.
#[derive(Debug, Clone)]
pub struct Recorded<R> {
    /// The request.
    pub request: R,
    /// When it was sent.
    pub at: Instant,
}

/// Transport that replays queued outcomes in order.
///
/// REST and GraphQL have separate queues. An exhausted queue yields a
/// non-retryable [`TransportError`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    rest: Mutex<VecDeque<Scripted>>,
    graphql: Mutex<VecDeque<Scripted>>,
    rest_log: Mutex<Vec<Recorded<CallRequest>>>,
    graphql_log: Mutex<Vec<Recorded<GraphqlRequest>>>,
}

impl ScriptedTransport {
    /// Create a transport with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scripting
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a REST response.
    pub fn push_rest(&self, response: ApiResponse) -> &Self {
        self.rest.lock().push_back(Ok(response));
        self
    }

    /// Queue the same REST response `times` times.
    pub fn push_rest_repeated(&self, response: &ApiResponse, times: usize) -> &Self {
        let mut queue = self.rest.lock();
        for _ in 0..times {
            queue.push_back(Ok(response.clone()));
        }
        drop(queue);
        self
    }

    /// Queue a REST transport failure.
    pub fn push_rest_error(&self, error: TransportError) -> &Self {
        self.rest.lock().push_back(Err(error));
        self
    }

    /// Queue a GraphQL response.
    pub fn push_graphql(&self, response: ApiResponse) -> &Self {
        self.graphql.lock().push_back(Ok(response));
        self
    }

    /// Queue the same GraphQL response `times` times.
    pub fn push_graphql_repeated(&self, response: &ApiResponse, times: usize) -> &Self {
        let mut queue = self.graphql.lock();
        for _ in 0..times {
            queue.push_back(Ok(response.clone()));
        }
        drop(queue);
        self
    }

    /// Queue a GraphQL transport failure.
    pub fn push_graphql_error(&self, error: TransportError) -> &Self {
        self.graphql.lock().push_back(Err(error));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// REST requests sent so far.
    #[must_use]
    pub fn rest_requests(&self) -> Vec<CallRequest> {
        self.rest_log
            .lock()
            .iter()
            .map(|recorded| recorded.request.clone())
            .collect()
    }

    /// REST requests with send times.
    #[must_use]
    pub fn rest_log(&self) -> Vec<Recorded<CallRequest>> {
        self.rest_log.lock().clone()
    }

    /// Number of REST requests sent.
    #[must_use]
    pub fn rest_calls(&self) -> usize {
        self.rest_log.lock().len()
    }

    /// GraphQL requests sent so far.
    #[must_use]
    pub fn graphql_requests(&self) -> Vec<GraphqlRequest> {
        self.graphql_log
            .lock()
            .iter()
            .map(|recorded| recorded.request.clone())
            .collect()
    }

    /// GraphQL requests with send times.
    #[must_use]
    pub fn graphql_log(&self) -> Vec<Recorded<GraphqlRequest>> {
        self.graphql_log.lock().clone()
    }

    /// Number of GraphQL requests sent.
    #[must_use]
    pub fn graphql_calls(&self) -> usize {
        self.graphql_log.lock().len()
    }

    /// Scripted outcomes not yet consumed, REST then GraphQL.
    #[must_use]
    pub fn remaining(&self) -> (usize, usize) {
        (self.rest.lock().len(), self.graphql.lock().len())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn rest(
        &self,
        _session: &Session,
        request: &CallRequest,
    ) -> Result<ApiResponse, TransportError> {
        self.rest_log.lock().push(Recorded {
            request: request.clone(),
            at: Instant::now(),
        });
        self.rest.lock().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(format!(
                "no scripted REST response for {} {}",
                request.method, request.path
            )))
        })
    }

    async fn graphql(
        &self,
        _session: &Session,
        request: &GraphqlRequest,
    ) -> Result<ApiResponse, TransportError> {
        self.graphql_log.lock().push(Recorded {
            request: request.clone(),
            at: Instant::now(),
        });
        self.graphql
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no scripted GraphQL response")))
    }
}
