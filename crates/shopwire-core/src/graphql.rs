//! GraphQL cost walker.
//!
//! Queries are paginated by splicing an `after:` argument into the query text
//! at [`CURSOR_PLACEHOLDER`]. Between pages the walker waits until the
//! throttle bucket can pay for another query of the same cost.

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::aggregate::flatten;
use crate::budget::RateBudget;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult, TransportError};
use crate::redact::render;
use crate::request::GraphqlRequest;
use crate::response::{ApiResponse, GraphqlEnvelope, PageInfo};
use crate::session::Session;
use crate::transport::Transport;

/// Placeholder replaced by the `after:` argument on continuation requests.
pub const CURSOR_PLACEHOLDER: &str = "##cursor";

/// Endpoint label used in GraphQL schema-mismatch errors.
const GRAPHQL_ENDPOINT: &str = "graphql";

/// Replace the cursor placeholder in `template`.
///
/// With a cursor the placeholder becomes `, after: "<cursor>"` (the cursor is
/// JSON-escaped); without one it is removed.
#[must_use]
pub fn splice_cursor(template: &str, cursor: Option<&str>) -> String {
    let argument = cursor.map_or_else(String::new, |cursor| {
        format!(", after: {}", Value::String(cursor.to_string()))
    });
    template.replace(CURSOR_PLACEHOLDER, &argument)
}

/// One logical GraphQL operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphCall {
    template: String,
    variables: Value,
    result_field: String,
}

impl GraphCall {
    /// Create a call for `template`, paginating on `result_field`.
    #[must_use]
    pub fn new(template: impl Into<String>, result_field: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: Value::Object(Map::new()),
            result_field: result_field.into(),
        }
    }

    /// Set query variables.
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    /// Query template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Query variables.
    #[must_use]
    pub const fn variables(&self) -> &Value {
        &self.variables
    }

    /// Field whose `pageInfo` drives pagination.
    #[must_use]
    pub fn result_field(&self) -> &str {
        &self.result_field
    }
}

/// Walks a GraphQL connection to its last page.
#[derive(Clone, Copy)]
pub struct GraphqlWalker<'a> {
    transport: &'a dyn Transport,
    session: &'a Session,
    config: &'a ApiConfig,
}

impl<'a> GraphqlWalker<'a> {
    /// Create a walker.
    #[must_use]
    pub const fn new(
        transport: &'a dyn Transport,
        session: &'a Session,
        config: &'a ApiConfig,
    ) -> Self {
        Self {
            transport,
            session,
            config,
        }
    }

    /// Execute `call` page by page and return every edge node in order.
    #[instrument(
        name = "graphql_walk",
        skip_all,
        fields(result_field = %call.result_field, host = %self.session.host())
    )]
    pub async fn run(&self, call: GraphCall) -> ApiResult<Vec<Value>> {
        self.session.validate()?;

        let GraphCall {
            template,
            variables,
            result_field,
        } = call;
        let mut request = GraphqlRequest::new(
            self.config.graphql_path(),
            splice_cursor(&template, None),
            variables,
        );
        let mut pages = Vec::new();
        let mut page = 0_u32;

        loop {
            page += 1;
            let (status, envelope) = self.fetch_page(&request, page).await?;

            if !envelope.errors.is_empty() {
                return Err(ApiError::Graphql {
                    status,
                    errors: envelope.errors,
                });
            }

            let data = envelope.data.as_ref().map_or(&Value::Null, |data| {
                data.values().next().unwrap_or(&Value::Null)
            });
            pages.push(edge_nodes(data));

            let field = envelope
                .data
                .as_ref()
                .and_then(|data| data.get(&result_field))
                .ok_or_else(|| schema_mismatch(status, &result_field, &envelope))?;
            let page_info: PageInfo = field
                .get("pageInfo")
                .cloned()
                .and_then(|info| serde_json::from_value(info).ok())
                .unwrap_or_default();

            if !page_info.has_next_page {
                break;
            }

            let cursor = last_cursor(field)
                .or_else(|| page_info.end_cursor.clone())
                .ok_or_else(|| schema_mismatch(status, "cursor", &envelope))?;

            if let Some(cost) = envelope.cost() {
                let budget = RateBudget::from(cost);
                let wait = budget.wait_before_next();
                if wait.is_zero() {
                    debug!(
                        page,
                        cost = budget.requested,
                        available = budget.available,
                        "budget covers next page"
                    );
                } else {
                    warn!(
                        page,
                        cost = budget.requested,
                        available = budget.available,
                        restore_rate = budget.restore_rate,
                        wait_secs = wait.as_secs(),
                        "waiting for query cost budget"
                    );
                    tokio::time::sleep(wait).await;
                }
            }

            request.query = splice_cursor(&template, Some(&cursor));
        }

        let nodes = flatten(pages);
        debug!(pages = page, nodes = nodes.len(), "graphql walk complete");
        Ok(nodes)
    }

    async fn fetch_page(
        &self,
        request: &GraphqlRequest,
        page: u32,
    ) -> ApiResult<(u16, GraphqlEnvelope)> {
        let transport = self.transport;
        let session = self.session;

        let outcome = self
            .config
            .retry
            .run(
                move |attempt| async move {
                    debug!(page, attempt, "sending graphql query");
                    let response = transport.graphql(session, request).await;
                    let envelope = response
                        .as_ref()
                        .ok()
                        .and_then(|response| GraphqlEnvelope::decode(&response.body));
                    (response, envelope)
                },
                |(response, envelope): &(
                    Result<ApiResponse, TransportError>,
                    Option<GraphqlEnvelope>,
                )| match response {
                    Ok(_) => envelope.is_none(),
                    Err(err) => err.is_retryable(),
                },
            )
            .await;

        match outcome.value {
            (Ok(response), Some(mut envelope)) => {
                // Transport-level descriptors (e.g. HTTP 4xx) count as query errors.
                envelope.errors.extend(response.errors);
                Ok((response.status, envelope))
            }
            (Ok(response), None) => Err(ApiError::MalformedResponse {
                attempts: outcome.attempts,
                response: render(&response),
            }),
            (Err(err), _) if outcome.exhausted => Err(ApiError::MalformedResponse {
                attempts: outcome.attempts,
                response: err.to_string(),
            }),
            (Err(err), _) => Err(ApiError::Transport(err)),
        }
    }
}

fn edge_nodes(connection: &Value) -> Vec<Value> {
    connection
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge.get("node").cloned())
                .collect()
        })
        .unwrap_or_default()
}

fn last_cursor(connection: &Value) -> Option<String> {
    connection
        .get("edges")
        .and_then(Value::as_array)
        .and_then(|edges| edges.last())
        .and_then(|edge| edge.get("cursor"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn schema_mismatch(status: u16, key: &str, envelope: &GraphqlEnvelope) -> ApiError {
    ApiError::SchemaMismatch {
        endpoint: GRAPHQL_ENDPOINT.to_string(),
        status,
        key: key.to_string(),
        body: render(&envelope.data),
    }
}
