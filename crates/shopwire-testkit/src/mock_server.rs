//! Mock Shopify Admin API server.
//!
//! Wraps wiremock with the response shapes the Admin API produces: REST pages
//! linked by `Link` headers and GraphQL envelopes.

use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A mock shop for testing HTTP transports.
pub struct MockShop {
    server: MockServer,
}

impl MockShop {
    /// Start a new mock shop.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// The underlying wiremock server for advanced configuration.
    #[must_use]
    pub const fn inner(&self) -> &MockServer {
        &self.server
    }

    // ─────────────────────────────────────────────────────────────────────────
    // REST
    // ─────────────────────────────────────────────────────────────────────────

    /// Serve one page of a REST listing.
    ///
    /// `page_info` selects the continuation request this page answers (`None`
    /// for the first page). When `next` is set, a `Link` header pointing at it
    /// is added.
    pub async fn expect_rest_page(
        &self,
        request_path: &str,
        page_info: Option<&str>,
        body: Value,
        next: Option<&str>,
    ) {
        let mut response = ResponseTemplate::new(200)
            .set_body_json(body)
            .insert_header("x-shopify-shop-api-call-limit", "1/40");
        if let Some(next) = next {
            response = response.insert_header(
                "link",
                format!(
                    "<{}{request_path}?limit=250&page_info={next}>; rel=\"next\"",
                    self.base_url()
                )
                .as_str(),
            );
        }

        let mock = Mock::given(method("GET")).and(path(request_path));
        match page_info {
            // Continuation mocks outrank the first-page mock for the same path.
            Some(token) => {
                mock.and(query_param("page_info", token))
                    .respond_with(response)
                    .with_priority(1)
                    .mount(&self.server)
                    .await;
            }
            None => {
                mock.respond_with(response)
                    .with_priority(5)
                    .mount(&self.server)
                    .await;
            }
        }
    }

    /// Respond to `http_method request_path` with `status` and a JSON body.
    pub async fn expect_status(
        &self,
        http_method: &str,
        request_path: &str,
        status: u16,
        body: Value,
    ) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // GraphQL
    // ─────────────────────────────────────────────────────────────────────────

    /// Respond to GraphQL posts at `graphql_path` with `body`.
    pub async fn expect_graphql(&self, graphql_path: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(graphql_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// All received requests for manual inspection.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Verify that exactly `expected` requests were received.
    ///
    /// # Panics
    ///
    /// Panics if the count differs.
    pub async fn assert_request_count(&self, expected: usize) {
        let received = self.received_requests().await;
        assert_eq!(
            received.len(),
            expected,
            "Expected {} requests but received {}",
            expected,
            received.len()
        );
    }
}
