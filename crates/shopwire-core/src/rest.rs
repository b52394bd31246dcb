//! REST page walker.

use std::fmt;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::aggregate::merge_pages;
use crate::budget::CallLimit;
use crate::config::{ApiConfig, ApiVersion};
use crate::error::{ApiError, ApiResult, TransportError};
use crate::redact::render;
use crate::request::{
    CallRequest, FIELDS_PARAM, LIMIT_PARAM, Method, PAGE_INFO_PARAM, QueryParams,
};
use crate::response::ApiResponse;
use crate::session::Session;
use crate::transport::Transport;

/// Per-page reducer.
///
/// Receives the page payload and returns what to keep. Returning `None` or an
/// empty value drops the page from the aggregate. Empty means `null`, `false`,
/// zero, `""`, `"0"`, `[]` or `{}`.
pub type PageReducer = Box<dyn FnMut(Value) -> Option<Value> + Send>;

/// Keys a continuation request may carry.
const CONTINUATION_KEYS: [&str; 3] = [LIMIT_PARAM, FIELDS_PARAM, PAGE_INFO_PARAM];

/// Prefix an endpoint with the versioned admin root unless it already starts
/// with `admin/`.
#[must_use]
pub fn normalize_endpoint(endpoint: &str, version: ApiVersion) -> String {
    let trimmed = endpoint.trim();
    let relative = trimmed.trim_start_matches('/');
    let has_root = relative
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("admin/"));
    if has_root {
        format!("/{relative}")
    } else {
        format!("/admin/api/{version}/{relative}")
    }
}

/// One logical REST operation.
pub struct RestCall {
    endpoint: String,
    method: Method,
    query: QueryParams,
    body: Option<Value>,
    result_key: Option<String>,
    reducer: Option<PageReducer>,
}

impl RestCall {
    /// Create a call.
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            query: QueryParams::new(),
            body: None,
            result_key: None,
            reducer: None,
        }
    }

    /// `GET` call.
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// `POST` call with a JSON body.
    #[must_use]
    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, endpoint).with_body(body)
    }

    /// `PUT` call with a JSON body.
    #[must_use]
    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, endpoint).with_body(body)
    }

    /// `DELETE` call.
    #[must_use]
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.set(key, value);
        self
    }

    /// Merge query parameters; later values replace earlier ones.
    #[must_use]
    pub fn with_query_params(mut self, params: QueryParams) -> Self {
        for (key, value) in params.iter() {
            self.query.set(key, value);
        }
        self
    }

    /// Restrict returned fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = fields
            .into_iter()
            .map(|field| field.as_ref().trim().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.query.set(FIELDS_PARAM, joined);
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Require `key` in every page body and collect only its value.
    #[must_use]
    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }

    /// Pass each page payload through `reducer`.
    #[must_use]
    pub fn with_reducer<F>(mut self, reducer: F) -> Self
    where
        F: FnMut(Value) -> Option<Value> + Send + 'static,
    {
        self.reducer = Some(Box::new(reducer));
        self
    }

    /// Endpoint as given by the caller.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Query parameters as given by the caller.
    #[must_use]
    pub const fn query(&self) -> &QueryParams {
        &self.query
    }

    /// JSON body.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Expected result key.
    #[must_use]
    pub fn result_key(&self) -> Option<&str> {
        self.result_key.as_deref()
    }
}

impl fmt::Debug for RestCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestCall")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("result_key", &self.result_key)
            .field("reducer", &self.reducer.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Walks a REST endpoint to its last page.
#[derive(Clone, Copy)]
pub struct RestWalker<'a> {
    transport: &'a dyn Transport,
    session: &'a Session,
    config: &'a ApiConfig,
}

impl<'a> RestWalker<'a> {
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

    /// Execute `call`, following continuation tokens, and aggregate the pages.
    #[instrument(
        name = "rest_walk",
        skip_all,
        fields(method = %call.method, endpoint = %call.endpoint, host = %self.session.host())
    )]
    pub async fn run(&self, call: RestCall) -> ApiResult<Value> {
        let RestCall {
            endpoint,
            method,
            mut query,
            body,
            result_key,
            mut reducer,
        } = call;
        let endpoint = normalize_endpoint(&endpoint, self.config.api_version);

        self.session.validate()?;

        if method == Method::Get {
            query.set(LIMIT_PARAM, self.config.effective_page_limit().to_string());
        }

        let mut request = CallRequest {
            method,
            path: endpoint.clone(),
            query,
            body,
        };
        let mut pages = Vec::new();
        let mut page = 0_u32;

        loop {
            page += 1;
            let response = self.fetch_page(&request, page).await?;

            if !response.errors.is_empty() {
                return Err(ApiError::Application {
                    method: method.to_string(),
                    endpoint,
                    status: response.status,
                    response: render(&response),
                });
            }

            let next_page = if method == Method::Get {
                response.next_page.clone()
            } else {
                None
            };

            if method.returns_payload() {
                let payload = extract_payload(response, result_key.as_deref(), &endpoint)?;
                let kept = match reducer.as_mut() {
                    Some(reduce) => reduce(payload).filter(|value| !is_empty_payload(value)),
                    None => Some(payload),
                };
                match kept {
                    Some(value) => pages.push(value),
                    None => debug!(page, "reducer dropped page"),
                }
            }

            let Some(token) = next_page else {
                break;
            };
            request.query.retain_keys(&CONTINUATION_KEYS);
            request.query.set(PAGE_INFO_PARAM, token);
        }

        debug!(pages = page, collected = pages.len(), "rest walk complete");
        merge_pages(pages)
    }

    async fn fetch_page(&self, request: &CallRequest, page: u32) -> ApiResult<ApiResponse> {
        let transport = self.transport;
        let session = self.session;
        let config = self.config;

        let outcome = config
            .retry
            .run(
                move |attempt| {
                    debug!(page, attempt, query = ?request.query, "sending rest request");
                    transport.rest(session, request)
                },
                |result: &Result<ApiResponse, TransportError>| match result {
                    Ok(response) => config.is_transient_status(response.status),
                    Err(err) => err.is_retryable(),
                },
            )
            .await;

        let exhausted = |status: Option<u16>, response: String| ApiError::RetriesExhausted {
            attempts: outcome.attempts,
            method: request.method.to_string(),
            endpoint: request.path.clone(),
            status,
            response,
        };

        match outcome.value {
            Ok(response) if outcome.exhausted => {
                Err(exhausted(Some(response.status), render(&response)))
            }
            Ok(response) => {
                if let Some(limit) = CallLimit::from_response(&response) {
                    debug!(
                        page,
                        status = response.status,
                        used = limit.used,
                        capacity = limit.capacity,
                        "rest page received"
                    );
                }
                Ok(response)
            }
            Err(err) if outcome.exhausted => Err(exhausted(err.status_code, err.message)),
            Err(err) => Err(ApiError::Transport(err)),
        }
    }
}

fn extract_payload(response: ApiResponse, key: Option<&str>, endpoint: &str) -> ApiResult<Value> {
    let Some(key) = key else {
        return Ok(response.body);
    };
    let present = response
        .body
        .get(key)
        .is_some_and(|value| !value.is_null());
    if !present {
        return Err(ApiError::SchemaMismatch {
            endpoint: endpoint.to_string(),
            status: response.status,
            key: key.to_string(),
            body: render(&response.body),
        });
    }
    let ApiResponse { mut body, .. } = response;
    Ok(body
        .as_object_mut()
        .and_then(|map| map.remove(key))
        .unwrap_or(Value::Null))
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn endpoints_get_the_versioned_root() {
        let version = ApiVersion::default();
        assert_eq!(
            normalize_endpoint("products.json", version),
            "/admin/api/2024-01/products.json"
        );
        assert_eq!(
            normalize_endpoint("/orders/7.json", version),
            "/admin/api/2024-01/orders/7.json"
        );
    }

    #[test]
    fn admin_rooted_endpoints_are_kept() {
        let version = ApiVersion::default();
        assert_eq!(
            normalize_endpoint("admin/oauth/access_scopes.json", version),
            "/admin/oauth/access_scopes.json"
        );
        assert_eq!(
            normalize_endpoint("/Admin/api/2023-10/shop.json", version),
            "/Admin/api/2023-10/shop.json"
        );
    }

    #[test]
    fn empty_payloads() {
        assert!(is_empty_payload(&json!(null)));
        assert!(is_empty_payload(&json!([])));
        assert!(is_empty_payload(&json!({})));
        assert!(is_empty_payload(&json!("")));
        assert!(is_empty_payload(&json!(false)));
        assert!(is_empty_payload(&json!(0)));
        assert!(is_empty_payload(&json!(0.0)));
        assert!(is_empty_payload(&json!("0")));
        assert!(!is_empty_payload(&json!(1)));
        assert!(!is_empty_payload(&json!(-0.5)));
        assert!(!is_empty_payload(&json!("00")));
        assert!(!is_empty_payload(&json!(true)));
        assert!(!is_empty_payload(&json!([{"id": 1}])));
    }

    #[test]
    fn extract_requires_key() {
        let response = ApiResponse::ok(json!({"orders": null}));
        let err = extract_payload(response, Some("orders"), "/admin/api/2024-01/orders.json")
            .unwrap_err();
        assert!(matches!(err, ApiError::SchemaMismatch { ref key, .. } if key == "orders"));

        let response = ApiResponse::ok(json!({"order": {"id": 7}}));
        let payload = extract_payload(response, Some("order"), "/x").unwrap();
        assert_eq!(payload, json!({"id": 7}));
    }

    #[test]
    fn call_builder_collects_fields() {
        let call = RestCall::get("products.json")
            .with_query("status", "active")
            .with_fields(["id", " title"])
            .with_result_key("products");
        assert_eq!(call.query().get(FIELDS_PARAM), Some("id,title"));
        assert_eq!(call.result_key(), Some("products"));
        assert_eq!(call.method(), Method::Get);
    }
}
