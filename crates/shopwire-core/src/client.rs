//! `ShopApi`: the orchestration boundary.
//!
//! Walkers return [`ApiResult`]; this facade converts every outcome into a
//! success flag, keeps the aggregate for retrieval and records a diagnosable
//! last-error string on failure.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::config::{ApiConfig, ApiVersion, DEFAULT_API_VERSION};
use crate::error::{ApiError, ApiResult};
use crate::graphql::{GraphCall, GraphqlWalker};
use crate::request::Method;
use crate::rest::{RestCall, RestWalker, normalize_endpoint};
use crate::session::Session;
use crate::transport::Transport;

/// External sink notified of failures. Never alters control flow.
pub trait ErrorReporter: Send + Sync {
    /// Record `error`.
    fn report(&self, error: &ApiError);
}

impl<F> ErrorReporter for F
where
    F: Fn(&ApiError) + Send + Sync,
{
    fn report(&self, error: &ApiError) {
        self(error);
    }
}

type Hook = Box<dyn FnMut() + Send>;

/// Builder for [`ShopApi`].
pub struct ShopApiBuilder {
    session: Session,
    transport: Arc<dyn Transport>,
    config: ApiConfig,
    reporter: Option<Arc<dyn ErrorReporter>>,
    on_success: Option<Hook>,
    on_error: Option<Hook>,
}

impl ShopApiBuilder {
    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Install an error reporter.
    #[must_use]
    pub fn error_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Hook run after every successful REST call.
    #[must_use]
    pub fn on_success(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Hook run after every failed REST call.
    #[must_use]
    pub fn on_error(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Build the facade.
    #[must_use]
    pub fn build(self) -> ShopApi {
        let api = ShopApi {
            session: self.session,
            transport: self.transport,
            config: self.config,
            reporter: self.reporter,
            on_success: self.on_success,
            on_error: self.on_error,
            results: None,
            last_error: None,
            failed: false,
            called_endpoint: None,
            request_method: None,
            posted_data: None,
        };
        api.check_version();
        api
    }
}

/// Paginated, rate-limited access to one shop.
///
/// Calls take `&mut self`, so one session runs at most one operation at a time.
pub struct ShopApi {
    session: Session,
    transport: Arc<dyn Transport>,
    config: ApiConfig,
    reporter: Option<Arc<dyn ErrorReporter>>,
    on_success: Option<Hook>,
    on_error: Option<Hook>,
    results: Option<Value>,
    last_error: Option<String>,
    failed: bool,
    called_endpoint: Option<String>,
    request_method: Option<Method>,
    posted_data: Option<Value>,
}

impl ShopApi {
    /// Create a facade with the given configuration.
    #[must_use]
    pub fn new(session: Session, config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self::builder(session, transport).config(config).build()
    }

    /// Start a builder with default configuration.
    #[must_use]
    pub fn builder(session: Session, transport: Arc<dyn Transport>) -> ShopApiBuilder {
        ShopApiBuilder {
            session,
            transport,
            config: ApiConfig::default(),
            reporter: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Session in use.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Switch API version for subsequent calls.
    pub fn set_api_version(&mut self, version: ApiVersion) {
        self.config.api_version = version;
        self.check_version();
    }

    /// Run a REST call to completion. Returns `true` on success.
    pub async fn fetch_paged(&mut self, call: RestCall) -> bool {
        let method = call.method();
        let endpoint = normalize_endpoint(call.endpoint(), self.config.api_version);
        self.begin(endpoint.clone(), method, call.body().cloned());

        let walker = RestWalker::new(self.transport.as_ref(), &self.session, &self.config);
        match walker.run(call).await {
            Ok(value) => {
                self.results = Some(value);
                if let Some(hook) = self.on_success.as_mut() {
                    hook();
                }
                true
            }
            Err(err) => {
                let message = format!(
                    "{err}[ {method} ]{}/{}",
                    self.session.host(),
                    endpoint.trim_start_matches('/')
                );
                self.fail(&err, message);
                if let Some(hook) = self.on_error.as_mut() {
                    hook();
                }
                false
            }
        }
    }

    /// Run a paginated GraphQL query to completion. Returns `true` on success.
    ///
    /// On success the results are the edge nodes of every page, in order.
    pub async fn fetch_graph_paged(&mut self, call: GraphCall) -> bool {
        let posted = json!({"query": call.template(), "variables": call.variables()});
        self.begin(self.config.graphql_path(), Method::Post, Some(posted));

        let walker = GraphqlWalker::new(self.transport.as_ref(), &self.session, &self.config);
        match walker.run(call).await {
            Ok(nodes) => {
                self.results = Some(Value::Array(nodes));
                true
            }
            Err(err) => {
                let message = err.to_string();
                self.fail(&err, message);
                false
            }
        }
    }

    /// Aggregate of the last successful call.
    #[must_use]
    pub const fn results(&self) -> Option<&Value> {
        self.results.as_ref()
    }

    /// Aggregate of the last successful call, deserialized into `T`.
    ///
    /// With no aggregate `T` is deserialized from `null`, so `Option<T>` yields
    /// `None`.
    pub fn results_as<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let value = self.results.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Aggregate as a list; a single record becomes a one-element list.
    #[must_use]
    pub fn results_array(&self) -> Vec<Value> {
        match &self.results {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        }
    }

    /// Aggregate serialized as JSON; empty when there is none.
    #[must_use]
    pub fn results_raw(&self) -> String {
        self.results
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    }

    /// Take the aggregate out, leaving none.
    pub fn take_results(&mut self) -> Option<Value> {
        self.results.take()
    }

    /// Replace the aggregate.
    pub fn set_results(&mut self, results: Option<Value>) {
        self.results = results;
    }

    /// Message of the last failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns `true` if the last call failed.
    #[must_use]
    pub const fn is_failed_request(&self) -> bool {
        self.failed
    }

    /// Normalized endpoint of the last call.
    #[must_use]
    pub fn called_endpoint(&self) -> Option<&str> {
        self.called_endpoint.as_deref()
    }

    /// Method of the last call.
    #[must_use]
    pub const fn request_method(&self) -> Option<Method> {
        self.request_method
    }

    /// Body sent with the last call.
    #[must_use]
    pub const fn posted_data(&self) -> Option<&Value> {
        self.posted_data.as_ref()
    }

    fn begin(&mut self, endpoint: String, method: Method, posted: Option<Value>) {
        self.called_endpoint = Some(endpoint);
        self.request_method = Some(method);
        self.posted_data = posted;
        self.results = None;
        self.failed = false;
    }

    pub(crate) fn fail(&mut self, err: &ApiError, message: String) {
        error!(kind = ?err.kind(), error = %message, "shop api call failed");
        self.results = None;
        self.failed = true;
        self.last_error = Some(message);
        self.report(err);
    }

    fn report(&self, err: &ApiError) {
        if let Some(reporter) = &self.reporter {
            reporter.report(err);
        }
    }

    fn check_version(&self) {
        if self.config.is_outdated_version() {
            let version = self.config.api_version;
            warn!(
                %version,
                minimum = %DEFAULT_API_VERSION,
                host = %self.session.host(),
                "outdated api version"
            );
            self.report(&ApiError::config(format!(
                concat!(
                    "Older Shopify Api version being used {} on {}, ",
                    "min version suggested {}"
                ),
                version,
                self.session.host(),
                DEFAULT_API_VERSION
            )));
        }
    }
}

impl fmt::Debug for ShopApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopApi")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("reporter", &self.reporter.is_some())
            .field("results", &self.results.is_some())
            .field("last_error", &self.last_error)
            .field("failed", &self.failed)
            .field("called_endpoint", &self.called_endpoint)
            .field("request_method", &self.request_method)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ShopApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopApiBuilder")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
