//! `reqwest` implementation of [`Transport`].

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, LINK};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use shopwire_core::{
    ApiConfig, ApiResponse, CallRequest, Credential, ErrorDescriptor, GraphqlRequest, Method,
    Session, Transport, TransportError,
};
use tracing::{debug, instrument};
use url::Url;

use crate::link::PageLinks;

/// Header carrying an Admin API access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";

const USER_AGENT: &str = concat!("shopwire/", env!("CARGO_PKG_VERSION"));

/// HTTP transport for the Admin REST and GraphQL APIs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    /// Build a transport honouring the configured timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base_url: None,
        })
    }

    /// Send every request to `base_url` instead of `https://{host}`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn url(&self, session: &Session, path: &str) -> Result<Url, TransportError> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => Url::parse(&format!("https://{}", session.host()))
                .map_err(|err| TransportError::new(format!("invalid shop host: {err}")))?,
        };
        base.join(path)
            .map_err(|err| TransportError::new(format!("invalid request path {path:?}: {err}")))
    }

    fn authorize(builder: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.credential() {
            Credential::AccessToken(token) => builder.header(ACCESS_TOKEN_HEADER, token.as_str()),
            Credential::Basic { user, password } => builder.basic_auth(user, Some(password)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        skip_all,
        fields(method = %request.method, path = %request.path, host = %session.host())
    )]
    async fn rest(
        &self,
        session: &Session,
        request: &CallRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(session, &request.path)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, url).query(&request.query);
        if matches!(request.method, Method::Post | Method::Put) {
            builder = builder.json(request.body.as_ref().unwrap_or(&Value::Null));
        }

        let response = Self::authorize(builder, session)
            .send()
            .await
            .map_err(transport_error)?;
        let normalized = normalize(response, true).await?;
        debug!(
            status = normalized.status,
            errors = normalized.errors.len(),
            has_next = normalized.next_page.is_some(),
            "rest response"
        );
        Ok(normalized)
    }

    #[instrument(skip_all, fields(path = %request.path, host = %session.host()))]
    async fn graphql(
        &self,
        session: &Session,
        request: &GraphqlRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(session, &request.path)?;
        let builder = self.http.post(url).json(request);

        let response = Self::authorize(builder, session)
            .send()
            .await
            .map_err(transport_error)?;
        let normalized = normalize(response, false).await?;
        debug!(status = normalized.status, "graphql response");
        Ok(normalized)
    }
}

/// Convert a `reqwest` response.
///
/// GraphQL error members belong to the envelope, so only REST bodies
/// contribute descriptors beyond the HTTP status.
async fn normalize(
    response: reqwest::Response,
    body_errors: bool,
) -> Result<ApiResponse, TransportError> {
    let status = response.status();
    let mut normalized = ApiResponse::status(status.as_u16());

    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            normalized = normalized.with_header(name.as_str(), value);
        }
    }
    if let Some(link) = response.headers().get(LINK).and_then(|v| v.to_str().ok()) {
        let links = PageLinks::parse(link);
        normalized.next_page = links.next;
        normalized.previous_page = links.previous;
    }

    let text = response.text().await.map_err(transport_error)?;
    normalized.body = serde_json::from_str(&text).unwrap_or(Value::Null);

    if body_errors {
        normalized.errors = descriptors(&normalized.body);
    }
    if status.as_u16() >= 400 && normalized.errors.is_empty() {
        normalized.errors.push(status_descriptor(status));
    }
    Ok(normalized)
}

/// Error descriptors from a REST body `errors` member.
///
/// Shopify reports errors as a string, a list, or an object keyed by field.
fn descriptors(body: &Value) -> Vec<ErrorDescriptor> {
    match body.get("errors") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(message)) => vec![ErrorDescriptor::message(message.clone())],
        Some(Value::Array(items)) => items.iter().map(descriptor).collect(),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(field, messages)| {
                ErrorDescriptor::message(format!("{field}: {}", join_messages(messages)))
                    .with_path(field.clone())
            })
            .collect(),
        Some(other) => vec![ErrorDescriptor::message(other.to_string())],
    }
}

fn descriptor(item: &Value) -> ErrorDescriptor {
    match item {
        Value::String(message) => ErrorDescriptor::message(message.clone()),
        other => serde_json::from_value(other.clone())
            .unwrap_or_else(|_| ErrorDescriptor::message(other.to_string())),
    }
}

fn join_messages(messages: &Value) -> String {
    match messages {
        Value::String(message) => message.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn status_descriptor(status: StatusCode) -> ErrorDescriptor {
    ErrorDescriptor::message(format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("error")
    ))
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let mut converted = if err.is_timeout() {
        TransportError::timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::connect(err.to_string())
    } else {
        TransportError::new(err.to_string())
    };
    if let Some(status) = err.status() {
        converted = converted.with_status(status.as_u16());
    }
    converted
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_errors() {
        let errors = descriptors(&json!({"errors": "Not Found"}));
        assert_eq!(errors, vec![ErrorDescriptor::message("Not Found")]);
    }

    #[test]
    fn field_errors() {
        let errors = descriptors(&json!({"errors": {"title": ["can't be blank", "is too short"]}}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "title: can't be blank, is too short");
        assert_eq!(errors[0].path.len(), 1);
    }

    #[test]
    fn list_errors() {
        let errors = descriptors(&json!({"errors": ["a", {"message": "b"}]}));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].message, "b");
    }

    #[test]
    fn no_errors_member() {
        assert!(descriptors(&json!({"products": []})).is_empty());
        assert!(descriptors(&Value::Null).is_empty());
    }

    #[test]
    fn status_descriptor_names_reason() {
        assert_eq!(
            status_descriptor(StatusCode::TOO_MANY_REQUESTS).message,
            "HTTP 429 Too Many Requests"
        );
    }
}
