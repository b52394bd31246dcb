//! Normalized responses and the typed GraphQL envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Error location within a GraphQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// Line number in the query (1-based).
    pub line: u32,
    /// Column number in the query (1-based).
    pub column: u32,
}

/// Path segment of a GraphQL error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name.
    Key(String),
    /// Array index.
    Index(i64),
}

/// One error reported by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Human-readable message.
    pub message: String,
    /// Location(s) within a GraphQL query.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    /// Response path (GraphQL) or offending field (REST).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    /// Extensions metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl ErrorDescriptor {
    /// Descriptor with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Attach a path segment.
    #[must_use]
    pub fn with_path(mut self, segment: impl Into<String>) -> Self {
        self.path.push(PathSegment::Key(segment.into()));
        self
    }
}

/// Transport-normalized response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body (`Null` when absent or not JSON).
    #[serde(default)]
    pub body: serde_json::Value,
    /// Response headers, lower-cased names.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Error descriptors; non-empty means the attempt failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDescriptor>,
    /// Continuation token for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    /// Continuation token for the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<String>,
}

impl ApiResponse {
    /// Create a response with status and body.
    #[must_use]
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body,
            ..Self::default()
        }
    }

    /// `200 OK` with a body.
    #[must_use]
    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    /// Status-only response without a body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::new(status, serde_json::Value::Null)
    }

    /// Attach a next-page token.
    #[must_use]
    pub fn with_next_page(mut self, token: impl Into<String>) -> Self {
        self.next_page = Some(token.into());
        self
    }

    /// Attach a previous-page token.
    #[must_use]
    pub fn with_previous_page(mut self, token: impl Into<String>) -> Self {
        self.previous_page = Some(token.into());
        self
    }

    /// Attach a header; the name is lower-cased.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Attach an error descriptor.
    #[must_use]
    pub fn with_error(mut self, error: ErrorDescriptor) -> Self {
        self.errors.push(error);
        self
    }

    /// Look up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if no error descriptors were returned.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Throttle state reported in the GraphQL cost extension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
    /// Bucket size.
    #[serde(default)]
    pub maximum_available: f64,
    /// Points currently available.
    pub currently_available: f64,
    /// Points restored per second.
    pub restore_rate: f64,
}

/// GraphQL query cost extension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCost {
    /// Cost requested for the query just run.
    pub requested_query_cost: f64,
    /// Cost actually charged.
    #[serde(default)]
    pub actual_query_cost: Option<f64>,
    /// Throttle bucket state.
    pub throttle_status: ThrottleStatus,
}

/// GraphQL `extensions` member.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphqlExtensions {
    /// Query cost, when the server reports it.
    #[serde(default)]
    pub cost: Option<QueryCost>,
}

/// Connection `pageInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page exists.
    #[serde(default)]
    pub has_next_page: bool,
    /// Cursor of the last edge, when requested.
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// Typed GraphQL response body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphqlEnvelope {
    /// `data` member, with keys in server order.
    #[serde(default)]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    /// GraphQL errors.
    #[serde(default)]
    pub errors: Vec<ErrorDescriptor>,
    /// Extensions payload.
    #[serde(default)]
    pub extensions: Option<GraphqlExtensions>,
}

impl GraphqlEnvelope {
    /// Decode a response body; `None` when the body is not an envelope with `data`.
    #[must_use]
    pub fn decode(body: &serde_json::Value) -> Option<Self> {
        let envelope: Self = serde_json::from_value(body.clone()).ok()?;
        envelope.data.is_some().then_some(envelope)
    }

    /// Query cost, if reported.
    #[must_use]
    pub fn cost(&self) -> Option<&QueryCost> {
        self.extensions.as_ref().and_then(|ext| ext.cost.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_requires_data() {
        assert!(GraphqlEnvelope::decode(&json!({"errors": []})).is_none());
        assert!(GraphqlEnvelope::decode(&json!(null)).is_none());
        assert!(GraphqlEnvelope::decode(&json!("oops")).is_none());
        assert!(GraphqlEnvelope::decode(&json!({"data": {"products": {}}})).is_some());
    }

    #[test]
    fn envelope_keeps_server_key_order() {
        let envelope = GraphqlEnvelope::decode(&json!({
            "data": {"zeta": {"edges": []}, "alpha": {"edges": []}}
        }))
        .unwrap();
        let keys: Vec<_> = envelope.data.unwrap().keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[test]
    fn cost_extension_decodes() {
        let envelope = GraphqlEnvelope::decode(&json!({
            "data": {"products": {"edges": []}},
            "extensions": {"cost": {
                "requestedQueryCost": 50,
                "actualQueryCost": 42,
                "throttleStatus": {
                    "maximumAvailable": 1000.0,
                    "currentlyAvailable": 10,
                    "restoreRate": 5.0
                }
            }}
        }))
        .unwrap();
        let cost = envelope.cost().unwrap();
        assert!((cost.requested_query_cost - 50.0).abs() < f64::EPSILON);
        assert!((cost.throttle_status.currently_available - 10.0).abs() < f64::EPSILON);
        assert!((cost.throttle_status.restore_rate - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn continuation_tokens_and_errors() {
        let response = ApiResponse::ok(json!({"orders": []}))
            .with_next_page("next-token")
            .with_previous_page("prev-token");
        assert_eq!(response.next_page.as_deref(), Some("next-token"));
        assert_eq!(response.previous_page.as_deref(), Some("prev-token"));
        assert!(response.is_ok());
        assert!(!response.with_error(ErrorDescriptor::message("Not Found")).is_ok());
    }

    #[test]
    fn headers_are_case_insensitive() {
        let response =
            ApiResponse::ok(json!({})).with_header("X-Shopify-Shop-Api-Call-Limit", "3/40");
        assert_eq!(response.header("x-shopify-shop-api-call-limit"), Some("3/40"));
        assert_eq!(response.header("X-SHOPIFY-SHOP-API-CALL-LIMIT"), Some("3/40"));
    }
}
