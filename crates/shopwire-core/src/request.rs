//! Request types handed to a [`Transport`](crate::Transport).

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ApiError;

/// Page-size query parameter.
pub const LIMIT_PARAM: &str = "limit";
/// Field-selection query parameter.
pub const FIELDS_PARAM: &str = "fields";
/// Continuation-token query parameter.
pub const PAGE_INFO_PARAM: &str = "page_info";

/// HTTP method of a REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether responses to this method carry a payload worth collecting.
    #[must_use]
    pub const fn returns_payload(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(ApiError::config(format!("unsupported HTTP method: {other}"))),
        }
    }
}

/// Ordered query parameters.
///
/// Setting an existing key replaces its value in place, so the first-seen
/// order is what a transport renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter list.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Insert a parameter only when it is absent.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.get(&key).is_none() {
            self.pairs.push((key, value.into()));
        }
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(index).1)
    }

    /// Drop every parameter whose key is not in `keys`.
    pub fn retain_keys(&mut self, keys: &[&str]) {
        self.pairs.retain(|(k, _)| keys.contains(&k.as_str()));
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` when no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One REST request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRequest {
    /// HTTP method.
    pub method: Method,
    /// Normalized path, e.g. `/admin/api/2024-01/products.json`.
    pub path: String,
    /// Query parameters.
    pub query: QueryParams,
    /// JSON body for `POST`/`PUT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl CallRequest {
    /// Create a request without parameters or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
        }
    }

    /// Field selection, if any.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.query
            .get(FIELDS_PARAM)
            .into_iter()
            .flat_map(|fields| fields.split(','))
            .map(str::trim)
            .filter(|field| !field.is_empty())
    }

    /// Continuation token, if this request asks for a follow-up page.
    #[must_use]
    pub fn page_info(&self) -> Option<&str> {
        self.query.get(PAGE_INFO_PARAM)
    }
}

/// GraphQL request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlRequest {
    /// Versioned endpoint path, e.g. `/admin/api/2024-01/graphql.json`.
    #[serde(skip)]
    pub path: String,
    /// Query text.
    pub query: String,
    /// Variables.
    pub variables: serde_json::Value,
}

impl GraphqlRequest {
    /// Create a request for the GraphQL endpoint at `path`.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        query: impl Into<String>,
        variables: serde_json::Value,
    ) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut params = QueryParams::new()
            .with("status", "any")
            .with(LIMIT_PARAM, "50")
            .with("created_at_min", "2024-01-01");
        params.set(LIMIT_PARAM, "250");
        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, ["status", LIMIT_PARAM, "created_at_min"]);
        assert_eq!(params.get(LIMIT_PARAM), Some("250"));
    }

    #[test]
    fn retain_keys_narrows() {
        let mut params = QueryParams::new()
            .with("status", "any")
            .with(LIMIT_PARAM, "250")
            .with(FIELDS_PARAM, "id,title");
        params.retain_keys(&[LIMIT_PARAM, FIELDS_PARAM, PAGE_INFO_PARAM]);
        assert_eq!(params.len(), 2);
        assert!(params.get("status").is_none());
    }

    #[test]
    fn set_default_keeps_caller_value() {
        let mut params = QueryParams::new().with("status", "open");
        params.set_default("status", "any");
        params.set_default("order", "id asc");
        assert_eq!(params.get("status"), Some("open"));
        assert_eq!(params.get("order"), Some("id asc"));
    }

    #[test]
    fn fields_split_on_commas() {
        let mut request = CallRequest::new(Method::Get, "/admin/api/2024-01/products.json");
        request.query.set(FIELDS_PARAM, "id, title,,handle");
        let fields: Vec<_> = request.fields().collect();
        assert_eq!(fields, ["id", "title", "handle"]);
    }

    #[test]
    fn method_round_trips_through_str() {
        assert_eq!("put".parse::<Method>().unwrap(), Method::Put);
        assert!("PATCH".parse::<Method>().is_err());
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!(!Method::Delete.returns_payload());
    }

    #[test]
    fn query_params_serialize_as_map() {
        let params = QueryParams::new().with("a", "1").with("b", "2");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, serde_json::json!({"a": "1", "b": "2"}));
    }
}
