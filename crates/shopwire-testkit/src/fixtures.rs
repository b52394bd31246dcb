//! Test fixtures: sessions and page bodies.

use serde_json::{Value, json};
use shopwire_core::{ApiResponse, ErrorDescriptor, Session};

/// Shop host used by fixtures.
pub const TEST_SHOP: &str = "test-shop.myshopify.com";

/// Access token used by fixtures.
pub const TEST_TOKEN: &str = "shpat_test_token";

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Token-authorized session for [`TEST_SHOP`].
#[must_use]
pub fn session() -> Session {
    Session::new(TEST_SHOP, TEST_TOKEN)
}

/// Session with a host but no credential.
#[must_use]
pub fn session_without_credential() -> Session {
    Session::new(TEST_SHOP, "")
}

// ─────────────────────────────────────────────────────────────────────────────
// REST
// ─────────────────────────────────────────────────────────────────────────────

/// `200 OK` with `{key: records}`.
#[must_use]
pub fn rest_page(key: &str, records: Value) -> ApiResponse {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), records);
    ApiResponse::ok(Value::Object(body))
}

/// Status-only response, e.g. a `503`.
#[must_use]
pub fn rest_status(status: u16) -> ApiResponse {
    ApiResponse::new(status, json!({"errors": "Service Unavailable"}))
}

/// Response carrying an error descriptor, as a transport reports a `422`.
#[must_use]
pub fn rest_error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({"errors": {"base": [message]}}))
        .with_error(ErrorDescriptor::message(message))
}

// ─────────────────────────────────────────────────────────────────────────────
// GraphQL
// ─────────────────────────────────────────────────────────────────────────────

/// Cursor the fixtures assign to a node: `cursor-<id>` or `cursor-<index>`.
#[must_use]
pub fn cursor_for(node: &Value, index: usize) -> String {
    node.get("id").map_or_else(
        || format!("cursor-{index}"),
        |id| match id {
            Value::String(id) => format!("cursor-{id}"),
            other => format!("cursor-{other}"),
        },
    )
}

/// Connection page under `data.<field>` with one edge per node.
#[must_use]
pub fn graphql_page(field: &str, nodes: &[Value], has_next_page: bool) -> ApiResponse {
    let edges: Vec<Value> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| json!({"cursor": cursor_for(node, index), "node": node}))
        .collect();
    let mut data = serde_json::Map::new();
    data.insert(
        field.to_string(),
        json!({"edges": edges, "pageInfo": {"hasNextPage": has_next_page}}),
    );
    ApiResponse::ok(json!({"data": data}))
}

/// Attach a query-cost extension to a GraphQL response.
#[must_use]
pub fn with_query_cost(
    mut response: ApiResponse,
    requested: f64,
    available: f64,
    restore_rate: f64,
) -> ApiResponse {
    if let Some(body) = response.body.as_object_mut() {
        body.insert(
            "extensions".to_string(),
            json!({
                "cost": {
                    "requestedQueryCost": requested,
                    "actualQueryCost": requested,
                    "throttleStatus": {
                        "maximumAvailable": 1000.0,
                        "currentlyAvailable": available,
                        "restoreRate": restore_rate
                    }
                }
            }),
        );
    }
    response
}

/// A GraphQL response without the `data` envelope.
#[must_use]
pub fn graphql_without_data() -> ApiResponse {
    ApiResponse::new(502, json!({"errors": "Bad Gateway"}))
}
