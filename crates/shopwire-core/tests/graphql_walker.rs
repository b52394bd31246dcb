//! GraphQL cost walker behaviour against a scripted transport.

use std::time::Duration;

use serde_json::{Value, json};
use shopwire_core::{
    ApiConfig, ApiError, ApiResponse, ApiVersion, ErrorKind, GraphCall, GraphqlWalker,
    TransportError,
};
use shopwire_testkit::{ScriptedTransport, fixtures, init_test_tracing};
use tokio::time::Instant;

const PRODUCTS_QUERY: &str =
    "{ products(first: 2##cursor) { edges { cursor node { id } } pageInfo { hasNextPage } } }";

async fn walk(transport: &ScriptedTransport) -> Result<Vec<Value>, ApiError> {
    let session = fixtures::session();
    let config = ApiConfig::default();
    GraphqlWalker::new(transport, &session, &config)
        .run(GraphCall::new(PRODUCTS_QUERY, "products"))
        .await
}

fn nodes(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| json!({"id": id})).collect()
}

#[tokio::test(start_paused = true)]
async fn pages_of_nodes_concatenate() {
    init_test_tracing();
    let transport = ScriptedTransport::new();
    transport
        .push_graphql(fixtures::graphql_page("products", &nodes(&[1, 2]), true))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[3, 4]), true))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[5]), false));

    let result = walk(&transport).await.unwrap();

    assert_eq!(result, nodes(&[1, 2, 3, 4, 5]));
    let queries: Vec<String> = transport
        .graphql_requests()
        .into_iter()
        .map(|request| request.query)
        .collect();
    assert_eq!(queries.len(), 3);
    assert!(!queries[0].contains("##cursor"));
    assert!(!queries[0].contains("after:"));
    assert!(queries[1].contains(r#"products(first: 2, after: "cursor-2")"#));
    assert!(queries[2].contains(r#"after: "cursor-4""#));
}

#[tokio::test(start_paused = true)]
async fn empty_connection_is_an_empty_result() {
    let transport = ScriptedTransport::new();
    transport.push_graphql(fixtures::graphql_page("products", &[], false));

    let result = walk(&transport).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(transport.graphql_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn waits_for_the_query_cost_budget() {
    let transport = ScriptedTransport::new();
    transport
        .push_graphql(fixtures::with_query_cost(
            fixtures::graphql_page("products", &nodes(&[1]), true),
            50.0,
            10.0,
            5.0,
        ))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[2]), false));

    walk(&transport).await.unwrap();

    let log = transport.graphql_log();
    let gap = log[1].at - log[0].at;
    assert!(gap >= Duration::from_secs(8), "{gap:?}");
    assert!(gap < Duration::from_secs(9), "{gap:?}");
}

#[tokio::test(start_paused = true)]
async fn no_wait_when_the_budget_suffices() {
    let transport = ScriptedTransport::new();
    transport
        .push_graphql(fixtures::with_query_cost(
            fixtures::graphql_page("products", &nodes(&[1]), true),
            10.0,
            900.0,
            50.0,
        ))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[2]), false));

    let started = Instant::now();
    walk(&transport).await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn no_wait_after_the_last_page() {
    let transport = ScriptedTransport::new();
    transport.push_graphql(fixtures::with_query_cost(
        fixtures::graphql_page("products", &nodes(&[1]), false),
        500.0,
        0.0,
        1.0,
    ));

    let started = Instant::now();
    walk(&transport).await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn missing_envelope_is_retried_then_fails() {
    let transport = ScriptedTransport::new();
    transport.push_graphql_repeated(&fixtures::graphql_without_data(), 10);

    let started = Instant::now();
    let err = walk(&transport).await.unwrap_err();

    assert_eq!(transport.graphql_calls(), 5);
    assert_eq!(started.elapsed().as_secs(), 60);
    assert!(matches!(err, ApiError::MalformedResponse { attempts: 5, .. }));
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(err.to_string().starts_with("Unable to fetch graphQL response"));

    let log = transport.graphql_log();
    for pair in log.windows(2) {
        assert_eq!(pair[1].at - pair[0].at, Duration::from_secs(15));
    }
}

#[tokio::test(start_paused = true)]
async fn envelope_recovers_within_the_bound() {
    let transport = ScriptedTransport::new();
    transport
        .push_graphql(fixtures::graphql_without_data())
        .push_graphql_error(TransportError::timeout("operation timed out"))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[1]), false));

    let started = Instant::now();
    let result = walk(&transport).await.unwrap();

    assert_eq!(result, nodes(&[1]));
    assert_eq!(transport.graphql_calls(), 3);
    assert_eq!(started.elapsed().as_secs(), 30);
}

#[tokio::test(start_paused = true)]
async fn other_transport_failures_are_not_retried() {
    let transport = ScriptedTransport::new();
    transport.push_graphql_error(TransportError::new("invalid request path"));

    let started = Instant::now();
    let err = walk(&transport).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(transport.graphql_calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn query_errors_fail_without_retry() {
    let transport = ScriptedTransport::new();
    transport.push_graphql(ApiResponse::ok(json!({
        "data": {"products": null},
        "errors": [{"message": "Field 'prodcts' doesn't exist", "path": ["query", "prodcts"]}]
    })));

    let err = walk(&transport).await.unwrap_err();

    assert_eq!(transport.graphql_calls(), 1);
    match &err {
        ApiError::Graphql { status, errors } => {
            assert_eq!(*status, 200);
            assert_eq!(errors.len(), 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("doesn't exist"));
}

#[tokio::test(start_paused = true)]
async fn missing_result_field_is_a_schema_mismatch() {
    let transport = ScriptedTransport::new();
    transport.push_graphql(fixtures::graphql_page("collections", &nodes(&[1]), false));

    let err = walk(&transport).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    assert!(err.to_string().contains("`products`"));
}

#[tokio::test(start_paused = true)]
async fn end_cursor_is_used_when_edges_carry_none() {
    let transport = ScriptedTransport::new();
    transport
        .push_graphql(ApiResponse::ok(json!({"data": {"products": {
            "edges": [{"node": {"id": 1}}],
            "pageInfo": {"hasNextPage": true, "endCursor": "end-1"}
        }}})))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[2]), false));

    let result = walk(&transport).await.unwrap();

    assert_eq!(result, nodes(&[1, 2]));
    assert!(transport.graphql_requests()[1].query.contains(r#"after: "end-1""#));
}

#[tokio::test(start_paused = true)]
async fn continuing_without_a_cursor_fails() {
    let transport = ScriptedTransport::new();
    transport.push_graphql(ApiResponse::ok(json!({"data": {"products": {
        "edges": [],
        "pageInfo": {"hasNextPage": true}
    }}})));

    let err = walk(&transport).await.unwrap_err();

    assert!(matches!(err, ApiError::SchemaMismatch { ref key, .. } if key == "cursor"));
    assert_eq!(transport.graphql_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_credentials_fail_before_any_call() {
    let transport = ScriptedTransport::new();
    let session = fixtures::session_without_credential();
    let config = ApiConfig::default();

    let err = GraphqlWalker::new(&transport, &session, &config)
        .run(GraphCall::new(PRODUCTS_QUERY, "products"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(transport.graphql_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn variables_are_forwarded() {
    let transport = ScriptedTransport::new();
    transport.push_graphql(fixtures::graphql_page("products", &nodes(&[1]), false));
    let session = fixtures::session();
    let config = ApiConfig::default();

    GraphqlWalker::new(&transport, &session, &config)
        .run(GraphCall::new(PRODUCTS_QUERY, "products").with_variables(json!({"q": "tag:sale"})))
        .await
        .unwrap();

    assert_eq!(
        transport.graphql_requests()[0].variables,
        json!({"q": "tag:sale"})
    );
}

#[tokio::test(start_paused = true)]
async fn every_page_targets_the_configured_version() {
    let transport = ScriptedTransport::new();
    transport
        .push_graphql(fixtures::graphql_page("products", &nodes(&[1, 2]), true))
        .push_graphql(fixtures::graphql_page("products", &nodes(&[3]), false));
    let session = fixtures::session();
    let config = ApiConfig::default().with_api_version("2024-07".parse::<ApiVersion>().unwrap());

    GraphqlWalker::new(&transport, &session, &config)
        .run(GraphCall::new(PRODUCTS_QUERY, "products"))
        .await
        .unwrap();

    let paths: Vec<String> = transport
        .graphql_requests()
        .into_iter()
        .map(|request| request.path)
        .collect();
    assert_eq!(
        paths,
        [
            "/admin/api/2024-07/graphql.json",
            "/admin/api/2024-07/graphql.json"
        ]
    );
}
