//! Integration tests for the Kindred HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

use axum::http::StatusCode;
use axum_test::TestServer;
use kindred::api::{
    AppState, ErrorResponse, FamiliesResponse, HealthResponse, StatusResponse, ViewResponse,
    create_router,
};
use kindred_core::{
    Dataset, Fact, FactType, Name, NodeType, Person, PersonId, Relationship, Session,
};
use serde_json::json;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// 1+2 -> 3; 3+4 -> 5.
fn three_generations() -> Dataset {
    Dataset::new(
        vec![
            Person::new(PersonId(1))
                .with_name(Name::new("Arthur Hale"))
                .with_fact(Fact::new(FactType::Death).with_date("+1970")),
            Person::new(PersonId(2)).with_name(Name::new("Beatrice Hale")),
            Person::new(PersonId(3)).with_name(Name::new("Clara Hale")),
            Person::new(PersonId(4)).with_name(Name::new("David Moss")),
            Person::new(PersonId(5)).with_name(Name::new("Eve Moss")),
        ],
        vec![
            Relationship::couple(10, 1, 2),
            Relationship::parent_child(11, 1, 3),
            Relationship::parent_child(12, 2, 3),
            Relationship::couple(13, 3, 4),
            Relationship::parent_child(14, 3, 5),
            Relationship::parent_child(15, 4, 5),
        ],
    )
}

/// Create a test server with a fresh in-memory session.
fn create_test_server() -> TestServer {
    let router = create_router(AppState::new(Session::new()));
    TestServer::new(router).expect("test server")
}

/// Create a test server holding the three-generation dataset.
fn create_populated_test_server() -> TestServer {
    let session = Session::from_dataset(&three_generations()).expect("load");
    let router = create_router(AppState::new(session));
    TestServer::new(router).expect("test server")
}

/// View id of the first node of a type in a snapshot.
fn first_of_type(view: &ViewResponse, node_type: NodeType) -> Option<u64> {
    view.snapshot
        .nodes
        .iter()
        .find(|node| node.node_type == node_type)
        .map(|node| node.view_id)
}

fn count_of_type(view: &ViewResponse, node_type: NodeType) -> usize {
    view.snapshot
        .nodes
        .iter()
        .filter(|node| node.node_type == node_type)
        .count()
}

/// Build the default view around Eve (5).
async fn build_default_view(server: &TestServer) -> ViewResponse {
    let response = server
        .post("/view")
        .json(&json!({ "start": 5 }))
        .await;
    response.assert_status_ok();
    response.json()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_status_empty_dataset() {
    let server = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.metrics.person_count, 0);
    assert_eq!(status.metrics.relationship_count, 0);
    assert!(status.view.is_none());
}

#[tokio::test]
async fn test_status_reports_dataset_and_view() {
    let server = create_populated_test_server();

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.metrics.person_count, 5);
    assert_eq!(status.metrics.couple_count, 2);
    assert_eq!(status.metrics.parent_child_count, 4);
    assert_eq!(status.metrics.living_count, 4);
    assert!(status.view.is_none());

    build_default_view(&server).await;

    let status: StatusResponse = server.get("/status").await.json();
    let view = status.view.expect("view summary");
    assert_eq!(view.start, PersonId(5));
    assert_eq!(view.node_count, 5);
    assert_eq!(view.etc_count, 1);
}

// =============================================================================
// FAMILIES ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_families_of_middle_generation() {
    let server = create_populated_test_server();

    let response = server.get("/persons/3/families").await;

    response.assert_status_ok();
    let families: FamiliesResponse = response.json();
    assert_eq!(families.person, PersonId(3));
    assert_eq!(families.as_parent.len(), 1);
    assert_eq!(families.as_parent[0].children, vec![PersonId(5)]);
    assert_eq!(families.as_child.len(), 1);
    assert_eq!(families.as_child[0].parent1, Some(PersonId(1)));
    assert_eq!(families.as_child[0].parent2, Some(PersonId(2)));
}

#[tokio::test]
async fn test_families_unknown_person() {
    let server = create_populated_test_server();

    let response = server.get("/persons/99/families").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("99"));
}

// =============================================================================
// VIEW ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_get_view_before_build() {
    let server = create_populated_test_server();

    let response = server.get("/view").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_build_view_on_empty_dataset() {
    let server = create_test_server();

    let response = server.post("/view").json(&json!({ "start": 1 })).await;

    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("empty"));
}

#[tokio::test]
async fn test_build_view_unknown_start() {
    let server = create_populated_test_server();

    let response = server.post("/view").json(&json!({ "start": 42 })).await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_build_view_rejects_unknown_mode() {
    let server = create_populated_test_server();

    let response = server
        .post("/view")
        .json(&json!({ "start": 5, "mode": "cousins" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_build_default_view() {
    let server = create_populated_test_server();

    let view = build_default_view(&server).await;

    assert!(view.changed);
    let report = view.report.expect("report");
    assert_eq!(report.families_requested, 1);
    assert_eq!(report.families_shown, 1);
    assert!(!report.truncated);

    assert_eq!(view.snapshot.start, PersonId(5));
    assert_eq!(count_of_type(&view, NodeType::Person), 3);
    assert_eq!(count_of_type(&view, NodeType::Family), 1);
    assert_eq!(count_of_type(&view, NodeType::Etc), 1);
    assert_eq!(view.snapshot.links.len(), 4);

    let eve = view
        .snapshot
        .nodes
        .iter()
        .find(|node| node.person_id == Some(PersonId(5)))
        .expect("start node");
    assert_eq!(eve.name.as_deref(), Some("Eve Moss"));
    assert_eq!(eve.generation, Some(0));
    assert_eq!(eve.ascendancy_number, Some(1));
}

#[tokio::test]
async fn test_build_ancestors_view() {
    let server = create_populated_test_server();

    let response = server
        .post("/view")
        .json(&json!({ "start": 5, "mode": "ancestors" }))
        .await;

    response.assert_status_ok();
    let view: ViewResponse = response.json();
    assert_eq!(count_of_type(&view, NodeType::Person), 5);
    assert_eq!(count_of_type(&view, NodeType::Family), 2);
    assert_eq!(count_of_type(&view, NodeType::Etc), 0);
}

#[tokio::test]
async fn test_get_view_returns_live_snapshot() {
    let server = create_populated_test_server();
    let built = build_default_view(&server).await;

    let response = server.get("/view").await;

    response.assert_status_ok();
    let view: ViewResponse = response.json();
    assert!(!view.changed);
    assert!(view.report.is_none());
    assert_eq!(view.snapshot, built.snapshot);
}

// =============================================================================
// SHOW / HIDE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_show_then_hide_grandparents() {
    let server = create_populated_test_server();
    let view = build_default_view(&server).await;
    let etc = first_of_type(&view, NodeType::Etc).expect("etc node");

    let response = server
        .post("/view/show")
        .json(&json!({ "view_id": etc }))
        .await;
    response.assert_status_ok();
    let shown: ViewResponse = response.json();
    assert!(shown.changed);
    assert_eq!(count_of_type(&shown, NodeType::Person), 5);
    assert_eq!(count_of_type(&shown, NodeType::Family), 2);
    assert_eq!(count_of_type(&shown, NodeType::Etc), 0);
    assert_eq!(shown.snapshot.links.len(), 6);

    let response = server
        .post("/view/hide")
        .json(&json!({ "view_id": etc }))
        .await;
    response.assert_status_ok();
    let hidden: ViewResponse = response.json();
    assert!(hidden.changed);
    assert_eq!(count_of_type(&hidden, NodeType::Person), 3);
    assert_eq!(count_of_type(&hidden, NodeType::Etc), 1);
    assert_eq!(hidden.snapshot.links.len(), 4);
    assert!(
        hidden
            .snapshot
            .nodes
            .iter()
            .any(|node| node.person_id == Some(PersonId(3))),
        "Clara links to her own family and must stay"
    );
}

#[tokio::test]
async fn test_show_twice_is_no_op() {
    let server = create_populated_test_server();
    let view = build_default_view(&server).await;
    let etc = first_of_type(&view, NodeType::Etc).expect("etc node");

    server
        .post("/view/show")
        .json(&json!({ "view_id": etc }))
        .await
        .assert_status_ok();
    let again: ViewResponse = server
        .post("/view/show")
        .json(&json!({ "view_id": etc }))
        .await
        .json();

    assert!(!again.changed);
    assert_eq!(again.snapshot.nodes.len(), 7);
}

#[tokio::test]
async fn test_hide_start_family_is_refused() {
    let server = create_populated_test_server();
    let view = build_default_view(&server).await;
    let family = first_of_type(&view, NodeType::Family).expect("family node");

    let response = server
        .post("/view/hide")
        .json(&json!({ "view_id": family }))
        .await;

    response.assert_status_ok();
    let after: ViewResponse = response.json();
    assert!(!after.changed);
    assert_eq!(after.snapshot, view.snapshot);
}

#[tokio::test]
async fn test_show_person_node_is_bad_request() {
    let server = create_populated_test_server();
    let view = build_default_view(&server).await;
    let person = first_of_type(&view, NodeType::Person).expect("person node");

    let response = server
        .post("/view/show")
        .json(&json!({ "view_id": person }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_show_unknown_view_id() {
    let server = create_populated_test_server();
    build_default_view(&server).await;

    let response = server
        .post("/view/show")
        .json(&json!({ "view_id": 9999 }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hide_without_view() {
    let server = create_populated_test_server();

    let response = server
        .post("/view/hide")
        .json(&json!({ "view_id": 0 }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rebuild_replaces_view() {
    let server = create_populated_test_server();
    build_default_view(&server).await;

    let response = server
        .post("/view")
        .json(&json!({ "start": 1, "mode": "descendants" }))
        .await;
    response.assert_status_ok();

    let view: ViewResponse = server.get("/view").await.json();
    assert_eq!(view.snapshot.start, PersonId(1));
    assert_eq!(count_of_type(&view, NodeType::Person), 5);
}

// =============================================================================
// CORS TESTS
// =============================================================================

#[tokio::test]
async fn test_router_with_configured_origins() {
    let state = AppState::new(Session::new())
        .with_cors_origins(vec!["http://example.org".to_string(), "not a\norigin".to_string()]);
    let server = TestServer::new(create_router(state)).expect("test server");

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_router_with_wildcard_origin() {
    let state = AppState::new(Session::new()).with_cors_origins(vec!["*".to_string()]);
    let server = TestServer::new(create_router(state)).expect("test server");

    server.get("/health").await.assert_status_ok();
}
