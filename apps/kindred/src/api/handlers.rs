//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Engine errors map to status codes in [`error_response`]; every error body
//! is an [`ErrorResponse`].

use super::{
    AppState, ViewState,
    types::{
        BuildViewRequest, ErrorResponse, FamiliesResponse, FamilyActionRequest, HealthResponse,
        StatusResponse, ViewResponse, ViewSummary,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kindred_core::{
    FamilyView, KindredError, NodeType, PersonId, Session, SnapshotJson, ViewGraph, ViewId,
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Status code for an engine error.
pub fn status_for(error: &KindredError) -> StatusCode {
    match error {
        KindredError::PersonNotFound(_) => StatusCode::NOT_FOUND,
        KindredError::EmptyDataset => StatusCode::CONFLICT,
        KindredError::InvalidDataset(_) => StatusCode::BAD_REQUEST,
        KindredError::SerializationError(_)
        | KindredError::DeserializationError(_)
        | KindredError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &KindredError) -> Response {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::error!(%error, "request failed");
    }
    (status, Json(ErrorResponse::from(error))).into_response()
}

fn no_view() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("No view built yet. POST /view first.")),
    )
        .into_response()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Dataset metrics and live view size.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let guard = state.view.lock().await;
    let metrics = match guard.session.metrics() {
        Ok(metrics) => metrics,
        Err(e) => return error_response(&e),
    };
    let view = guard.graph.as_ref().map(|graph| ViewSummary {
        start: graph.start(),
        node_count: graph.node_count(),
        link_count: graph.link_count(),
        etc_count: graph.etc_count(),
    });

    (StatusCode::OK, Json(StatusResponse { metrics, view })).into_response()
}

// =============================================================================
// FAMILIES HANDLER
// =============================================================================

/// Families in which a person is a parent and a child.
pub async fn families_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut guard = state.view.lock().await;
    match families_of(&mut guard.session, PersonId(id)) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn families_of(session: &mut Session, person: PersonId) -> Result<FamiliesResponse, KindredError> {
    session.person(person)?;
    Ok(FamiliesResponse {
        person,
        as_parent: session.families_as_parent(person)?,
        as_child: session.families_as_child(person)?,
    })
}

// =============================================================================
// VIEW HANDLERS
// =============================================================================

/// Build a new view graph, replacing the live one.
pub async fn build_view_handler(
    State(state): State<AppState>,
    Json(request): Json<BuildViewRequest>,
) -> Response {
    let mut guard = state.view.lock().await;
    let built = guard.session.build_view_graph(
        PersonId(request.start),
        request.mode,
        |done, total| tracing::debug!(done, total, "populating view"),
    );

    match built {
        Ok((graph, report)) => {
            let snapshot = SnapshotJson::from(&graph);
            guard.graph = Some(graph);
            let response = ViewResponse {
                changed: true,
                report: Some(report),
                snapshot,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Snapshot of the live view.
pub async fn get_view_handler(State(state): State<AppState>) -> Response {
    let guard = state.view.lock().await;
    match &guard.graph {
        Some(graph) => {
            let response = ViewResponse {
                changed: false,
                report: None,
                snapshot: SnapshotJson::from(graph),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => no_view(),
    }
}

/// Show the family behind a `family` or `etc` node.
pub async fn show_family_handler(
    State(state): State<AppState>,
    Json(request): Json<FamilyActionRequest>,
) -> Response {
    let mut guard = state.view.lock().await;
    let ViewState { session, graph } = &mut *guard;
    let Some(graph) = graph.as_mut() else {
        return no_view();
    };
    let family = match family_at(graph, request.view_id) {
        Ok(family) => family,
        Err(response) => return response,
    };

    match graph.show_family(&family, session) {
        Ok(changed) => view_response(changed, graph),
        Err(e) => error_response(&e),
    }
}

/// Collapse the family behind a `family` node.
pub async fn hide_family_handler(
    State(state): State<AppState>,
    Json(request): Json<FamilyActionRequest>,
) -> Response {
    let mut guard = state.view.lock().await;
    let Some(graph) = guard.graph.as_mut() else {
        return no_view();
    };
    let family = match family_at(graph, request.view_id) {
        Ok(family) => family,
        Err(response) => return response,
    };

    match graph.hide_family(&family) {
        Ok(changed) => view_response(changed, graph),
        Err(e) => error_response(&e),
    }
}

fn view_response(changed: bool, graph: &ViewGraph) -> Response {
    let response = ViewResponse {
        changed,
        report: None,
        snapshot: SnapshotJson::from(graph),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// The family carried by a node, or the error response to send.
fn family_at(graph: &ViewGraph, view_id: u64) -> Result<FamilyView, Response> {
    let Some(node) = graph.node(ViewId(view_id)) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("No node with view id {}", view_id))),
        )
            .into_response());
    };
    match node.family() {
        Some(family) if node.node_type() != NodeType::Person => Ok(family.clone()),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "Node {} is a person node, not a family",
                view_id
            ))),
        )
            .into_response()),
    }
}
