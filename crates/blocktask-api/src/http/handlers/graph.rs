//! Block editor workspace handlers.
//!
//! The editor exchanges the wire node tree; the store keeps programs. Both
//! directions go through an [`EditSession`] so graph changes reach the
//! event bus.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use blocktask_core::codec::document::to_graphic_value;
use blocktask_core::editor::EditSession;
use blocktask_core::library::refresh_program;
use blocktask_core::repository::TaskStore;
use blocktask_types::block::{WirePayload, WireWorkspace};
use blocktask_types::warning::Warning;

use crate::http::error::AppError;
use crate::http::handlers::task::{load_or_create, load_task, SaveQuery, TaskSummary};
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GraphView {
    pub workspace: WireWorkspace,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Serialize)]
pub struct SavedGraph {
    pub task: TaskSummary,
    /// The stored program, unset leaves omitted.
    pub program: serde_json::Value,
    pub warnings: Vec<Warning>,
}

/// GET /api/v1/tasks/{id}/graph - The task as an editor workspace.
///
/// Library references are refreshed first so renamed items show their
/// current names.
pub async fn get_graph(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<GraphView>>, AppError> {
    let clock = RequestClock::start();
    let record = load_task(&state, id).await?;
    let catalog = state.catalog().await?;

    let program = refresh_program(&record.program, &catalog);
    let session = EditSession::open(
        &program,
        state.registry.clone(),
        state.config.layout,
        state.events.clone(),
    );

    let view = GraphView {
        workspace: session.to_wire(),
        warnings: session.warnings(Some(&catalog)),
    };
    Ok(Json(clock.respond(view).with_link("program", &format!("/api/v1/tasks/{id}/program"))))
}

/// PUT /api/v1/tasks/{id}/graph - Save an editor workspace.
///
/// Accepts a whole workspace or a single root node. Illegal links and bad
/// field values are dropped and reported as warnings.
pub async fn put_graph(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SaveQuery>,
    Json(payload): Json<WirePayload>,
) -> Result<Json<ApiResponse<SavedGraph>>, AppError> {
    let clock = RequestClock::start();

    let mut session = state.edit_session();
    session.load_wire(&payload.into());

    let catalog = state.catalog().await?;
    let warnings = session.warnings(Some(&catalog));

    let mut record = load_or_create(&state, id, query.name).await?;
    record.program = session.save();
    state.tasks.put(&record).await?;

    let saved = SavedGraph {
        task: TaskSummary::from(&record),
        program: to_graphic_value(&record.program.clone().into())?,
        warnings,
    };
    Ok(Json(clock.respond(saved).with_link("self", &format!("/api/v1/tasks/{id}/graph"))))
}
