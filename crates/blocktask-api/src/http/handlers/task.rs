//! Task program handlers for the REST API.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blocktask_core::codec::document::{from_value, to_graphic_value, to_nullable_value};
use blocktask_core::editor::EditSession;
use blocktask_core::repository::{SortOrder, TaskFilter, TaskStore};
use blocktask_types::program::TaskDocument;
use blocktask_types::task::TaskRecord;
use blocktask_types::warning::Warning;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub shared: bool,
    /// `asc` or `desc` by last update (default `desc`).
    #[serde(default)]
    pub order: Option<String>,
    pub limit: Option<i64>,
}

/// Which document variant to return.
#[derive(Debug, Default, Deserialize)]
pub struct ProgramQuery {
    #[serde(default)]
    pub form: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveQuery {
    /// Name for a task created by this request, or a rename.
    pub name: Option<String>,
}

/// A task without its program.
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            shared: record.shared,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Result of storing a program: the task plus advisory findings.
#[derive(Debug, Serialize)]
pub struct SavedTask {
    pub task: TaskSummary,
    pub warnings: Vec<Warning>,
}

pub(crate) async fn load_task(state: &AppState, id: Uuid) -> Result<TaskRecord, AppError> {
    state
        .tasks
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task {id}")))
}

/// The stored record for `id`, or a new one under that id.
pub(crate) async fn load_or_create(
    state: &AppState,
    id: Uuid,
    name: Option<String>,
) -> Result<TaskRecord, AppError> {
    let mut record = match state.tasks.get(&id).await? {
        Some(record) => record,
        None => TaskRecord {
            id,
            ..TaskRecord::new("untitled")
        },
    };
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        record.name = name;
    }
    record.updated_at = Utc::now();
    Ok(record)
}

/// GET /api/v1/tasks - List stored tasks.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<Vec<TaskSummary>>>, AppError> {
    let clock = RequestClock::start();

    let sort_order = match query.order.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(other) => return Err(AppError::Validation(format!("unknown sort order '{other}'"))),
    };

    let tasks = state
        .tasks
        .list(Some(TaskFilter {
            shared_only: query.shared,
            sort_order,
            limit: query.limit,
        }))
        .await?;

    let summaries = tasks.iter().map(TaskSummary::from).collect();
    Ok(Json(clock.respond(summaries).with_link("self", "/api/v1/tasks")))
}

/// GET /api/v1/tasks/{id}/program - The stored program document.
///
/// `?form=nullable` returns every leaf, unset ones as null.
pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProgramQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let clock = RequestClock::start();
    let record = load_task(&state, id).await?;

    let document: TaskDocument = record.program.into();
    let value = match query.form.as_deref() {
        None | Some("graphic") => to_graphic_value(&document)?,
        Some("nullable") => to_nullable_value(&document)?,
        Some(other) => return Err(AppError::Validation(format!("unknown document form '{other}'"))),
    };

    Ok(Json(
        clock
            .respond(value)
            .with_link("self", &format!("/api/v1/tasks/{id}/program"))
            .with_link("graph", &format!("/api/v1/tasks/{id}/graph")),
    ))
}

/// PUT /api/v1/tasks/{id}/program - Store a program document.
///
/// Accepts the wrapped or bare form. Warnings are reported but never block
/// the save.
pub async fn put_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SaveQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<SavedTask>>, AppError> {
    let clock = RequestClock::start();
    let document = from_value(body)?;

    let mut record = load_or_create(&state, id, query.name).await?;
    record.program = document.program;

    let catalog = state.catalog().await?;
    let session = EditSession::open(
        &record.program,
        state.registry.clone(),
        state.config.layout,
        state.events.clone(),
    );
    let warnings = session.warnings(Some(&catalog));

    state.tasks.put(&record).await?;

    let saved = SavedTask {
        task: TaskSummary::from(&record),
        warnings,
    };
    Ok(Json(clock.respond(saved).with_link("self", &format!("/api/v1/tasks/{id}/program"))))
}

/// DELETE /api/v1/tasks/{id} - Delete a task.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let clock = RequestClock::start();
    if !state.tasks.delete(&id).await? {
        return Err(AppError::NotFound(format!("task {id}")));
    }
    tracing::info!(task = %id, "deleted task");
    Ok(Json(clock.respond(serde_json::json!({ "deleted": id }))))
}
