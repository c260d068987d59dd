//! Conversational task building over HTTP.
//!
//! Sessions live in memory until their finishing turn, which persists the
//! normalized program as a new task.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blocktask_core::chat::{ChatSession, TurnOutcome};
use blocktask_core::codec::document::{to_graphic_value, to_nullable_value};
use blocktask_core::editor::EditSession;
use blocktask_core::library::resolve_program;
use blocktask_core::repository::TaskStore;
use blocktask_types::chat::ConversationTurn;
use blocktask_types::task::TaskRecord;
use blocktask_types::warning::Warning;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::{AppState, PendingChat};

#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    /// Name of the task the conversation will produce.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatView {
    pub id: Uuid,
    /// The running draft with every leaf present.
    pub program: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct TurnView {
    pub finished: bool,
    pub turns: usize,
    pub program: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// POST /api/v1/chat/sessions - Start a conversation.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateChatRequest>,
) -> Result<Json<ApiResponse<ChatView>>, AppError> {
    let clock = RequestClock::start();
    let session = ChatSession::new();
    let id = session.id();
    let program = to_nullable_value(&session.program().clone().into())?;

    let task_name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("chat task {}", session.started_at().format("%Y-%m-%d %H:%M")));
    state.chats.insert(id, PendingChat { session, task_name });
    tracing::info!(session = %id, "chat session started");

    Ok(Json(
        clock
            .respond(ChatView { id, program })
            .with_link("turns", &format!("/api/v1/chat/sessions/{id}/turns")),
    ))
}

/// POST /api/v1/chat/sessions/{id}/turns - Fold one agent turn into the draft.
pub async fn post_turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(turn): Json<ConversationTurn>,
) -> Result<Json<ApiResponse<TurnView>>, AppError> {
    let clock = RequestClock::start();

    let (outcome, draft, turns, task_name) = {
        let mut entry = state
            .chats
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("chat session {id}")))?;
        let outcome = entry.session.apply(turn)?;
        (
            outcome,
            entry.session.program().clone(),
            entry.session.turn_count(),
            entry.task_name.clone(),
        )
    };

    let program = match outcome {
        TurnOutcome::InProgress => {
            let view = TurnView {
                finished: false,
                turns,
                program: to_nullable_value(&draft.into())?,
                task_id: None,
                warnings: Vec::new(),
            };
            return Ok(Json(clock.respond(view)));
        }
        TurnOutcome::Finished(program) => program,
    };

    state.chats.remove(&id);

    let catalog = state.catalog().await?;
    let mut record = TaskRecord::new(task_name);
    record.program = resolve_program(&program, &catalog);

    let session = EditSession::open(
        &record.program,
        state.registry.clone(),
        state.config.layout,
        state.events.clone(),
    );
    let warnings = session.warnings(Some(&catalog));
    state.tasks.put(&record).await?;

    let view = TurnView {
        finished: true,
        turns,
        program: to_graphic_value(&record.program.clone().into())?,
        task_id: Some(record.id),
        warnings,
    };
    Ok(Json(
        clock
            .respond(view)
            .with_link("task", &format!("/api/v1/tasks/{}/program", record.id)),
    ))
}
