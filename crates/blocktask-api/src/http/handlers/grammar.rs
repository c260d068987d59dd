//! Block grammar listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use blocktask_core::grammar::{BlockTypeRegistry, FieldType};
use blocktask_types::block::{BlockCategory, BlockKind, SocketMode, SocketName};

use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// One block type as shown to editors and operators.
#[derive(Debug, Clone, Serialize)]
pub struct BlockTypeView {
    pub kind: BlockKind,
    pub category: BlockCategory,
    pub root: bool,
    pub inputs: Vec<SocketView>,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SocketView {
    pub name: SocketName,
    pub mode: SocketMode,
    pub accepts: Vec<BlockKind>,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

fn field_type_label(ty: FieldType) -> String {
    match ty {
        FieldType::Text => "text".to_string(),
        FieldType::Integer => "integer".to_string(),
        FieldType::Bounded { min, max } => format!("integer {min}..={max}"),
    }
}

/// Describe every registered block type.
pub fn describe(registry: &BlockTypeRegistry) -> Vec<BlockTypeView> {
    registry
        .specs()
        .map(|spec| BlockTypeView {
            kind: spec.kind,
            category: spec.kind.category(),
            root: spec.root,
            inputs: spec
                .sockets
                .iter()
                .map(|socket| SocketView {
                    name: socket.name,
                    mode: socket.mode(),
                    accepts: socket.accepts.clone(),
                    required: socket.required,
                })
                .collect(),
            fields: spec
                .fields
                .iter()
                .map(|field| FieldView {
                    name: field.name,
                    ty: field_type_label(field.ty),
                    default: field
                        .default
                        .as_ref()
                        .and_then(|v| serde_json::to_value(v).ok()),
                })
                .collect(),
        })
        .collect()
}

/// GET /api/v1/grammar - The block type registry.
pub async fn get_grammar(State(state): State<AppState>) -> Json<ApiResponse<Vec<BlockTypeView>>> {
    let clock = RequestClock::start();
    Json(clock.respond(describe(&state.registry)).with_link("self", "/api/v1/grammar"))
}
