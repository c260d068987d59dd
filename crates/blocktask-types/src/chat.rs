//! Conversational turn payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::program::TaskDocument;

/// One turn produced by the conversational agent.
///
/// `task` is a partial document; `finished` marks the terminal turn whose
/// accumulated document is ready for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversationTurn {
    /// Text shown to the operator.
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub task: TaskDocument,
    #[serde(default)]
    pub finished: bool,
}
