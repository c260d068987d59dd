//! Conversational task building.
//!
//! A `ChatSession` folds each agent turn into the running program through
//! the merge engine, starting from the all-null placeholder document. When
//! the agent marks a turn finished the accumulated program is normalized
//! into the shape the editor and the store expect.

use blocktask_types::chat::ConversationTurn;
use blocktask_types::program::{Control, Event, Program, StepRef, Steps};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::merge::merge;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("chat session {0} is already finished")]
    SessionFinished(Uuid),
}

/// What applying a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The conversation continues; the running draft is available via
    /// [`ChatSession::program`].
    InProgress,
    /// The terminal turn: the normalized program, ready for persistence.
    Finished(Program),
}

/// Session state of one conversation.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    program: Program,
    transcript: Vec<String>,
    finished: bool,
    started_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            program: Program::placeholder(),
            transcript: Vec::new(),
            finished: false,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The running draft, every leaf present.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Agent answers, oldest first.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn turn_count(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Fold one agent turn into the draft.
    pub fn apply(&mut self, turn: ConversationTurn) -> Result<TurnOutcome, ChatError> {
        if self.finished {
            return Err(ChatError::SessionFinished(self.id));
        }
        self.program = merge(&self.program, &turn.task.program);
        self.transcript.push(turn.answer);
        tracing::debug!(session = %self.id, turn = self.transcript.len(), "merged chat turn");

        if !turn.finished {
            return Ok(TurnOutcome::InProgress);
        }
        self.finished = true;
        let program = normalize_chat_program(&self.program);
        tracing::info!(session = %self.id, turns = self.transcript.len(), "chat task finished");
        Ok(TurnOutcome::Finished(program))
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn compact<R: StepRef>(slot: &Option<R>) -> Option<R> {
    slot.as_ref().filter(|r| !r.is_blank()).cloned()
}

fn compact_steps(steps: &Steps) -> Steps {
    Steps {
        pick: compact(&steps.pick),
        processing: compact(&steps.processing),
        place: compact(&steps.place),
    }
}

fn compact_control(control: &Control) -> Control {
    Control {
        control_type: control.control_type.clone(),
        times: control.times,
        event: control.event.as_ref().and_then(|e| {
            let event = Event {
                event_type: e.event_type.clone(),
                find_object: compact(&e.find_object),
            };
            (event.event_type.is_some() || event.find_object.is_some()).then_some(event)
        }),
        otherwise: control
            .otherwise
            .as_ref()
            .map(compact_steps)
            .filter(|s| !s.is_empty()),
        pick: compact(&control.pick),
        processing: compact(&control.processing),
        place: compact(&control.place),
        control: control.control.as_deref().map(|c| Box::new(compact_control(c))),
    }
}

/// Shape a finished conversational draft into a storable program.
///
/// The agent may put the steps of a controlled task at the top level or
/// inside the control record. With a known control type the steps move into
/// the control (control values win); without one the control is dropped and
/// its steps fill the top level instead. Blank references are removed.
pub fn normalize_chat_program(program: &Program) -> Program {
    let top = compact_steps(&program.steps());
    let control = program.control.as_deref().map(compact_control);

    match control {
        Some(mut control) if control.control_type.as_ref().is_some_and(|t| t.is_known()) => {
            control.pick = control.pick.or(top.pick);
            control.processing = control.processing.or(top.processing);
            control.place = control.place.or(top.place);
            Program {
                pick: None,
                processing: None,
                place: None,
                control: Some(Box::new(control)),
            }
        }
        Some(control) => Program {
            pick: top.pick.or(control.pick),
            processing: top.processing.or(control.processing),
            place: top.place.or(control.place),
            control: None,
        },
        None => Program {
            pick: top.pick,
            processing: top.processing,
            place: top.place,
            control: None,
        },
    }
}

/// JSON Schema of the turn payload, for structured-output agents.
pub fn turn_schema() -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(schemars::schema_for!(ConversationTurn))
}

/// JSON Schema of the program document.
pub fn program_schema() -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(schemars::schema_for!(blocktask_types::program::TaskDocument))
}
