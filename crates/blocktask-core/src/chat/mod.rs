//! Conversational builder: turn accumulation and draft normalization.

pub mod session;

pub use session::{normalize_chat_program, program_schema, turn_schema, ChatError, ChatSession, TurnOutcome};
