//! Shared domain types for Blocktask.
//!
//! This crate contains the data shapes used across the Blocktask platform:
//! the canonical task program document, block kinds and sockets, the block
//! wire tree, library items, chat turns, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, schemars, uuid, chrono, thiserror.

pub mod block;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod library;
pub mod program;
pub mod task;
pub mod warning;
