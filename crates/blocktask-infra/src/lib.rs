//! Infrastructure layer for Blocktask.
//!
//! Contains implementations of the repository traits defined in `blocktask-core`:
//! SQLite storage for task programs and library items, plus the config file
//! loader and data directory resolution.

pub mod config;
pub mod sqlite;
