//! Grammar, graph model, codec and merge logic for Blocktask.
//!
//! This crate defines the pure translation layer between the block editor
//! and the canonical task program, plus the "ports" (repository traits) that
//! the infrastructure layer implements. It depends only on `blocktask-types`
//! -- never on `blocktask-infra` or any database/IO crate.

pub mod chat;
pub mod codec;
pub mod editor;
pub mod event;
pub mod grammar;
pub mod graph;
pub mod library;
pub mod merge;
pub mod repository;

#[cfg(test)]
mod testing;
