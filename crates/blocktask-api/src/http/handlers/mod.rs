//! HTTP request handlers for the REST API.

pub mod chat;
pub mod grammar;
pub mod graph;
pub mod task;
