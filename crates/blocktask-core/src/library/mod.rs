//! Library reference resolution.
//!
//! Task programs name objects, locations and actions; the library supplies
//! their ids. [`LibraryCatalog`] is the in-memory snapshot the validator and
//! the resolver consult.

pub mod catalog;
pub mod resolve;

pub use catalog::{LibraryCatalog, Resolution};
pub use resolve::{refresh_program, resolve_program};
