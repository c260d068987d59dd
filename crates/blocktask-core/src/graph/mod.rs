//! Block graph: arena model, structural views, and the soft-warning validator.

pub mod model;
pub mod topology;
pub mod validate;

pub use model::{Block, BlockGraph, GraphError};
pub use validate::validate;
