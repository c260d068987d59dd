//! Change notifications for block graphs.
//!
//! Provides an `EventBus` that distributes `GraphEvent` messages to every
//! subscribed presentation adapter via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
