//! Event dispatcher
//!
//! Decodes dispatch records into typed payloads, mutates the entity store,
//! and emits the semantic events describing each change.

mod dispatcher;
mod handlers;

pub use dispatcher::EventDispatcher;
