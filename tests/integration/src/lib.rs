//! Integration test utilities for the state engine
//!
//! This crate provides a recording command sink, a session harness that
//! drives the engine with dispatch records, and payload builders.

pub mod helpers;
pub mod fixtures;

pub use helpers::*;
pub use fixtures::*;
