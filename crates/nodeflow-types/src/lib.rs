//! Shared domain types for nodeflow.
//!
//! This crate contains the graph model (nodes, edges, documents), execution
//! trace records, run lifecycle events, and engine configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod trace;
