//! Business logic for nodeflow.
//!
//! This crate defines graph operations (validation, editing, documents), the
//! node behavior dispatcher with its script evaluator, the trace recorder,
//! and the traversal engine. Network access is behind the `HttpFetcher` port,
//! implemented in `nodeflow-infra`.

pub mod engine;
pub mod event;
pub mod graph;
