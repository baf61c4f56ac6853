//! Infrastructure layer for nodeflow.
//!
//! Contains the `reqwest` implementation of the `HttpFetcher` port defined in
//! `nodeflow-core`, data directory resolution, and `config.toml` loading.

pub mod config;
pub mod filesystem;
pub mod http;
