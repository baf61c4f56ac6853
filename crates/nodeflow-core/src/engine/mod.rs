//! Graph execution.
//!
//! - `script` -- expression evaluator with a small statement layer
//! - `dispatch` -- per-kind node behavior and the `HttpFetcher` port
//! - `trace` -- append-only execution records with live snapshots
//! - `traversal` -- depth-first run from the entry trigger

pub mod dispatch;
pub mod script;
pub mod trace;
pub mod traversal;
