//! Event distribution for run lifecycle events.

pub mod bus;
