//! Load analytics service
//!
//! HTTP boundary, configuration, error mapping and task supervision around
//! the analytics library. The binary in `main.rs` wires these together.

pub mod api;
pub mod config;
pub mod error;
pub mod supervisor;
