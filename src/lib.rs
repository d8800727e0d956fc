//! pullcheck: agentic pull-request reviewer (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod agent;
pub mod artifacts;
pub mod config;
pub mod constants;
pub mod context;
pub mod diff;
pub mod env;
pub mod models;
pub mod provider;
pub mod publish;
pub mod risk;
pub mod tools;
