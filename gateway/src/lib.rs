//! HTTP surface of the weather gateway.
//!
//! This crate focuses on:
//! - Serving `POST /mcp` as a server-sent event stream
//! - Server lifecycle (bind, serve, graceful shutdown)
//! - Telemetry setup

pub mod server;
pub mod telemetry;

pub use server::{Server, ServerError};
