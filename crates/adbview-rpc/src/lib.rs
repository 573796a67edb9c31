//! adbview RPC - JSON-RPC and server-sent event transport for the adbview bridge.
//!
//! The binary in `main.rs` wires this to a real controller; integration tests
//! start the same server in-process.

pub mod handlers;
pub mod server;

pub use server::{router, start_server, AppState};
