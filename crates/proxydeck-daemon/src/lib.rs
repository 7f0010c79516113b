//! # proxydeck-daemon - Backend RPC Surface
//!
//! The six remote procedures the client core depends on, and a JSON-RPC
//! transport that reaches them over a WebSocket bridge.
//!
//! Depends on [`proxydeck_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Contract
//! - [`Backend`] - Async trait over the backend RPCs (`LocalBackend` is the non-`Send` form)
//!
//! ### JSON-RPC
//! - [`BackendCommand`] - Request builder with wire method names
//! - [`CommandSender`] - Send a command and await its response with a timeout
//! - [`RequestTracker`] - Track pending request/response pairs
//! - [`parse_backend_message()`] - Classify a frame received from the backend
//!
//! ### Transport
//! - [`connect()`] - Open a WebSocket to the backend bridge
//! - [`BackendConnection`] - Live connection; hands out [`RpcBackend`]s
//!
//! ### Testing
//! - `test_utils::MockBackend` (feature `test-helpers`) - In-memory backend

pub mod backend;
pub mod client;
pub mod commands;
pub mod protocol;
pub mod rpc;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use backend::{Backend, LocalBackend};
pub use client::{connect, parse_backend_url, BackendConnection};
pub use commands::{
    BackendCommand, CommandResponse, CommandSender, RequestTracker, DEFAULT_REQUEST_TIMEOUT,
};
pub use protocol::{parse_backend_message, BackendMessage};
pub use rpc::RpcBackend;
