//! HTTP and WebSocket surface
//!
//! Exposes the live round snapshot, bet and cash-out commands, archived
//! round reports and fairness verification over axum.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::ApiServer;
