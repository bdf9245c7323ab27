//! fnrelay Gateway HTTP Server
//!
//! Hosts every registered function under `/{function}` and reports gateway
//! health under `/api/health`.

pub mod dispatch;
pub mod health_api;
pub mod server;

pub use server::{build_router, start_server, GatewayState};
