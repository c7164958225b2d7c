//! HTTP API: server wiring, the route gate middleware, and handlers.

pub mod app;
pub mod context;
pub mod middleware;
pub mod session_token;
