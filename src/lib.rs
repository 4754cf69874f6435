//! Bearer-token gate: verifies `Authorization` credentials against an external
//! identity provider and exposes the verified principal to handlers.
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
