//! HTTP API surface.

pub mod routes;
pub mod tasks;
pub mod testing;
pub mod types;

pub use routes::{serve, AppState};
