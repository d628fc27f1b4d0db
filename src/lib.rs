//! # Taskgate
//!
//! A task ingestion service with retry and dead-letter handling.
//!
//! This library provides:
//! - An HTTP API for task creation and listing
//! - A generic retry pipeline with exponential backoff for transient failures
//! - A dead-letter queue preserving requests that exhaust their retry budget
//!
//! ## Request Flow
//! 1. Receive request via API
//! 2. Validate input (validation failures are reported immediately, never retried)
//! 3. Fallible downstream work runs through the retry pipeline
//! 4. Terminal or retry-exhausted failures are dead-lettered; the caller
//!    sees only the final disposition
//!
//! ## Modules
//! - `api`: HTTP surface (routes, handlers, response envelopes)
//! - `task`: task record types and validation
//! - `store`: in-memory task storage
//! - `pipeline`: retry wrapper with failure classification
//! - `dlq`: dead-letter sink with NDJSON output

pub mod api;
pub mod config;
pub mod dlq;
pub mod pipeline;
pub mod store;
pub mod task;

pub use config::Config;
