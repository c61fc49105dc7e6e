//! REST client library for the production-line backend.
//!
//! Provides typed payloads, lenient timestamp/interval decoding, the
//! [`backend::ProductionBackend`] seam used by the sync engine, its HTTP
//! implementation, and mapping of backend payloads into view models.

pub mod api;
pub mod backend;
pub mod error;
pub mod interval;
pub mod mapping;
pub mod wire;
