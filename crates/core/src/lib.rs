//! Domain types and pure logic for the production-line dashboard.
//!
//! Everything here is synchronous and free of I/O: view models, the
//! derivations that turn backend counts into percentages and statuses,
//! formatting helpers, and client-side input validation.

pub mod catalog;
pub mod derive;
pub mod error;
pub mod format;
pub mod model;
pub mod types;
pub mod validation;
