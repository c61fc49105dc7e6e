//! Data-sync engine for the production dashboard.
//!
//! [`store::ProductionStore`] owns the view state and runs sync cycles
//! against a [`linewatch_client::backend::ProductionBackend`];
//! [`poller::Poller`] drives it on a fixed interval.

pub mod cycle;
pub mod error;
pub mod events;
pub mod poller;
pub mod state;
pub mod store;
